//! A Rust library for serving ecalls in SGX enclave applications.
//!
//! The enclave application declares a dispatch table and installs it once
//! during its setup:
//!
//! ```
//! use eapp::ecall::CallTable;
//!
//! #[eapp::ecall_handler]
//! pub fn ping(arg: u64) -> u32 {
//!     arg as u32
//! }
//!
//! static TABLE: CallTable<'static> = CallTable::new([&ping]);
//!
//! eapp::init(&TABLE).unwrap();
//! ```
//!
//! Handlers must be public and take and return exactly one word:
//!
//! ```compile_fail
//! #[eapp::ecall_handler]
//! pub fn narrow(arg: u32) -> u32 {
//!     arg
//! }
//! ```
//!
//! ```compile_fail
//! #[eapp::ecall_handler]
//! fn hidden(arg: u64) -> u32 {
//!     arg as u32
//! }
//! ```
//!
//! ```compile_fail
//! #[eapp::ecall_handler]
//! pub fn signed(arg: u64) -> i64 {
//!     arg as i64
//! }
//! ```
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

#![cfg_attr(not(test), no_std)]

extern crate core;

mod internal;

/* Public interface */
pub mod ecall;
pub mod guard;
pub use eapp_macros::{ecall_handler};

pub use ::edge::Status as Status;
pub use ::edge::Error  as Error;

use crate::ecall::{Dispatch, Runtime};

/// The ecall runtime of this enclave, served by the enclave entry point
pub(crate) static RUNTIME: Runtime = Runtime::new();

/// Install the enclave's dispatch table and allow ecalls to be served.
///
/// Must be called exactly once during enclave setup, before the host issues
/// its first ecall. Calls arriving earlier fail with Status::NotInitialized.
///
/// # Inputs
///
/// * 'table' is the dispatch table for the lifetime of the enclave.
///
/// # Returns
///
/// Error::BadState if the enclave has already been initialized.

pub fn init(table: &'static dyn Dispatch) -> Result<(), Error> {
    RUNTIME.init(table)
}

/// 'true' once 'init' has completed
pub fn is_initialized() -> bool {
    RUNTIME.guard().is_armed()
}

/// Serve a single call with the enclave's runtime.
///
/// This is the function the enclave entry point runs. It is public so that
/// simulation and test harnesses can drive the same dispatch path without a
/// hardware transition.

pub fn serve(ordinal: u64, arg: u64) -> i64 {
    RUNTIME.serve(ordinal, arg)
}
