//! A crate for calling SGX enclaves from host applications
//!
//! A call validates the ordinal, enters the enclave through one of its
//! execution contexts and returns the result left by the enclave:
//!
//! ```
//! use happ::{Error, Tcs, Trampoline};
//! use happ::platform::Simulator;
//!
//! let sim = Simulator::new(|_ordinal, arg| arg as i64 + 1, &[0x1000]);
//! let trampoline: Trampoline<_> = Trampoline::new(sim);
//! let mut tcs = unsafe { Tcs::from_raw(0x1000) }.unwrap();
//!
//! assert_eq!(trampoline.call(0, &mut tcs, 41), Ok(42));
//! assert_eq!(trampoline.call(1, &mut tcs, 41), Err(Error::OutOfRange));
//! ```
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

/* Public interface */
pub mod ecall;
pub mod enclave;
pub mod platform;

pub use ecall::Trampoline as Trampoline;
pub use enclave::Tcs       as Tcs;
pub use ::edge::Status     as Status;
pub use ::edge::Error      as Error;
pub use ::edge::Fault      as Fault;
