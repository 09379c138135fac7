//! Serving ecalls through the enclave's global runtime
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

use eapp::ecall::{CallTable, MAX_ECALLS};
use eapp::{ecall_handler, Error, Status};

/// Returns zero for any argument
#[ecall_handler]
pub fn zero(_arg: u64) -> u32 {
    0
}

static TABLE: CallTable<'static> = CallTable::new([&zero]);

// The global runtime can be initialized once per process, so the whole
// lifecycle is a single test.
#[test]
fn lifecycle() {
    assert_eq!(MAX_ECALLS, 1);

    assert!(!eapp::is_initialized());
    assert_eq!(eapp::serve(0, 0), Status::NotInitialized.as_i64());
    assert_eq!(eapp::serve(1, 0), Status::NotInitialized.as_i64());

    eapp::init(&TABLE).unwrap();
    assert!(eapp::is_initialized());

    assert_eq!(eapp::serve(0, 0), 0);
    assert_eq!(eapp::serve(0, u64::MAX), 0);
    assert_eq!(eapp::serve(1, 0), Status::OutOfRange.as_i64());

    assert_eq!(eapp::init(&TABLE), Err(Error::BadState));
    assert_eq!(eapp::serve(0, 0), 0);
}
