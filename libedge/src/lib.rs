//! Common definitions shared by the enclave and host application libraries.
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

use core::fmt;

pub mod ecall;

/// Reserved call status values
///
/// These are the only negative values that may appear in the status register
/// after an ecall. Handler results are always non-negative, see
/// 'ecall::encode'.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i64)]
pub enum Status {
    /// Call ordinal is outside the dispatch table
    OutOfRange     = -1,
    /// The enclave has not completed its initialization
    NotInitialized = -2,
    /// The enclave or the execution context is unusable. Never produced by
    /// the enclave itself.
    Fatal          = -3,
}

impl Status {

    /// Raw status register value
    pub const fn as_i64(self) -> i64 {
        self as i64
    }

    /// Map a raw status register value to a reserved status
    ///
    /// Returns 'None' for values that are not reserved codes.
    pub const fn from_i64(value: i64) -> Option<Status> {
        match value {
            -1 => Some(Status::OutOfRange),
            -2 => Some(Status::NotInitialized),
            -3 => Some(Status::Fatal),
            _  => None,
        }
    }
}

/// Reasons for fatal failures
///
/// A fatal failure makes the affected execution context unusable. The host
/// must not enter it again without re-initializing the enclave.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Fault {
    /// The execution context handle is malformed or unknown to the enclave
    BadHandle,
    /// The execution context is already entered by another thread
    Busy,
    /// The enclave is not in a runnable state
    NotRunnable,
    /// The transition returned with an unexpected leaf in RAX
    BadLeaf(u64),
    /// The enclave returned a value outside the result and error spaces
    BadStatus(i64),
    /// The enclave aborted while serving the call
    Aborted,
    /// An earlier call on the same execution context failed fatally
    Poisoned,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::BadHandle      => write!(f, "malformed execution context"),
            Fault::Busy           => write!(f, "execution context already in use"),
            Fault::NotRunnable    => write!(f, "enclave is not runnable"),
            Fault::BadLeaf(leaf)  => write!(f, "unexpected ENCLU leaf {:#x} on exit", leaf),
            Fault::BadStatus(raw) => write!(f, "invalid status {:#x} from enclave", raw),
            Fault::Aborted        => write!(f, "enclave aborted"),
            Fault::Poisoned       => write!(f, "execution context poisoned by an earlier fault"),
        }
    }
}

/// Errors returned by the ecall libraries
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// Call ordinal outside the dispatch table. The caller may retry with
    /// a valid ordinal.
    OutOfRange,
    /// The enclave is not (yet) initialized
    NotInitialized,
    /// Unrecoverable failure of the enclave or the execution context
    Fatal(Fault),
    /// Operation not allowed in the current state. Only returned by enclave
    /// setup, never by a call, so no execution context is affected.
    BadState,
}

impl Error {

    /// The reserved status category of the error
    ///
    /// Error::BadState has no status of its own and reports Status::Fatal,
    /// although it is not fatal to any execution context (see 'is_fatal').
    pub const fn status(&self) -> Status {
        match self {
            Error::OutOfRange     => Status::OutOfRange,
            Error::NotInitialized => Status::NotInitialized,
            Error::Fatal(_)       => Status::Fatal,
            Error::BadState       => Status::Fatal,
        }
    }

    /// 'true' if the affected execution context must not be used again
    ///
    /// Only Error::Fatal poisons a context. Setup errors (Error::BadState)
    /// are not fatal even though their status category is Status::Fatal.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal(_))
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        match status {
            Status::OutOfRange     => Error::OutOfRange,
            Status::NotInitialized => Error::NotInitialized,
            Status::Fatal          => Error::Fatal(Fault::BadStatus(status.as_i64())),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::OutOfRange     => write!(f, "call ordinal out of range"),
            Error::NotInitialized => write!(f, "enclave not initialized"),
            Error::Fatal(fault)   => write!(f, "fatal: {}", fault),
            Error::BadState       => write!(f, "bad state"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_codes_are_negative_and_distinct() {
        let codes = [Status::OutOfRange, Status::NotInitialized, Status::Fatal];
        for (i, a) in codes.iter().enumerate() {
            assert!(a.as_i64() < 0);
            assert_eq!(Status::from_i64(a.as_i64()), Some(*a));
            for b in &codes[i + 1 ..] {
                assert_ne!(a.as_i64(), b.as_i64());
            }
        }
        assert_eq!(Status::from_i64(0), None);
        assert_eq!(Status::from_i64(-4), None);
    }

    #[test]
    fn error_categories() {
        assert_eq!(Error::OutOfRange.status(), Status::OutOfRange);
        assert_eq!(Error::NotInitialized.status(), Status::NotInitialized);
        assert_eq!(Error::Fatal(Fault::Busy).status(), Status::Fatal);
        assert!(Error::Fatal(Fault::Aborted).is_fatal());
        assert!(!Error::OutOfRange.is_fatal());
        assert_eq!(Error::from(Status::NotInitialized), Error::NotInitialized);
    }

    #[test]
    fn setup_errors_do_not_poison() {
        assert_eq!(Error::BadState.status(), Status::Fatal);
        assert!(!Error::BadState.is_fatal());
    }
}
