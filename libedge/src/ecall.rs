//! ECall protocol definitions
//!
//! The host enters the enclave with the ENCLU[EENTER] instruction. Call
//! parameters are passed in fixed registers:
//!
//! | Register | Content                                              |
//! |----------|------------------------------------------------------|
//! | R10      | call ordinal                                         |
//! | R11      | TCS address, moved to RBX for ENCLU                  |
//! | RDI      | single argument word                                 |
//! | RDX      | raw status, set by the enclave before ENCLU[EEXIT]   |
//!
//! After a regular exit RAX holds the EEXIT leaf number.
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

use static_assertions::const_assert;

use crate::Status;

/// Identifier of the first dispatch table entry
pub const ECALL_MAGIC: u64 = 0;

/// Number of ecall ordinals served by the enclave. Ordinals start from
/// ECALL_MAGIC.
pub const MAX_ECALLS: usize = 1;

/// Sentinel stored by the enclave once it is ready to serve ecalls
pub const INIT_MAGIC: u64 = 0xdead_face_dead_beef;

/// ENCLU leaf: enter an enclave
pub const EENTER: u64 = 2;
/// ENCLU leaf: resume after an asynchronous exit
pub const ERESUME: u64 = 3;
/// ENCLU leaf: exit an enclave
pub const EEXIT: u64 = 4;

/// Machine code of the ENCLU instruction
pub const ENCLU: [u8; 3] = [0x0f, 0x01, 0xd7];

/// Size and required alignment of a thread control structure
pub const TCS_SIZE: usize = 4096;

const_assert!(MAX_ECALLS >= 1);
const_assert!(TCS_SIZE.is_power_of_two());

/// Map a call ordinal to a dispatch table index
///
/// # Input
/// * 'ordinal' is the call ordinal
/// * 'bound' is the number of entries in the dispatch table
///
/// # Return
///
/// The table index, or Status::OutOfRange if the ordinal is not served
/// by a table with 'bound' entries.

pub const fn index(ordinal: u64, bound: usize) -> Result<usize, Status> {
    let index = match ordinal.checked_sub(ECALL_MAGIC) {
        Some(index) => index,
        None        => return Err(Status::OutOfRange),
    };

    if index >= bound as u64 {
        return Err(Status::OutOfRange);
    }

    Ok(index as usize)
}

/// A validated ecall
///
/// A descriptor can only be created for an ordinal within the dispatch table
/// bound, so an invalid ordinal never reaches the entry instruction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Descriptor {
    /// Call ordinal
    ordinal: u64,
    /// Call argument
    arg:     u64,
}

impl Descriptor {

    /// Validate a call against a dispatch table bound
    pub const fn new(ordinal: u64, arg: u64, bound: usize) -> Result<Self, Status> {
        match index(ordinal, bound) {
            Ok(_)       => Ok(Self{ordinal: ordinal, arg: arg}),
            Err(status) => Err(status),
        }
    }

    /// Get call ordinal
    pub const fn ordinal(&self) -> u64 {
        self.ordinal
    }

    /// Get call argument
    pub const fn arg(&self) -> u64 {
        self.arg
    }
}

/// Encode a call outcome as a raw status register value
///
/// Handler results occupy 0..=u32::MAX, reserved statuses are negative.
pub const fn encode(result: Result<u32, Status>) -> i64 {
    match result {
        Ok(value)   => value as i64,
        Err(status) => status.as_i64(),
    }
}

/// Decode a raw status register value
///
/// Values outside both the result and reserved spaces, as well as
/// Status::Fatal which the enclave never produces, decode as Status::Fatal.
pub const fn decode(raw: i64) -> Result<u32, Status> {
    if raw >= 0 && raw <= u32::MAX as i64 {
        return Ok(raw as u32);
    }

    match Status::from_i64(raw) {
        Some(Status::OutOfRange)     => Err(Status::OutOfRange),
        Some(Status::NotInitialized) => Err(Status::NotInitialized),
        _                            => Err(Status::Fatal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_is_enforced() {
        assert_eq!(index(ECALL_MAGIC, MAX_ECALLS), Ok(0));
        assert_eq!(index(ECALL_MAGIC + MAX_ECALLS as u64, MAX_ECALLS),
                   Err(Status::OutOfRange));
        assert_eq!(index(u64::MAX, MAX_ECALLS), Err(Status::OutOfRange));
        assert_eq!(index(3, 4), Ok(3));
        assert_eq!(index(0, 0), Err(Status::OutOfRange));
    }

    #[test]
    fn descriptor_requires_valid_ordinal() {
        let desc = Descriptor::new(0, 42, 1).unwrap();
        assert_eq!(desc.ordinal(), 0);
        assert_eq!(desc.arg(), 42);
        assert_eq!(Descriptor::new(1, 42, 1), Err(Status::OutOfRange));
        // -1 as passed through a 64-bit register
        assert_eq!(Descriptor::new(-1i64 as u64, 0, 1), Err(Status::OutOfRange));
    }

    #[test]
    fn results_and_errors_do_not_overlap() {
        for value in [0u32, 1, 0x7fff_ffff, u32::MAX] {
            let raw = encode(Ok(value));
            assert!(raw >= 0);
            assert_eq!(decode(raw), Ok(value));
        }

        assert_eq!(decode(encode(Err(Status::OutOfRange))), Err(Status::OutOfRange));
        assert_eq!(decode(encode(Err(Status::NotInitialized))),
                   Err(Status::NotInitialized));
    }

    #[test]
    fn garbage_status_is_fatal() {
        assert_eq!(decode(u32::MAX as i64 + 1), Err(Status::Fatal));
        assert_eq!(decode(i64::MIN), Err(Status::Fatal));
        assert_eq!(decode(Status::Fatal.as_i64()), Err(Status::Fatal));
        assert_eq!(decode(-4), Err(Status::Fatal));
    }

    #[test]
    fn constants() {
        assert_eq!(ECALL_MAGIC, 0);
        assert_eq!(INIT_MAGIC, 0xdeadfacedeadbeef);
        assert_eq!(ENCLU, [0x0f, 0x01, 0xd7]);
        assert_eq!(EEXIT, 4);
    }
}
