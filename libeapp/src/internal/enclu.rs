//! Enclave entry point and the ENCLU[EEXIT] primitive
//!
//! On ENCLU[EENTER] the processor jumps to '_ecall_entry' with:
//!
//! * RBX: address of the TCS used for the entry
//! * RCX: address of the host instruction following ENCLU
//! * R10: call ordinal
//! * RDI: call argument
//!
//! RSP and RBP still point to the host stack. The stack of a thread lives
//! directly below its TCS page; the enclave loader must lay out the image
//! accordingly.
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

use core::arch::{asm, global_asm};
use core::panic::PanicInfo;

use edge::ecall::EEXIT;

use crate::RUNTIME;

/// Host state saved on entry, restored by 'exit'
struct Host {
    /// Host instruction to continue from
    target: u64,
    /// Host stack pointer
    stack:  u64,
    /// Host frame pointer
    frame:  u64,
}

global_asm!(
    ".global _ecall_entry",
    "_ecall_entry:",
    "    cld",
    "    mov rdx, rcx",         // return address
    "    mov rcx, rsp",         // host stack
    "    mov r8,  rbp",         // host frame
    "    mov rsi, rdi",         // argument
    "    mov rdi, r10",         // ordinal
    "    mov rsp, rbx",         // thread stack ends at the TCS
    "    xor ebp, ebp",
    "    call {main}",
    "    ud2",
    main = sym ecall_main,
);

extern "C" fn ecall_main(ordinal: u64, arg: u64, target: u64, stack: u64, frame: u64) -> ! {
    let status = RUNTIME.serve(ordinal, arg);
    let host = Host{target: target, stack: stack, frame: frame};
    unsafe { exit(&host, status) }
}

/// Leave the enclave
///
/// Restores the host stack, scrubs the scratch registers and returns to the
/// instruction following the host's ENCLU[EENTER] with 'value' in RDX.
///
/// # Safety
///
/// 'host' must hold the state captured by '_ecall_entry' for the current
/// entry. Nothing on the enclave stack survives the call.

unsafe fn exit(host: &Host, value: i64) -> ! {
    asm!(
        "mov rsp, {stack}",
        "mov rbp, {frame}",
        "mov rbx, {target}",
        "xor ecx, ecx",
        "xor esi, esi",
        "xor edi, edi",
        "xor r8d, r8d",
        "xor r9d, r9d",
        "xor r10d, r10d",
        "xor r11d, r11d",
        "xor r12d, r12d",
        "xor r13d, r13d",
        "xor r14d, r14d",
        "xor r15d, r15d",
        "enclu",
        stack  = in(reg) host.stack,
        frame  = in(reg) host.frame,
        target = in(reg) host.target,
        in("rax") EEXIT,
        in("rdx") value,
        options(noreturn),
    );
}

/* Panic handler: faults the enclave thread, the host sees a fatal error */
#[panic_handler]
fn on_panic(_info: &PanicInfo) -> ! {
    unsafe { asm!("ud2", options(noreturn)) }
}
