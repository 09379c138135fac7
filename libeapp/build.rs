//! Build options
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

use std::env;

fn main() {
    let os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();

    // Host builds (tests, simulation) link normally
    if os == "none" {
        // Always link statically as no libraries are available in the enclave
        println!("cargo:rustc-link-arg=-static");
        // No standard libraries available in the enclave
        println!("cargo:rustc-link-arg=-nostdlib");
    }
}
