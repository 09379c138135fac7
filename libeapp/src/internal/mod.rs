//! Internal interface to the enclave entry and exit glue
//
// SPDX-License-Identifier: MIT
// Copyright (C) 2022 VTT Technical Research Centre of Finland Ltd

// Only bare enclave images contain the entry point. Host builds (tests and
// simulation) call 'crate::serve' directly.
#[cfg(all(feature = "entry", target_arch = "x86_64", target_os = "none"))]
pub(crate) mod enclu;
