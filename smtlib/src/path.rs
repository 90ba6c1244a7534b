// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Locate solver binaries in the filesystem.

use std::env;

/// Get the right invocation of the solver with binary name `bin`.
///
/// The solver environment variable (e.g., Z3_BIN, MATHSAT_BIN) takes priority;
/// otherwise `bin` is used as-is, relying on $PATH.
pub fn solver_path(bin: &str) -> String {
    let var = bin.to_uppercase() + "_BIN";
    if let Some(val) = env::var_os(var) {
        return val.to_string_lossy().into();
    }
    bin.to_string()
}
