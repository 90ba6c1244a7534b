// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Interpolation-based qualifier synthesis for Horn-clause constraints.
//!
//! The pipeline unrolls the clause graph to a finite depth, emits tree
//! interpolation queries to a Craig-interpolating SMT solver, and extracts
//! qualifier predicates from the returned interpolants.

// configure clippy
#![allow(clippy::needless_return)]
#![allow(clippy::large_enum_variant)]
#![allow(clippy::type_complexity)]
#![deny(clippy::uninlined_format_args)]
// documentation-related lints (only checked when running rustdoc)
#![warn(missing_docs)]
#![allow(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod expand;
pub mod pipeline;
pub mod qualif;
pub mod query;
pub mod solutions;
pub mod unroll;
