// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The qualifier-synth binary's library, for access to the CLI from tests.

pub mod command;
