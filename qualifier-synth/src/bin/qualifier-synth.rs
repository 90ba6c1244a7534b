// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

use clap::Parser;
use qualifier_synth::command::App;

fn main() {
    pretty_env_logger::init();
    App::parse().exec();
}
