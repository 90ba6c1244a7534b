// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The qualifier-synth binary's command-line interface.

use std::{fs, process};

use clap::Args;
use horn::finfo::FInfo;
use solver::backends;
use solver::conf::SolverConf;
use synth::pipeline::synthesize;

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum SolverType {
    Z3,
    Mathsat,
    Cvc4,
}

#[derive(Args, Clone, Debug, PartialEq, Eq)]
struct SolverArgs {
    #[arg(value_enum, long, default_value_t = SolverType::Z3)]
    /// Solver to use
    solver: SolverType,

    #[arg(long)]
    /// Log the SMT dialogue to <file>.smt2 alongside the input file
    smt: bool,

    #[arg(long, default_value_t = 600)]
    /// SMT solver timeout in seconds
    timeout: usize,

    #[arg(long, default_value_t = 0)]
    /// SMT solver random seed
    solver_seed: usize,
}

impl SolverArgs {
    fn get_solver_conf(&self, fname: &str) -> SolverConf {
        let backend_type = match &self.solver {
            SolverType::Z3 => backends::SolverType::Z3,
            SolverType::Mathsat => backends::SolverType::MathSat,
            SolverType::Cvc4 => backends::SolverType::Cvc4,
        };
        SolverConf::new(
            backend_type,
            self.smt,
            fname,
            self.timeout,
            self.solver_seed,
        )
    }
}

#[derive(clap::Parser, Debug)]
#[command(about, long_about=None)]
/// Synthesize qualifier predicates for the k-variables of a Horn constraint
/// record by finite unrolling and tree interpolation.
pub struct App {
    #[command(flatten)]
    solver: SolverArgs,

    #[arg(long, default_value_t = 2)]
    /// Unrolling depth budget for each k-variable
    depth: usize,

    /// File name for a JSON-encoded constraint record
    file: String,
}

impl App {
    /// Run the application.
    pub fn exec(self) {
        let contents = match fs::read_to_string(&self.file) {
            Ok(contents) => contents,
            Err(err) => {
                eprintln!("error: could not read {}: {err}", self.file);
                process::exit(1);
            }
        };
        let fi: FInfo = match serde_json::from_str(&contents) {
            Ok(fi) => fi,
            Err(err) => {
                eprintln!("error: could not parse {}: {err}", self.file);
                process::exit(1);
            }
        };

        let conf = self.solver.get_solver_conf(&self.file);
        match synthesize(&fi, self.depth, &conf) {
            Ok(qualifiers) => {
                for q in qualifiers {
                    println!("{q}");
                }
            }
            Err(err) => {
                eprintln!("error: {err}");
                process::exit(1);
            }
        }
    }
}
