// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Holds the configuration needed to launch an interpolating solver.

use std::path::PathBuf;

use crate::{
    backends::{GenericBackend, SolverType},
    interp::{InterpError, InterpSolver},
};

/// Wrapper around the configuration needed to launch a solver.
#[derive(Debug, Clone)]
pub struct SolverConf {
    /// Which backend to use for launched solvers.
    pub backend: GenericBackend,
    /// The optional path to tee the SMT dialogue to.
    pub tee: Option<PathBuf>,
}

impl SolverConf {
    /// Create a new solver configuration. When `tee_smt` is set, the dialogue
    /// is logged to `<fname>.smt2`.
    pub fn new(
        solver_type: SolverType,
        tee_smt: bool,
        fname: &str,
        timeout_secs: usize,
        seed: usize,
    ) -> Self {
        let mut backend = GenericBackend::new(solver_type, &crate::solver_path(match solver_type {
            SolverType::Z3 => "z3",
            SolverType::MathSat => "mathsat",
            SolverType::Cvc4 => "cvc4",
        }));
        backend
            .timeout_ms(if timeout_secs > 0 {
                Some(timeout_secs * 1000)
            } else {
                None
            })
            .seed(seed);
        let tee = if tee_smt {
            Some(PathBuf::from(format!("{fname}.smt2")))
        } else {
            None
        };
        Self { backend, tee }
    }

    /// Launch a new solver with this configuration.
    pub fn solver(&self) -> Result<InterpSolver, InterpError> {
        InterpSolver::new(self.backend.get_cmd(), self.tee.as_deref())
    }
}
