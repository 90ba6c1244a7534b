// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Support for launching an interpolating solver (Z3, MathSAT, or CVC4).
//!
//! The solver-specific parts are the startup options and, for Z3, a version
//! probe: option names changed in 4.3.2, so the backend picks the legacy or
//! the namespaced option set based on the binary's reported version.

use std::process::Command;

use lazy_static::lazy_static;
use regex::Regex;
use smtlib::conf::{CvcConf, MathSatConf, SolverCmd, Z3Conf};

/// The type of solver being used
#[allow(missing_docs)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SolverType {
    Z3,
    MathSat,
    Cvc4,
}

/// A Backend for launching Z3/MathSAT/CVC4 with interpolation options.
#[derive(Debug, Clone)]
pub struct GenericBackend {
    solver_type: SolverType,
    bin: String,
    timeout_ms: Option<usize>,
    seed: usize,
}

/// Probe a Z3 binary for its version by running `bin --version`.
///
/// Returns None when the binary cannot be run or prints something
/// unrecognized, in which case the caller should assume a modern version.
fn z3_version(bin: &str) -> Option<(u32, u32, u32)> {
    lazy_static! {
        static ref VERSION_RE: Regex = Regex::new(r"Z3 version (\d+)\.(\d+)\.(\d+)").unwrap();
    }
    let out = Command::new(bin).arg("--version").output().ok()?;
    let stdout = String::from_utf8_lossy(&out.stdout);
    let cs = VERSION_RE.captures(&stdout)?;
    let part = |i: usize| cs.get(i).unwrap().as_str().parse().ok();
    Some((part(1)?, part(2)?, part(3)?))
}

impl GenericBackend {
    /// Create a Backend for a given type of solver and with a path to the
    /// solver binary.
    pub fn new(solver_type: SolverType, bin: &str) -> Self {
        Self {
            solver_type,
            bin: bin.to_string(),
            timeout_ms: None,
            seed: 0,
        }
    }

    /// Set the solver timeout. None disables the timeout.
    pub fn timeout_ms(&mut self, timeout_ms: Option<usize>) -> &mut Self {
        self.timeout_ms = timeout_ms;
        return self;
    }

    /// Set the solver's random seed.
    pub fn seed(&mut self, seed: usize) -> &mut Self {
        self.seed = seed;
        return self;
    }

    /// Get the solver type.
    pub fn get_solver_type(&self) -> SolverType {
        self.solver_type
    }

    /// Get a [`SolverCmd`] with all the info to launch this solver.
    pub fn get_cmd(&self) -> SolverCmd {
        match self.solver_type {
            SolverType::Z3 => {
                let legacy = match z3_version(&self.bin) {
                    Some(version) => version < (4, 3, 2),
                    None => false,
                };
                log::debug!("z3 legacy options: {legacy}");
                let mut conf = Z3Conf::new(&self.bin, legacy);
                conf.timeout_ms(self.timeout_ms);
                if self.seed != 0 {
                    conf.seed(self.seed);
                }
                conf.done()
            }
            SolverType::MathSat => {
                let mut conf = MathSatConf::new(&self.bin);
                conf.timeout_ms(self.timeout_ms);
                if self.seed != 0 {
                    conf.options().option("random_seed", format!("{}", self.seed));
                }
                conf.done()
            }
            SolverType::Cvc4 => {
                let mut conf = CvcConf::new(&self.bin);
                conf.timeout_ms(self.timeout_ms);
                if self.seed != 0 {
                    conf.options().option("seed", format!("{}", self.seed));
                }
                conf.done()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smtlib::path::solver_path;

    #[test]
    fn test_z3_version_probe() {
        let bin = solver_path("z3");
        match z3_version(&bin) {
            Some(version) => assert!(version >= (4, 0, 0), "implausible version {version:?}"),
            None => eprintln!("could not find z3, skipping test"),
        }
    }

    #[test]
    fn test_get_cmd_z3() {
        let backend = GenericBackend::new(SolverType::Z3, &solver_path("z3"));
        let cmd = backend.get_cmd();
        assert!(cmd.args.contains(&"-in".to_string()));
        assert!(cmd.options.iter().any(|(name, _)| name == "model"));
    }
}
