// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Construct launch and option configurations for Z3, MathSAT, and CVC4.

/// The full invocation of a solver binary.
#[derive(Debug, Clone)]
pub struct SolverCmd {
    /// Binary to launch
    pub cmd: String,
    /// Arguments to pass
    pub args: Vec<String>,
    /// SMT options to send on startup
    pub options: Vec<(String, String)>,
}

impl SolverCmd {
    fn args<I, S>(&mut self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().to_string()));
    }

    /// Set an option.
    pub fn option<S: AsRef<str>>(&mut self, name: &str, val: S) {
        self.options
            .push((name.to_string(), val.as_ref().to_string()));
    }

    /// Build the command line string, for printing purposes.
    pub fn cmdline(&self) -> String {
        #[allow(clippy::useless_format)]
        let args: Vec<_> = self
            .args
            .iter()
            .map(|a| {
                if a.contains(' ') {
                    format!("\"{a}\"")
                } else {
                    format!("{a}")
                }
            })
            .collect();
        format!("{} {}", &self.cmd, args.join(" "))
    }
}

/// Builder for creating a Z3 [`SolverCmd`].
///
/// Z3 renamed its options in 4.3.2; `legacy_options` selects the old names so
/// interpolation queries work against pre-4.3.2 binaries.
#[derive(Debug, Clone)]
pub struct Z3Conf {
    legacy_options: bool,
    cmd: SolverCmd,
}

impl Z3Conf {
    /// Create a Z3Conf with the model and quantifier-instantiation options an
    /// interpolation query needs. Uses `cmd` as the path to Z3.
    pub fn new(cmd: &str, legacy_options: bool) -> Self {
        let mut cmd = SolverCmd {
            cmd: cmd.to_string(),
            args: vec![],
            options: vec![],
        };
        cmd.args(["-in", "-smt2"]);
        cmd.option("auto-config", "false");
        cmd.option("model", "true");
        if legacy_options {
            cmd.option("model-partial", "false");
            cmd.option("mbqi", "false");
        } else {
            cmd.option("model.partial", "false");
            cmd.option("smt.mbqi", "false");
        }
        Self {
            legacy_options,
            cmd,
        }
    }

    /// Set the SMT timeout option
    pub fn timeout_ms(&mut self, ms: Option<usize>) {
        // this is the default Z3 timeout
        let ms = ms.unwrap_or(4294967295);
        let name = if self.legacy_options {
            "SOFT_TIMEOUT"
        } else {
            "timeout"
        };
        self.cmd.option(name, format!("{ms}"));
    }

    /// Set the solver's random seeds.
    pub fn seed(&mut self, seed: usize) {
        if self.legacy_options {
            self.cmd.option("RANDOM_SEED", format!("{seed}"));
        } else {
            self.cmd.option("smt.random_seed", format!("{seed}"));
            self.cmd.option("sat.random_seed", format!("{seed}"));
        }
    }

    /// Get access to the raw options of the solver.
    pub fn options(&mut self) -> &mut SolverCmd {
        &mut self.cmd
    }

    /// Get the final command to run the solver.
    pub fn done(self) -> SolverCmd {
        self.cmd
    }
}

/// Builder for a MathSAT [`SolverCmd`].
#[derive(Debug, Clone)]
pub struct MathSatConf(SolverCmd);

impl MathSatConf {
    /// Create a new MathSAT builder with interpolation enabled.
    pub fn new(cmd: &str) -> Self {
        let mut cmd = SolverCmd {
            cmd: cmd.to_string(),
            args: vec![],
            options: vec![],
        };
        cmd.option("produce-interpolants", "true");
        Self(cmd)
    }

    /// Set a per-query time limit. None sets no time limit.
    pub fn timeout_ms(&mut self, ms: Option<usize>) {
        if let Some(ms) = ms {
            self.0.option("timeout", format!("{ms}"));
        }
    }

    /// Get access to the raw options of the solver.
    pub fn options(&mut self) -> &mut SolverCmd {
        &mut self.0
    }

    /// Get the final command to run the solver.
    pub fn done(self) -> SolverCmd {
        self.0
    }
}

/// Builder for a CVC4 [`SolverCmd`].
#[derive(Debug, Clone)]
pub struct CvcConf(SolverCmd);

impl CvcConf {
    /// Create a new CVC4 builder with some default options.
    pub fn new(cmd: &str) -> Self {
        let mut cmd = SolverCmd {
            cmd: cmd.to_string(),
            args: vec![],
            options: vec![],
        };
        // --lang smt2 is needed when using stdin; when run on a file with a
        // .smt2 extension the input format is inferred.
        cmd.args(vec!["-q", "--lang", "smt2"]);
        cmd.option("interactive", "false");
        cmd.option("incremental", "true");
        cmd.option("seed", "1");
        Self(cmd)
    }

    /// Set a per-query time limit. None sets no time limit.
    pub fn timeout_ms(&mut self, ms: Option<usize>) {
        let ms = ms.unwrap_or(0);
        self.0.option("tlimit-per", format!("{ms}"));
    }

    /// Get access to the raw options of the solver.
    pub fn options(&mut self) -> &mut SolverCmd {
        &mut self.0
    }

    /// Get the final command to run the solver.
    pub fn done(self) -> SolverCmd {
        self.0
    }
}
