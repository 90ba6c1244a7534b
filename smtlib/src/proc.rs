// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Manage a running SMT process.
//!
//! This is a low-level generic API for SMT-LIB solvers; the solver-specific
//! parts are captured by the [`SolverCmd`] passed to launch the solver and by
//! the interpolation driver that interprets responses.
//!
//! There is no in-query cancellation: a query blocks until the solver answers.
//! Teardown closes the solver's stdin, drains any partially-consumed response,
//! and reaps the process.

use crate::conf::SolverCmd;
use crate::sexp;
use crate::tee::Tee;
use std::{
    ffi::{OsStr, OsString},
    io::{self, BufRead, BufReader, Write},
    path::Path,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};
use thiserror::Error;

use super::sexp::{app, atom_s, Sexp};

/// SmtProc wraps an instance of a solver process.
#[derive(Debug)]
pub struct SmtProc {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    tee: Option<Tee>,
}

/// SatResp is a solver's response to a `(check-sat)` or similar command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResp {
    /// The query is satisfiable.
    Sat,
    /// The query is unsatisfiable (and thus negated assertions are valid).
    Unsat,
    /// Unknown whether the query is sat or unsat. The reason is the one given
    /// by (get-info :reason-unknown).
    Unknown(String),
}

#[derive(Error, Debug)]
/// An error from trying to call the solver
pub enum SolverError {
    /// I/O went wrong
    #[error("some I/O went wrong: {0}")]
    Io(#[from] io::Error),
    /// Solver returned an `(error ...)` response or closed its output
    #[error("solver returned an error:\n{0}")]
    UnexpectedClose(String),
}

type Result<T> = std::result::Result<T, SolverError>;

impl Drop for SmtProc {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl SmtProc {
    /// Create a new SMT process by running a solver.
    ///
    /// The optional `tee` argument records the full dialogue to a file, for
    /// debugging purposes.
    pub fn new(cmd: SolverCmd, tee: Option<&Path>) -> Result<Self> {
        let mut child = Command::new(OsStr::new(&cmd.cmd))
            .args(cmd.args.iter().map(OsString::from))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(SolverError::from)?;
        let tee = match tee {
            Some(path) => {
                let mut f = Tee::create(path)?;
                f.comment(&cmd.cmdline());
                Some(f)
            }
            None => None,
        };
        let stdin = child.stdin.take().unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap());
        let mut proc = Self {
            child,
            stdin,
            stdout,
            tee,
        };
        for (option, val) in &cmd.options {
            proc.send(&app(
                "set-option",
                [atom_s(format!(":{option}")), atom_s(val)],
            ));
        }
        proc.send(&app("set-logic", vec![atom_s("QF_UFLIA")]));
        Ok(proc)
    }

    /// Low-level API to send the solver a command as an s-expression. This
    /// should only be used for commands that do not require a response.
    pub fn send(&mut self, data: &sexp::Sexp) {
        writeln!(self.stdin, "{data}").expect("I/O error: failed to send to solver");
        if let Some(f) = &mut self.tee {
            f.append(data);
        }
    }

    /// Send the solver a command that expects a response, which is parsed as a
    /// single s-expression.
    pub fn send_with_reply(&mut self, data: &sexp::Sexp) -> Result<sexp::Sexp> {
        self.send(data);
        let resp = self.get_response_raw()?;
        sexp::parse(&resp)
            .map_err(|err| SolverError::UnexpectedClose(format!("could not parse {resp}: {err}")))
    }

    /// A marker for determining end of solver response.
    const DONE: &'static str = "<<DONE>>";

    /// Read one complete response from the solver, as raw text.
    ///
    /// This works by sending an echo marker after the pending command and
    /// accumulating lines until the marker comes back, so it must be called
    /// exactly once for each command that produces a response; any response
    /// left unconsumed would be misattributed to the next command.
    pub fn get_response_raw(&mut self) -> Result<String> {
        writeln!(self.stdin, r#"(echo "{}")"#, Self::DONE)?;
        self.stdin.flush()?;
        // buf accumulates the entire response, which is read line-by-line
        // looking for the DONE marker.
        let mut buf = String::new();
        loop {
            let last_end = buf.len();
            // n is the number of bytes read (that is, the length of this line
            // including the newline)
            let n = self.stdout.read_line(&mut buf)?;
            if n == 0 {
                let msg = Self::parse_error(&buf);
                return Err(SolverError::UnexpectedClose(msg));
            }
            // last line, without the newline
            let last_line = buf[last_end..last_end + n].trim_end();
            // Z3 doesn't put quotes and CVC does (quotes do follow SMT-LIB)
            if last_line == Self::DONE || last_line == format!("\"{}\"", Self::DONE) {
                let response = buf[..last_end].trim_end();
                return Ok(response.to_string());
            }
        }
    }

    /// Get some attribute using the SMT get-info command.
    pub fn get_info(&mut self, attribute: &str) -> Result<Sexp> {
        let resp = self.send_with_reply(&app("get-info", [atom_s(attribute)]))?;
        match resp.list() {
            Some(s) if s.len() == 2 && s[0] == atom_s(attribute) => Ok(s[1].clone()),
            _ => Err(SolverError::UnexpectedClose(format!(
                "unexpected get-info response {resp}"
            ))),
        }
    }

    /// Parse an error message returned as an s-expression.
    ///
    /// Z3 returns check-sat errors as `(error "msg")` followed by a dummy
    /// result, so the response is parsed as a sequence of sexps and searched
    /// for the error form.
    fn parse_error(resp: &str) -> String {
        let sexps = match sexp::parse_many(resp) {
            Ok(ss) => ss,
            Err(_) => return resp.to_string(),
        };
        let error_msg = sexps
            .iter()
            .filter_map(|s| {
                s.app().and_then(|(head, args)| {
                    if head == "error" && args.len() == 1 {
                        args[0].atom_s()
                    } else {
                        None
                    }
                })
            })
            .next();
        error_msg.unwrap_or(resp).to_string()
    }

    /// Classify a raw response to a sat-like query.
    pub fn parse_sat(&mut self, resp: &str) -> Result<SatResp> {
        if resp == "unsat" {
            return Ok(SatResp::Unsat);
        }
        if resp == "sat" {
            return Ok(SatResp::Sat);
        }
        if resp == "unknown" {
            let reason = self.get_info(":reason-unknown")?;
            return Ok(SatResp::Unknown(reason.to_string()));
        }
        Err(SolverError::UnexpectedClose(Self::parse_error(resp)))
    }

    /// Send the solver `(check-sat)`. For unknown gets a reason, but does not
    /// call `(get-model)` for sat.
    pub fn check_sat(&mut self) -> Result<SatResp> {
        self.send(&app("check-sat", []));
        let resp = self.get_response_raw()?;
        self.parse_sat(&resp)
    }

    /// Add a comment to the tee'd file.
    ///
    /// The comment is passed as a closure, which is not evaluated if there is
    /// no tee'd smt2 file.
    pub fn comment_with<F>(&mut self, comment: F)
    where
        F: FnOnce() -> String,
    {
        if let Some(f) = &mut self.tee {
            let comment = comment();
            f.comment(&comment);
        }
    }

    /// Close the solver's stdin, drain whatever output it still has buffered,
    /// and reap the process. Draining matters when teardown happens mid-query:
    /// orphan bytes would otherwise keep the pipe (and the child) alive.
    fn shutdown(&mut self) {
        _ = writeln!(self.stdin, "(exit)");
        _ = self.stdin.flush();
        let mut scratch = String::new();
        while let Ok(n) = self.stdout.read_line(&mut scratch) {
            if n == 0 {
                break;
            }
            scratch.clear();
        }
        _ = self.child.kill();
        _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        conf::Z3Conf,
        path::solver_path,
        proc::{SatResp, SmtProc},
        sexp::{app, atom_s, parse},
    };

    /// Start Z3, or skip the test when the binary is not available.
    fn start_z3() -> Option<SmtProc> {
        let z3 = Z3Conf::new(&solver_path("z3"), false).done();
        match SmtProc::new(z3, None) {
            Ok(proc) => Some(proc),
            Err(_) => {
                eprintln!("could not find z3, skipping test");
                None
            }
        }
    }

    #[test]
    fn test_check_sat_z3() {
        let Some(mut solver) = start_z3() else {
            return;
        };
        let response = solver.check_sat().expect("could not check-sat");
        assert!(
            matches!(response, SatResp::Sat { .. }),
            "should be sat, got {response:?}"
        );
    }

    #[test]
    fn test_unsat_z3() {
        let Some(mut solver) = start_z3() else {
            return;
        };
        solver.send(&app("declare-const", [atom_s("a"), atom_s("Bool")]));
        let e = parse("(assert (and a (not a)))").unwrap();
        solver.send(&e);
        let response = solver.check_sat().expect("could not check-sat");
        assert_eq!(response, SatResp::Unsat);
    }

    #[test]
    fn test_spawn_many() {
        let z3 = Z3Conf::new(&solver_path("z3"), false).done();
        if SmtProc::new(z3.clone(), None).is_err() {
            eprintln!("could not find z3, skipping test");
            return;
        }
        for _ in 0..10 {
            let _ = SmtProc::new(z3.clone(), None).unwrap();
        }
    }
}
