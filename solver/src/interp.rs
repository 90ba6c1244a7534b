// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The interpolation dialogue with a running solver.
//!
//! One [`InterpSolver`] owns one solver process. Symbol declarations persist
//! for the lifetime of the process; each interpolation query runs inside its
//! own push/pop bracket so assertions do not accumulate.

use std::collections::BTreeSet;
use std::path::Path;

use logic::syntax::{Expr, Sort, Symbol};
use smtlib::conf::SolverCmd;
use smtlib::proc::{SmtProc, SolverError};
use smtlib::sexp::{app, atom_s, parse_many, Sexp};
use thiserror::Error;

use crate::sexp::{self, DecodeError};

/// An error in the interpolation dialogue. All of these are fatal for the
/// current query.
#[derive(Error, Debug)]
pub enum InterpError {
    /// The underlying solver process failed
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// The solver answered `sat`; interpolation assumes the query is
    /// unsatisfiable
    #[error("interpolation query was satisfiable")]
    UnexpectedSat,
    /// The solver answered `unknown`, with its reason
    #[error("solver returned unknown: {0}")]
    Unknown(String),
    /// An interpolant did not decode
    #[error("could not parse interpolant: {0}")]
    BadInterpolant(#[from] DecodeError),
    /// The solver returned a different number of interpolants than the query
    /// had cut markers
    #[error("expected {expected} interpolants, got {got}")]
    InterpolantCount {
        /// Number of cut markers in the query
        expected: usize,
        /// Number of interpolants in the response
        got: usize,
    },
}

/// The states of the per-query dialogue. Declarations happen from `Idle`;
/// a query moves through the remaining states and back to `Idle`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum DialogueState {
    Idle,
    Asserting,
    WaitingSat,
    WaitingInterp,
}

/// A solver handle specialized to interpolation queries.
pub struct InterpSolver {
    proc: SmtProc,
    declared: BTreeSet<Symbol>,
    declared_sorts: BTreeSet<String>,
    n_queries: usize,
    state: DialogueState,
}

impl InterpSolver {
    /// Launch a solver. The `tee` argument records the dialogue to a file.
    pub fn new(cmd: SolverCmd, tee: Option<&Path>) -> Result<Self, InterpError> {
        let proc = SmtProc::new(cmd, tee)?;
        Ok(Self {
            proc,
            declared: BTreeSet::new(),
            declared_sorts: BTreeSet::new(),
            n_queries: 0,
            state: DialogueState::Idle,
        })
    }

    /// Declare symbols with their sorts. Symbols already declared on this
    /// process are skipped, so redeclaration across queries is harmless.
    /// Named sorts are declared on first use.
    pub fn declare_symbols<'a, I>(&mut self, syms: I)
    where
        I: IntoIterator<Item = (&'a Symbol, &'a Sort)>,
    {
        debug_assert_eq!(self.state, DialogueState::Idle);
        for (sym, sort) in syms {
            if !self.declared.insert(sym.clone()) {
                continue;
            }
            if let Sort::Named(name) = sort {
                if self.declared_sorts.insert(name.clone()) {
                    self.proc.send(&app(
                        "declare-sort",
                        [atom_s(name), smtlib::sexp::atom_i(0)],
                    ));
                }
            }
            self.proc.send(&app(
                "declare-fun",
                [atom_s(sym), Sexp::List(vec![]), sexp::sort(sort)],
            ));
        }
    }

    /// Run one interpolation query: assert `formula` (which contains
    /// `expected_cuts` cut markers), ask for interpolants, and decode exactly
    /// `expected_cuts` of them. The assertion is scoped to this query.
    pub fn interpolate(
        &mut self,
        formula: &Expr,
        expected_cuts: usize,
    ) -> Result<Vec<Expr>, InterpError> {
        debug_assert_eq!(self.state, DialogueState::Idle);
        self.proc.send(&app("push", []));
        let result = self.interpolate_inner(formula, expected_cuts);
        self.proc.send(&app("pop", []));
        self.state = DialogueState::Idle;
        result
    }

    fn interpolate_inner(
        &mut self,
        formula: &Expr,
        expected_cuts: usize,
    ) -> Result<Vec<Expr>, InterpError> {
        self.state = DialogueState::Asserting;
        let label = format!("p-{}", self.n_queries);
        self.n_queries += 1;
        self.proc.send(&app(
            "assert",
            [app("!", [sexp::expr(formula), atom_s(":named"), atom_s(label)])],
        ));

        self.state = DialogueState::WaitingSat;
        self.proc.send(&app("compute-interpolant", []));
        let raw = self.proc.get_response_raw()?;
        let mut lines = raw.lines().filter(|l| !l.trim().is_empty());
        let verdict = lines.next().unwrap_or("").trim();
        match verdict {
            "unsat" => (),
            "sat" => return Err(InterpError::UnexpectedSat),
            "unknown" => {
                let reason = self.proc.get_info(":reason-unknown")?;
                return Err(InterpError::Unknown(reason.to_string()));
            }
            other => {
                // probably an (error ...) response
                return Err(InterpError::Solver(match self.proc.parse_sat(other) {
                    Err(err) => err,
                    Ok(resp) => SolverError::UnexpectedClose(format!(
                        "unexpected interpolation response {resp:?}"
                    )),
                }));
            }
        }

        self.state = DialogueState::WaitingInterp;
        let mut rest: String = lines.collect::<Vec<_>>().join("\n");
        // the grammar wants comments newline-terminated
        rest.push('\n');
        let sexps = parse_many(&rest)
            .map_err(|err| SolverError::UnexpectedClose(format!("{err} in {rest}")))?;
        let interps = sexps
            .iter()
            .filter(|s| !matches!(s, Sexp::Comment(_)))
            .map(sexp::decode)
            .collect::<Result<Vec<_>, _>>()?;
        if interps.len() != expected_cuts {
            return Err(InterpError::InterpolantCount {
                expected: expected_cuts,
                got: interps.len(),
            });
        }
        log::info!(
            "query {}: {} interpolants",
            self.n_queries - 1,
            interps.len()
        );
        Ok(interps)
    }
}
