// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Decomposition of candidate predicates into atomic qualifiers with typed
//! parameter lists.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use logic::syntax::{Expr, KVar, NOp, Sort, Symbol, VV};
use serde::Serialize;

/// A typed atomic predicate template for the downstream Horn solver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Qualifier {
    /// The qualifier's name, unique within one extraction
    pub name: String,
    /// Typed parameters, in symbol order
    pub params: Vec<(Symbol, Sort)>,
    /// The atomic predicate
    pub body: Expr,
    /// The k-variable the qualifier was extracted from
    pub loc: String,
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "qualif {}({}): {}",
            self.name,
            self.params
                .iter()
                .map(|(sym, sort)| format!("{sym}:{sort}"))
                .join(", "),
            logic::printer::expr(&self.body)
        )
    }
}

/// The atoms of a predicate: subterms below conjunction and disjunction.
fn atoms(e: &Expr) -> Vec<Expr> {
    match e {
        Expr::NAryOp(NOp::And | NOp::Or, es) => es.iter().flat_map(atoms).collect(),
        _ => vec![e.clone()],
    }
}

/// Decompose candidate predicates into deduplicated qualifiers.
///
/// Parameters are the atom's free symbols with sorts from the environment
/// (the k-variable's parameter sort for *vv*, integer when unrecorded).
/// Output order follows candidate order, so extraction is deterministic and
/// idempotent.
pub fn extract_qualifiers(
    candidates: &BTreeMap<KVar, Vec<Expr>>,
    sym_sorts: &BTreeMap<Symbol, Sort>,
    kvar_sorts: &BTreeMap<KVar, Sort>,
) -> Vec<Qualifier> {
    let mut seen: Vec<(Vec<(Symbol, Sort)>, Expr)> = vec![];
    let mut qualifiers = vec![];
    for (kvar, predicates) in candidates {
        for predicate in predicates {
            for atom in atoms(predicate) {
                if matches!(atom, Expr::Literal(_)) {
                    continue;
                }
                let params: Vec<(Symbol, Sort)> = atom
                    .free_symbols()
                    .into_iter()
                    .map(|sym| {
                        let sort = if sym == VV {
                            kvar_sorts.get(kvar).cloned().unwrap_or(Sort::Int)
                        } else {
                            match sym_sorts.get(&sym) {
                                Some(sort) => sort.clone(),
                                None => {
                                    log::debug!("no sort recorded for {sym}, defaulting to Int");
                                    Sort::Int
                                }
                            }
                        };
                        (sym, sort)
                    })
                    .collect();
                let key = (params, atom);
                if seen.contains(&key) {
                    continue;
                }
                let (params, body) = key.clone();
                seen.push(key);
                qualifiers.push(Qualifier {
                    name: format!("Q{}", qualifiers.len()),
                    params,
                    body,
                    loc: kvar.0.clone(),
                });
            }
        }
    }
    log::debug!("extracted {} qualifiers", qualifiers.len());
    qualifiers
}
