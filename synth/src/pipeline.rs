// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The end-to-end qualifier synthesis pipeline: normalize, unroll, expand,
//! interpolate, extract.

use std::collections::BTreeMap;

use horn::clauses::{normalize, NormalizeError};
use horn::finfo::FInfo;
use logic::syntax::{Expr, KVar};
use solver::conf::SolverConf;
use solver::interp::InterpError;
use thiserror::Error;

use crate::expand::expand;
use crate::qualif::{extract_qualifiers, Qualifier};
use crate::query::{count_cuts, query_formula};
use crate::solutions::{attach_interps, extract_candidates};
use crate::unroll::unroll;

/// A pipeline failure, naming the phase and the offending entity. Nothing is
/// emitted on failure.
#[derive(Error, Debug)]
pub enum SynthError {
    /// Clause normalization rejected the input record
    #[error("normalize: {0}")]
    Normalize(#[from] NormalizeError),
    /// The solver could not be launched
    #[error("solver startup: {0}")]
    Startup(#[source] InterpError),
    /// An interpolation query failed
    #[error("interpolation for constraint {constraint}: {err}")]
    Interp {
        /// The constraint whose query failed
        constraint: u32,
        /// The underlying dialogue error
        #[source]
        err: InterpError,
    },
}

/// Synthesize qualifier predicates for the k-variables of `fi` by unrolling
/// each query to `depth` and tree-interpolating the expansions.
pub fn synthesize(
    fi: &FInfo,
    depth: usize,
    conf: &SolverConf,
) -> Result<Vec<Qualifier>, SynthError> {
    let sys = normalize(fi)?;
    let mut solver = conf.solver().map_err(SynthError::Startup)?;
    solver.declare_symbols(sys.sym_sorts.iter());

    let mut candidates: BTreeMap<KVar, Vec<Expr>> = BTreeMap::new();
    for query in &sys.queries {
        let (disjunctive, state) = unroll(query, depth, &sys.kclauses, &sys.sym_sorts);
        let trees = expand(&disjunctive);
        log::info!(
            "constraint {}: {} tree interpolation queries",
            query.id,
            trees.len()
        );
        solver.declare_symbols(state.created.iter());
        for tree in &trees {
            let formula = query_formula(tree);
            let cuts = count_cuts(&formula);
            let interps = solver
                .interpolate(&formula, cuts)
                .map_err(|err| SynthError::Interp {
                    constraint: query.id,
                    err,
                })?;
            let tree_interp = attach_interps(tree, &interps);
            extract_candidates(&tree_interp, &state, &mut candidates);
        }
    }

    Ok(extract_qualifiers(
        &candidates,
        &sys.sym_sorts,
        &sys.kvar_sorts,
    ))
}
