// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The constraint record handed over by the upstream constraint-file loader.

use std::collections::BTreeMap;

use logic::syntax::{Expr, KVar, Sort, Symbol};
use serde::{Deserialize, Serialize};

/// A sort refined by a predicate over a named value variable. `refinement`
/// holds with `vv` bound to the value being described.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedReft {
    /// The name the refinement uses for the described value
    pub vv: Symbol,
    /// The base sort of the described value
    pub sort: Sort,
    /// The refinement predicate
    pub refinement: Expr,
}

/// A subtyping constraint between two refined sorts, under an environment of
/// bound variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubC {
    /// Bind ids (into [`FInfo::binds`]) in scope for this constraint
    pub env: Vec<u32>,
    /// The left-hand refinement
    pub lhs: SortedReft,
    /// The right-hand refinement
    pub rhs: SortedReft,
}

/// The input record: bind environment, subtyping constraints, well-formedness
/// constraints, and literal sorts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FInfo {
    /// Binder id to (symbol, refined sort)
    pub binds: BTreeMap<u32, (Symbol, SortedReft)>,
    /// Constraint id to subtyping constraint
    pub constraints: BTreeMap<u32, SubC>,
    /// Each k-variable's parameter sort (the sort of its implicit argument)
    pub wf: BTreeMap<KVar, Sort>,
    /// Sorts of interpreted literals
    pub lits: Vec<(Symbol, Sort)>,
    /// The k-variables under consideration. Each must have a well-formedness
    /// entry; the rules themselves are recovered from the constraints.
    pub kvars: Vec<KVar>,
}
