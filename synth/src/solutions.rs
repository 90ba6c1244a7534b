// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Rehydrating tree interpolants into per-k-variable candidate predicates.

use std::collections::BTreeMap;

use logic::subst::substitute;
use logic::syntax::{Expr, KVar, Subst, VV};

use crate::unroll::{InterpQuery, OccInfo, UnrollState};

/// A tree interpolant: the skeleton of an expanded query tree with the
/// solver's interpolant at every node. The root carries `false` (the
/// conjunction of the whole tree is unsatisfiable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeInterp {
    /// The occurrence this node was generated from, if any
    pub info: Option<OccInfo>,
    /// The interpolant at this cut
    pub interp: Expr,
    /// Child cuts
    pub children: Vec<TreeInterp>,
}

/// Attach the interpolant stream returned by the solver to an expanded query
/// tree, preserving its skeleton and `info` tags exactly.
///
/// The stream lists one interpolant per And-node other than the root, in
/// pre-order (a node's interpolant precedes its children's, siblings left to
/// right) matching the order of cut markers in the emitted formula.
///
/// Panics if the stream is shorter than the tree; the driver has already
/// checked the count against the number of cut markers.
pub fn attach_interps(tree: &InterpQuery, interps: &[Expr]) -> TreeInterp {
    fn go(tree: &InterpQuery, interps: &[Expr], next: &mut usize, root: bool) -> TreeInterp {
        let InterpQuery::And {
            info,
            children,
            ..
        } = tree
        else {
            panic!("attach_interps expects an expanded (Or-free) query tree");
        };
        let interp = if root {
            Expr::Literal(false)
        } else {
            let e = interps[*next].clone();
            *next += 1;
            e
        };
        TreeInterp {
            info: info.clone(),
            interp,
            children: children
                .iter()
                .map(|c| go(c, interps, next, false))
                .collect(),
        }
    }
    let mut next = 0;
    go(tree, interps, &mut next, true)
}

/// Replace every free variable whose name parses as an integer with the
/// corresponding integer constant.
///
/// The upstream encoding turns integer constants into symbol names in some
/// positions; this reverses that. It is unsound if the input genuinely binds
/// a variable named like `17`, which the encoding never produces.
pub fn numberify(e: &Expr) -> Expr {
    match e {
        Expr::Var(s) => match s.parse::<i64>() {
            Ok(i) => Expr::int(i),
            Err(_) => e.clone(),
        },
        Expr::Literal(_) | Expr::Constant(_) => e.clone(),
        Expr::UnaryOp(op, a) => Expr::UnaryOp(*op, Box::new(numberify(a))),
        Expr::BinOp(op, a, b) => {
            Expr::BinOp(*op, Box::new(numberify(a)), Box::new(numberify(b)))
        }
        Expr::NAryOp(op, es) => Expr::NAryOp(*op, es.iter().map(numberify).collect()),
        Expr::NumOp(op, a, b) => {
            Expr::NumOp(*op, Box::new(numberify(a)), Box::new(numberify(b)))
        }
        Expr::NumRel(rel, a, b) => {
            Expr::NumRel(*rel, Box::new(numberify(a)), Box::new(numberify(b)))
        }
        Expr::Ite { cond, then, else_ } => Expr::Ite {
            cond: Box::new(numberify(cond)),
            then: Box::new(numberify(then)),
            else_: Box::new(numberify(else_)),
        },
        Expr::App(f, es) => Expr::App(f.clone(), es.iter().map(numberify).collect()),
        Expr::KVar(k, sigma) => Expr::KVar(
            k.clone(),
            sigma
                .iter()
                .map(|(key, v)| (key.clone(), numberify(v)))
                .collect(),
        ),
        Expr::Exists { binders, body } => Expr::Exists {
            binders: binders.clone(),
            body: Box::new(numberify(body)),
        },
        Expr::Interp(a) => Expr::Interp(Box::new(numberify(a))),
    }
}

/// Walk a tree interpolant top-down and collect, for each tagged node, a
/// candidate predicate for its k-variable: the interpolant with every fresh
/// symbol replaced by the original it stands for and the occurrence's value
/// symbol rehydrated to *vv*.
pub fn extract_candidates(
    tree: &TreeInterp,
    state: &UnrollState,
    candidates: &mut BTreeMap<KVar, Vec<Expr>>,
) {
    let undo: Subst = state
        .subs
        .iter()
        .map(|(fresh, orig)| (fresh.clone(), Expr::var(orig)))
        .collect();
    walk(tree, state, &undo, candidates);
}

fn walk(
    tree: &TreeInterp,
    state: &UnrollState,
    undo: &Subst,
    candidates: &mut BTreeMap<KVar, Vec<Expr>>,
) {
    if let Some(OccInfo { kvar, sym }) = &tree.info {
        let e = numberify(&substitute(&tree.interp, undo));
        let mut vv_sub = Subst::new();
        vv_sub.insert(state.original(sym), Expr::var(VV));
        let e = substitute(&e, &vv_sub);
        candidates.entry(kvar.clone()).or_default().push(e);
    }
    for child in &tree.children {
        walk(child, state, undo, candidates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logic::syntax::NumRel;

    fn geq(a: Expr, b: Expr) -> Expr {
        Expr::NumRel(NumRel::Geq, Box::new(a), Box::new(b))
    }

    #[test]
    fn test_numberify() {
        let e = geq(Expr::var("17"), Expr::var("x"));
        assert_eq!(numberify(&e), geq(Expr::int(17), Expr::var("x")));
        // negative renderings parse too
        assert_eq!(numberify(&Expr::var("-3")), Expr::int(-3));
        // non-numeric names survive
        assert_eq!(numberify(&Expr::var("x1")), Expr::var("x1"));
    }

    #[test]
    fn test_attach_preserves_skeleton() {
        use crate::unroll::InterpQuery;
        let tree = InterpQuery::And {
            info: None,
            expr: Expr::var("root"),
            children: vec![
                InterpQuery::And {
                    info: None,
                    expr: Expr::var("a"),
                    children: vec![InterpQuery::And {
                        info: None,
                        expr: Expr::var("b"),
                        children: vec![],
                    }],
                },
                InterpQuery::And {
                    info: None,
                    expr: Expr::var("c"),
                    children: vec![],
                },
            ],
        };
        let interps = [Expr::var("i0"), Expr::var("i1"), Expr::var("i2")];
        let ti = attach_interps(&tree, &interps);
        assert_eq!(ti.interp, Expr::Literal(false));
        // pre-order: first child, its child, then the second child
        assert_eq!(ti.children[0].interp, Expr::var("i0"));
        assert_eq!(ti.children[0].children[0].interp, Expr::var("i1"));
        assert_eq!(ti.children[1].interp, Expr::var("i2"));
    }
}
