// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Serialization of a query tree into a single formula with interpolation
//! cut markers.

use logic::syntax::Expr;

use crate::unroll::InterpQuery;

/// Emit the formula for a query tree. Every And-child is wrapped in an
/// [`Expr::Interp`] cut marker; Or-children become plain disjunctions. The
/// root itself is not marked (it is the implicit final partition).
pub fn query_formula(query: &InterpQuery) -> Expr {
    match query {
        InterpQuery::Or { children, .. } => Expr::or(children.iter().map(query_formula)),
        InterpQuery::And { expr, children, .. } => {
            let wrapped = children.iter().map(|c| match c {
                InterpQuery::And { .. } => Expr::Interp(Box::new(query_formula(c))),
                InterpQuery::Or { .. } => query_formula(c),
            });
            Expr::and(std::iter::once(expr.clone()).chain(wrapped))
        }
    }
}

/// Count the interpolation cut markers in a formula. This is how many
/// interpolants the solver must return for it.
///
/// Iterative, since expanded queries can nest past the point where recursion
/// is comfortable.
pub fn count_cuts(e: &Expr) -> usize {
    let mut count = 0;
    let mut stack = vec![e];
    while let Some(e) = stack.pop() {
        match e {
            Expr::Interp(inner) => {
                count += 1;
                stack.push(inner);
            }
            Expr::Literal(_) | Expr::Constant(_) | Expr::Var(_) => (),
            Expr::UnaryOp(_, a) => stack.push(a),
            Expr::BinOp(_, a, b) | Expr::NumOp(_, a, b) | Expr::NumRel(_, a, b) => {
                stack.push(a);
                stack.push(b);
            }
            Expr::NAryOp(_, es) | Expr::App(_, es) => stack.extend(es.iter()),
            Expr::Ite { cond, then, else_ } => {
                stack.push(cond);
                stack.push(then);
                stack.push(else_);
            }
            Expr::KVar(_, sigma) => stack.extend(sigma.values()),
            Expr::Exists { body, .. } => stack.push(body),
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unroll::{InterpQuery, OccInfo};
    use logic::syntax::KVar;

    fn and(expr: Expr, children: Vec<InterpQuery>) -> InterpQuery {
        InterpQuery::And {
            info: None,
            expr,
            children,
        }
    }

    #[test]
    fn test_formula_marks_and_children() {
        let q = and(
            Expr::var("root"),
            vec![and(Expr::var("a"), vec![and(Expr::var("b"), vec![])])],
        );
        let f = query_formula(&q);
        assert_eq!(
            f,
            Expr::and([
                Expr::var("root"),
                Expr::Interp(Box::new(Expr::and([
                    Expr::var("a"),
                    Expr::Interp(Box::new(Expr::var("b"))),
                ]))),
            ])
        );
        assert_eq!(count_cuts(&f), 2);
    }

    #[test]
    fn test_empty_or_serializes_to_false() {
        let q = and(
            Expr::var("root"),
            vec![InterpQuery::Or {
                info: Some(OccInfo {
                    kvar: KVar::new("mystery"),
                    sym: "VV!0".to_string(),
                }),
                children: vec![],
            }],
        );
        let f = query_formula(&q);
        assert_eq!(f, Expr::and([Expr::var("root"), Expr::Literal(false)]));
        assert_eq!(count_cuts(&f), 0);
    }

    #[test]
    fn test_or_children_are_unmarked() {
        let q = and(
            Expr::var("root"),
            vec![InterpQuery::Or {
                info: None,
                children: vec![and(Expr::var("a"), vec![]), and(Expr::var("b"), vec![])],
            }],
        );
        let f = query_formula(&q);
        // the disjuncts themselves carry no cut marker
        assert_eq!(
            f,
            Expr::and([
                Expr::var("root"),
                Expr::or([Expr::var("a"), Expr::var("b")]),
            ])
        );
        assert_eq!(count_cuts(&f), 0);
    }
}
