// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Or-expansion: a disjunctive interpolation query denotes a finite set of
//! tree interpolation queries, one per choice of alternative at each Or-node.

use itertools::Itertools;

use crate::unroll::InterpQuery;

/// Enumerate the tree interpolation queries implicit in a disjunctive query.
///
/// The result contains no Or-nodes: each And-node's children are one choice of
/// alternative per original Or-child, and the chosen And-nodes inherit the
/// Or-node's occurrence info. The order of alternatives determines the order
/// of emitted queries, left to right.
///
/// A k-variable with no rules contributes an empty Or, which has no
/// alternatives to choose from; any query containing one expands to nothing.
pub fn expand(query: &InterpQuery) -> Vec<InterpQuery> {
    match query {
        InterpQuery::And {
            info,
            expr,
            children,
        } => {
            if children.is_empty() {
                return vec![InterpQuery::And {
                    info: info.clone(),
                    expr: expr.clone(),
                    children: vec![],
                }];
            }
            let alternatives: Vec<Vec<InterpQuery>> = children.iter().map(expand).collect();
            if alternatives.iter().any(|a| a.is_empty()) {
                return vec![];
            }
            alternatives
                .into_iter()
                .multi_cartesian_product()
                .map(|combo| InterpQuery::And {
                    info: info.clone(),
                    expr: expr.clone(),
                    children: combo,
                })
                .collect()
        }
        InterpQuery::Or { info, children } => children
            .iter()
            .flat_map(expand)
            .map(|alt| match alt {
                // the chosen And stands for this occurrence now
                InterpQuery::And {
                    expr, children, ..
                } => InterpQuery::And {
                    info: info.clone(),
                    expr,
                    children,
                },
                InterpQuery::Or { .. } => unreachable!("expansion produces only And nodes"),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unroll::OccInfo;
    use logic::syntax::{Expr, KVar};

    fn and(expr: Expr, children: Vec<InterpQuery>) -> InterpQuery {
        InterpQuery::And {
            info: None,
            expr,
            children,
        }
    }

    fn or(name: &str, children: Vec<InterpQuery>) -> InterpQuery {
        InterpQuery::Or {
            info: Some(OccInfo {
                kvar: KVar::new(name),
                sym: "x".to_string(),
            }),
            children,
        }
    }

    #[test]
    fn test_expand_no_or_is_identity() {
        let q = and(Expr::var("a"), vec![and(Expr::var("b"), vec![])]);
        assert_eq!(expand(&q), vec![q.clone()]);
    }

    #[test]
    fn test_expand_distributes_alternatives() {
        // And(root, [Or_k[b1, b2], Or_j[c1]]) => two tree queries
        let q = and(
            Expr::var("root"),
            vec![
                or(
                    "k",
                    vec![and(Expr::var("b1"), vec![]), and(Expr::var("b2"), vec![])],
                ),
                or("j", vec![and(Expr::var("c1"), vec![])]),
            ],
        );
        let expanded = expand(&q);
        assert_eq!(expanded.len(), 2);
        // each expansion chose one alternative per Or, tagged with its info
        for (tree, picked) in expanded.iter().zip(["b1", "b2"]) {
            let InterpQuery::And { children, .. } = tree else {
                panic!("expected And root")
            };
            assert_eq!(children.len(), 2);
            let InterpQuery::And { info, expr, .. } = &children[0] else {
                panic!("expected And child")
            };
            assert_eq!(info.as_ref().unwrap().kvar, KVar::new("k"));
            assert_eq!(expr, &Expr::var(picked));
        }
    }

    #[test]
    fn test_expand_empty_or_kills_combinations() {
        let q = and(
            Expr::var("root"),
            vec![or("k", vec![]), or("j", vec![and(Expr::var("c"), vec![])])],
        );
        assert_eq!(expand(&q), vec![]);
    }

    #[test]
    fn test_expand_counts_products() {
        // each outer alternative multiplies with its own inner alternatives:
        // 2 inner choices under b1 plus 2 under b2 makes 4 tree queries
        let inner = or(
            "j",
            vec![and(Expr::var("c1"), vec![]), and(Expr::var("c2"), vec![])],
        );
        let q = and(
            Expr::var("root"),
            vec![or(
                "k",
                vec![
                    and(Expr::var("b1"), vec![inner.clone()]),
                    and(Expr::var("b2"), vec![inner]),
                ],
            )],
        );
        assert_eq!(expand(&q).len(), 4);
    }
}
