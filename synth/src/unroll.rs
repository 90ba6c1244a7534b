// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Finite-depth unrolling of the clause graph into a disjunctive
//! interpolation query.
//!
//! Unrolling maintains a per-k-variable depth budget. A k-variable occurrence
//! with remaining budget expands with all of its rules and a decremented
//! budget; one with an exhausted budget expands with the non-recursive rules
//! only, so every path terminates.

use std::collections::BTreeMap;

use horn::clauses::{KClauses, KVarOcc, Query, Rule};
use logic::subst::{rename, substitute, Renaming};
use logic::syntax::{split_suffix, suffixed, Expr, KVar, Sort, Subst, Symbol, VV};

/// The seed symbol for fresh substitution symbols.
const SUB_SEED: &str = "SUB";

/// Identifies the k-variable occurrence a query-tree node was generated from:
/// the k-variable and the symbol its implicit *vv* argument was bound to.
/// Solution extraction keys on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccInfo {
    /// The unrolled k-variable
    pub kvar: KVar,
    /// The symbol standing for the occurrence's value
    pub sym: Symbol,
}

/// An And/Or query tree. And-nodes denote tree-interpolation cut points;
/// Or-nodes denote disjunctive alternatives for a single k-variable
/// occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpQuery {
    /// A conjunction node: its expression holds conjoined with all children
    #[allow(missing_docs)]
    And {
        info: Option<OccInfo>,
        expr: Expr,
        children: Vec<InterpQuery>,
    },
    /// Alternative expansions for one k-variable occurrence
    #[allow(missing_docs)]
    Or {
        info: Option<OccInfo>,
        children: Vec<InterpQuery>,
    },
}

/// Bookkeeping that accumulates across one unrolling.
#[derive(Debug, Clone, Default)]
pub struct UnrollState {
    /// Fresh symbols generated during unrolling, with the sorts they must be
    /// declared at
    pub created: BTreeMap<Symbol, Sort>,
    /// Next rename suffix for each base symbol
    counters: BTreeMap<Symbol, usize>,
    /// For every fresh symbol, the original symbol it stands in for
    /// (transitively collapsed)
    pub subs: BTreeMap<Symbol, Symbol>,
}

impl UnrollState {
    /// Create a state whose rename counters are seeded above any suffix
    /// already present among `existing` symbols, so fresh names never collide
    /// with pre-suffixed input.
    pub fn new<'a, I: IntoIterator<Item = &'a Symbol>>(existing: I) -> Self {
        let mut state = Self::default();
        for sym in existing {
            if let Some((base, n)) = split_suffix(sym) {
                let counter = state.counters.entry(base.to_string()).or_insert(0);
                *counter = (*counter).max(n + 1);
            }
        }
        state
    }

    /// Allocate a fresh symbol derived from `base`, declared at `sort`.
    fn fresh(&mut self, base: &str, sort: Sort) -> Symbol {
        let counter = self.counters.entry(base.to_string()).or_insert(0);
        let sym = suffixed(base, *counter);
        *counter += 1;
        self.created.insert(sym.clone(), sort);
        sym
    }

    /// Record what original symbol `fresh` stands in for, collapsing through
    /// `stands_for` when it is itself fresh.
    fn record_original(&mut self, fresh: &Symbol, stands_for: &str) {
        let orig = self.original(stands_for);
        self.subs.insert(fresh.clone(), orig);
    }

    /// The original symbol a (possibly fresh) symbol stands in for.
    pub fn original(&self, sym: &str) -> Symbol {
        self.subs.get(sym).cloned().unwrap_or_else(|| sym.to_string())
    }
}

/// The unroller: owns the sort environment and grows an [`UnrollState`].
struct Unroller<'a> {
    sym_sorts: &'a BTreeMap<Symbol, Sort>,
    state: UnrollState,
}

impl<'a> Unroller<'a> {
    fn sort_of(&self, sym: &str) -> Sort {
        match self.sym_sorts.get(sym) {
            Some(sort) => sort.clone(),
            None => {
                log::debug!("no sort recorded for {sym}, defaulting to Int");
                Sort::Int
            }
        }
    }

    /// Expand one k-variable occurrence into an Or-node over its rules.
    /// Returns the equality atoms that materialize the occurrence's
    /// substitution; they belong in the caller's conjunction.
    fn unroll_occ(
        &mut self,
        occ: &KVarOcc,
        dmap: &BTreeMap<KVar, usize>,
        view: &KClauses,
    ) -> (Vec<Expr>, InterpQuery) {
        let info = Some(OccInfo {
            kvar: occ.kvar.clone(),
            sym: occ.sym.clone(),
        });

        // materialize the substitution: a fresh symbol and an equality atom
        // per binding, with the formal renamed to the fresh symbol in the
        // rules we are about to expand
        let mut atoms = vec![];
        let mut renaming = Renaming::new();
        for (formal, image) in &occ.subst {
            let sort = self.sort_of(formal);
            let t = self.state.fresh(SUB_SEED, sort);
            atoms.push(Expr::equals(Expr::var(&t), image.clone()));
            self.state.record_original(&t, formal);
            renaming.insert(formal.clone(), t.clone());
        }
        let view = if renaming.is_empty() {
            view.clone()
        } else {
            view.rename(&renaming)
        };

        let Some((recursive, base)) = view.rules_for(&occ.kvar) else {
            // unknown k-variable: no expansion paths
            return (atoms, InterpQuery::Or {
                info,
                children: vec![],
            });
        };

        let budget = dmap.get(&occ.kvar).copied().unwrap_or(0);
        let mut dmap = dmap.clone();
        let rules: Vec<_> = if budget > 0 {
            dmap.insert(occ.kvar.clone(), budget - 1);
            recursive.iter().chain(base.iter()).cloned().collect()
        } else {
            base.to_vec()
        };

        let children = rules
            .iter()
            .map(|rule| self.unroll_rule(&occ.sym, rule, &dmap, &view))
            .collect();
        (atoms, InterpQuery::Or { info, children })
    }

    /// Expand one rule for the occurrence bound to `caller_sym` into an
    /// And-node.
    fn unroll_rule(
        &mut self,
        caller_sym: &Symbol,
        rule: &Rule,
        dmap: &BTreeMap<KVar, usize>,
        view: &KClauses,
    ) -> InterpQuery {
        // move the rule's own uses of caller_sym out of the way before the
        // caller's value flows in as vv
        let fresh = self.state.fresh(caller_sym, self.sort_of(caller_sym));
        self.state.record_original(&fresh, caller_sym);
        let mut renaming = Renaming::new();
        renaming.insert(caller_sym.clone(), fresh);
        let rule = rule.rename(&renaming);
        let view = view.rename(&renaming);

        let mut vv_sub = Subst::new();
        vv_sub.insert(VV.to_string(), Expr::var(caller_sym));
        let body = substitute(&rule.body, &vv_sub);

        let mut exprs = vec![body];
        let mut children = vec![];
        for child in &rule.children {
            let occ = KVarOcc {
                kvar: child.kvar.clone(),
                subst: child
                    .subst
                    .iter()
                    .map(|(k, e)| (k.clone(), substitute(e, &vv_sub)))
                    .collect(),
                sym: if child.sym == VV {
                    caller_sym.clone()
                } else {
                    child.sym.clone()
                },
            };
            let (atoms, node) = self.unroll_occ(&occ, dmap, &view);
            exprs.extend(atoms);
            children.push(node);
        }

        InterpQuery::And {
            info: None,
            expr: Expr::and(exprs),
            children,
        }
    }
}

/// Unroll a query to the given depth. The root And-node conjoins the negated
/// goal with the query body; every k-variable occurrence becomes an Or-node
/// over its rule expansions.
pub fn unroll(
    query: &Query,
    depth: usize,
    kclauses: &KClauses,
    sym_sorts: &BTreeMap<Symbol, Sort>,
) -> (InterpQuery, UnrollState) {
    // seed rename counters from everything in scope
    let mut existing: Vec<Symbol> = sym_sorts.keys().cloned().collect();
    existing.extend(query.body.free_symbols());
    existing.extend(query.head.free_symbols());
    let mut unroller = Unroller {
        sym_sorts,
        state: UnrollState::new(existing.iter()),
    };

    // the query's own value variable becomes a fresh symbol
    let v = unroller.state.fresh(VV, Sort::Int);
    unroller.state.record_original(&v, VV);
    let mut renaming = Renaming::new();
    renaming.insert(VV.to_string(), v.clone());
    let body = rename(&query.body, &renaming);
    let head = rename(&query.head, &renaming);

    let dmap: BTreeMap<KVar, usize> = kclauses.kvars().map(|k| (k.clone(), depth)).collect();

    let mut exprs = vec![Expr::negate(head), body];
    let mut children = vec![];
    for child in &query.children {
        let occ = KVarOcc {
            kvar: child.kvar.clone(),
            subst: child
                .subst
                .iter()
                .map(|(k, e)| (k.clone(), rename(e, &renaming)))
                .collect(),
            sym: if child.sym == VV {
                v.clone()
            } else {
                child.sym.clone()
            },
        };
        let (atoms, node) = unroller.unroll_occ(&occ, &dmap, kclauses);
        exprs.extend(atoms);
        children.push(node);
    }

    let root = InterpQuery::And {
        info: None,
        expr: Expr::and(exprs),
        children,
    };
    log::debug!(
        "unrolled query {} at depth {depth}: {} fresh symbols",
        query.id,
        unroller.state.created.len()
    );
    (root, unroller.state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use horn::clauses::Rule;
    use logic::syntax::NumRel;

    fn leq(a: Expr, b: Expr) -> Expr {
        Expr::NumRel(NumRel::Leq, Box::new(a), Box::new(b))
    }

    fn gt(a: Expr, b: Expr) -> Expr {
        Expr::NumRel(NumRel::Gt, Box::new(a), Box::new(b))
    }

    /// The sum system: `k <= 0 & VV = 0 => K` and
    /// `k > 0 & K(s)[k := k-1] & VV = s + k => K`.
    fn sum_clauses() -> KClauses {
        let k = KVar::new("k0");
        let base = Rule {
            body: Expr::and([
                leq(Expr::var("k"), Expr::int(0)),
                Expr::equals(Expr::var(VV), Expr::int(0)),
            ]),
            children: vec![],
            head: k.clone(),
        };
        let mut sigma = Subst::new();
        sigma.insert(
            "k".to_string(),
            Expr::NumOp(
                logic::syntax::NumOp::Sub,
                Box::new(Expr::var("k")),
                Box::new(Expr::int(1)),
            ),
        );
        let step = Rule {
            body: Expr::and([
                gt(Expr::var("k"), Expr::int(0)),
                Expr::equals(
                    Expr::var(VV),
                    Expr::NumOp(
                        logic::syntax::NumOp::Add,
                        Box::new(Expr::var("s")),
                        Box::new(Expr::var("k")),
                    ),
                ),
            ]),
            children: vec![KVarOcc {
                kvar: k.clone(),
                subst: sigma,
                sym: "s".to_string(),
            }],
            head: k,
        };
        KClauses::new(vec![base, step])
    }

    fn sum_query() -> Query {
        Query {
            id: 0,
            body: Expr::Literal(true),
            children: vec![KVarOcc {
                kvar: KVar::new("k0"),
                subst: Subst::new(),
                sym: VV.to_string(),
            }],
            head: leq(Expr::var("k"), Expr::var(VV)),
        }
    }

    fn sum_sorts() -> BTreeMap<Symbol, Sort> {
        [("k", Sort::Int), ("s", Sort::Int)]
            .into_iter()
            .map(|(s, sort)| (s.to_string(), sort))
            .collect()
    }

    /// Depth of nested k-variable occurrence layers along the deepest path.
    fn occ_layers(q: &InterpQuery) -> usize {
        match q {
            InterpQuery::And { children, .. } => {
                children.iter().map(occ_layers).max().unwrap_or(0)
            }
            InterpQuery::Or { children, .. } => {
                1 + children.iter().map(occ_layers).max().unwrap_or(0)
            }
        }
    }

    #[test]
    fn test_unroll_depth_zero_uses_base_rules_only() {
        let (tree, _) = unroll(&sum_query(), 0, &sum_clauses(), &sum_sorts());
        let InterpQuery::And { children, .. } = &tree else {
            panic!("root should be an And");
        };
        let [InterpQuery::Or { info, children: alts }] = children.as_slice() else {
            panic!("root should have a single Or child");
        };
        assert_eq!(info.as_ref().unwrap().kvar, KVar::new("k0"));
        assert_eq!(info.as_ref().unwrap().sym, "VV!0");
        // only the base rule, which has no further occurrences
        assert_eq!(alts.len(), 1);
        assert!(matches!(
            &alts[0],
            InterpQuery::And { children, .. } if children.is_empty()
        ));
    }

    #[test]
    fn test_unroll_budget_honored() {
        let (tree, _) = unroll(&sum_query(), 1, &sum_clauses(), &sum_sorts());
        // outer occurrence + one recursive expansion
        assert_eq!(occ_layers(&tree), 2);
    }

    #[test]
    fn test_unroll_depth_two_layers() {
        let (tree, _) = unroll(&sum_query(), 2, &sum_clauses(), &sum_sorts());
        assert_eq!(occ_layers(&tree), 3);
    }

    #[test]
    fn test_unknown_kvar_yields_empty_or() {
        let query = Query {
            id: 0,
            body: Expr::Literal(true),
            children: vec![KVarOcc {
                kvar: KVar::new("mystery"),
                subst: Subst::new(),
                sym: VV.to_string(),
            }],
            head: Expr::Literal(false),
        };
        let (tree, _) = unroll(&query, 2, &KClauses::default(), &BTreeMap::new());
        let InterpQuery::And { children, .. } = &tree else {
            panic!("root should be an And");
        };
        assert_eq!(
            children,
            &vec![InterpQuery::Or {
                info: Some(OccInfo {
                    kvar: KVar::new("mystery"),
                    sym: "VV!0".to_string(),
                }),
                children: vec![],
            }]
        );
    }

    #[test]
    fn test_fresh_symbols_map_to_originals() {
        let (_, state) = unroll(&sum_query(), 2, &sum_clauses(), &sum_sorts());
        for (fresh, _) in &state.created {
            let orig = &state.subs[fresh];
            // originals are input symbols or VV, never fresh themselves
            assert!(
                !state.created.contains_key(orig),
                "{fresh} maps to fresh symbol {orig}"
            );
        }
        // the query's value variable is recorded under VV
        assert_eq!(state.subs["VV!0"], VV);
    }

    #[test]
    fn test_counter_seeding_skips_existing_suffixes() {
        let mut sorts = sum_sorts();
        sorts.insert("VV!7".to_string(), Sort::Int);
        let (_, state) = unroll(&sum_query(), 1, &sum_clauses(), &sorts);
        assert!(!state.created.contains_key("VV!7"));
        assert_eq!(state.subs["VV!8"], VV);
    }

    #[test]
    fn test_substitution_atoms_use_fresh_symbols() {
        let (tree, state) = unroll(&sum_query(), 1, &sum_clauses(), &sum_sorts());
        // the recursive expansion materializes [k := k - 1] as SUB!0 = k - 1
        assert!(state.created.contains_key("SUB!0"));
        assert_eq!(state.subs["SUB!0"], "k");
        // find the atom in some And body
        fn mentions_sub(q: &InterpQuery) -> bool {
            match q {
                InterpQuery::And { expr, children, .. } => {
                    expr.free_symbols().contains("SUB!0")
                        || children.iter().any(mentions_sub)
                }
                InterpQuery::Or { children, .. } => children.iter().any(mentions_sub),
            }
        }
        assert!(mentions_sub(&tree));
    }
}
