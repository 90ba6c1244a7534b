// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Normalization of subtyping constraints into Horn *rules* (head is a
//! k-variable) and *queries* (head is a concrete predicate), and the
//! per-k-variable rule map with its recursive/non-recursive split.

use std::collections::BTreeMap;
use std::fmt;

use itertools::Itertools;
use logic::subst::{rename, substitute, Renaming};
use logic::syntax::{Expr, KVar, NOp, Sort, Subst, Symbol, VV};
use petgraph::algo::has_path_connecting;
use petgraph::graph::NodeIndex;
use petgraph::Graph;
use thiserror::Error;

use crate::finfo::FInfo;

/// An error in the input constraint record. These indicate caller bugs and
/// abort the pipeline.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    /// A constraint's environment references a binder id with no entry.
    #[error("constraint {constraint}: bind {bind} is not in the bind environment")]
    DanglingBind {
        /// The offending constraint id
        constraint: u32,
        /// The dangling bind id
        bind: u32,
    },
    /// A k-variable application appeared below a non-conjunctive connective.
    #[error("constraint {constraint}: k-variable application nested in an atom of binder {sym}")]
    NestedKVar {
        /// The offending constraint id
        constraint: u32,
        /// The binder whose refinement contains the nested application
        sym: Symbol,
    },
    /// A constraint's RHS conjoins a k-variable with other predicates, so it
    /// is neither a rule nor a query.
    #[error("constraint {constraint}: right-hand side mixes a k-variable with other conjuncts")]
    MixedRhs {
        /// The offending constraint id
        constraint: u32,
    },
    /// A k-variable is applied but has no well-formedness entry (and thus no
    /// parameter sort).
    #[error("k-variable {0} has no well-formedness entry")]
    UnboundKVar(KVar),
}

/// An occurrence `K[σ]` in a clause body, tagged with the symbol its implicit
/// *vv* argument was bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KVarOcc {
    /// The applied k-variable
    pub kvar: KVar,
    /// The substitution it is applied to
    pub subst: Subst,
    /// The binder the occurrence describes
    pub sym: Symbol,
}

impl KVarOcc {
    fn rename(&self, renaming: &Renaming) -> Self {
        let ren =
            |s: &Symbol| -> Symbol { renaming.get(s).cloned().unwrap_or_else(|| s.clone()) };
        Self {
            kvar: self.kvar.clone(),
            subst: self
                .subst
                .iter()
                .map(|(key, e)| (ren(key), rename(e, renaming)))
                .collect(),
            sym: ren(&self.sym),
        }
    }
}

impl fmt::Display for KVarOcc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            logic::printer::expr(&Expr::KVar(self.kvar.clone(), self.subst.clone())),
            self.sym,
        )
    }
}

/// A Horn clause whose conclusion is a k-variable application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Conjunction of k-variable-free predicates
    pub body: Expr,
    /// The k-variable occurrences of the clause body
    pub children: Vec<KVarOcc>,
    /// The concluded k-variable
    pub head: KVar,
}

impl Rule {
    /// Apply a symbol renaming to the whole clause.
    pub fn rename(&self, renaming: &Renaming) -> Self {
        Self {
            body: rename(&self.body, renaming),
            children: self.children.iter().map(|c| c.rename(renaming)).collect(),
            head: self.head.clone(),
        }
    }
}

/// A Horn clause whose conclusion is a concrete predicate, to be refuted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// The originating constraint id
    pub id: u32,
    /// Conjunction of k-variable-free predicates
    pub body: Expr,
    /// The k-variable occurrences of the clause body
    pub children: Vec<KVarOcc>,
    /// The concluded (k-variable-free) goal predicate
    pub head: Expr,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} & {} => {}",
            logic::printer::expr(&self.body),
            self.children.iter().map(|c| format!("{c}")).join(" & "),
            self.head
        )
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} & {} => {}",
            logic::printer::expr(&self.body),
            self.children.iter().map(|c| format!("{c}")).join(" & "),
            logic::printer::expr(&self.head)
        )
    }
}

/// The rules for each k-variable, split into recursive and non-recursive.
///
/// A rule with head K is recursive iff K is reachable in the rule-call graph
/// from one of the rule's children's k-variables.
#[derive(Debug, Clone, Default)]
pub struct KClauses(BTreeMap<KVar, (Vec<Rule>, Vec<Rule>)>);

impl KClauses {
    /// Classify and group the given rules by their head k-variable.
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut graph: Graph<KVar, ()> = Graph::new();
        let mut nodes: BTreeMap<KVar, NodeIndex> = BTreeMap::new();
        let mut node = |g: &mut Graph<KVar, ()>, k: &KVar| -> NodeIndex {
            *nodes
                .entry(k.clone())
                .or_insert_with(|| g.add_node(k.clone()))
        };
        for rule in &rules {
            let head = node(&mut graph, &rule.head);
            for child in &rule.children {
                let child = node(&mut graph, &child.kvar);
                graph.add_edge(head, child, ());
            }
        }

        let mut map: BTreeMap<KVar, (Vec<Rule>, Vec<Rule>)> = BTreeMap::new();
        for rule in rules {
            let head = nodes[&rule.head];
            let recursive = rule
                .children
                .iter()
                .any(|c| has_path_connecting(&graph, nodes[&c.kvar], head, None));
            let entry = map.entry(rule.head.clone()).or_default();
            if recursive {
                entry.0.push(rule);
            } else {
                entry.1.push(rule);
            }
        }
        Self(map)
    }

    /// The (recursive, non-recursive) rules for `k`, or None if `k` is
    /// unknown.
    pub fn rules_for(&self, k: &KVar) -> Option<(&[Rule], &[Rule])> {
        self.0.get(k).map(|(r, n)| (r.as_slice(), n.as_slice()))
    }

    /// The k-variables that have at least one rule.
    pub fn kvars(&self) -> impl Iterator<Item = &KVar> {
        self.0.keys()
    }

    /// Apply a symbol renaming to every rule. The unroller uses this to keep
    /// its working view of the clauses capture-free after generating a fresh
    /// symbol.
    pub fn rename(&self, renaming: &Renaming) -> Self {
        Self(
            self.0
                .iter()
                .map(|(k, (rec, nonrec))| {
                    (
                        k.clone(),
                        (
                            rec.iter().map(|r| r.rename(renaming)).collect(),
                            nonrec.iter().map(|r| r.rename(renaming)).collect(),
                        ),
                    )
                })
                .collect(),
        )
    }
}

/// The result of clause normalization.
#[derive(Debug, Clone)]
pub struct HornSystem {
    /// The queries (assertions to refute), in constraint-id order
    pub queries: Vec<Query>,
    /// The rules, grouped per k-variable
    pub kclauses: KClauses,
    /// Sorts of binders and literals
    pub sym_sorts: BTreeMap<Symbol, Sort>,
    /// Each k-variable's parameter sort, from the well-formedness constraints
    pub kvar_sorts: BTreeMap<KVar, Sort>,
}

fn single(key: &str, value: Expr) -> Subst {
    let mut s = Subst::new();
    s.insert(key.to_string(), value);
    s
}

/// Flatten nested conjunctions into their conjuncts.
fn conjuncts(e: &Expr) -> Vec<Expr> {
    match e {
        Expr::NAryOp(NOp::And, es) => es.iter().flat_map(conjuncts).collect(),
        _ => vec![e.clone()],
    }
}

/// Remove `[x := binder]` substitution pairs from every k-variable
/// application inside `e`. These pairs are artefacts of the upstream encoding
/// (the binder restating itself) and would otherwise make the unroller emit
/// spurious equality atoms. No other substitution pair is altered.
pub fn scrub_subst_artifacts(e: &Expr, binder: &str) -> Expr {
    match e {
        Expr::Literal(_) | Expr::Constant(_) | Expr::Var(_) => e.clone(),
        Expr::UnaryOp(op, e) => {
            Expr::UnaryOp(*op, Box::new(scrub_subst_artifacts(e, binder)))
        }
        Expr::BinOp(op, a, b) => Expr::BinOp(
            *op,
            Box::new(scrub_subst_artifacts(a, binder)),
            Box::new(scrub_subst_artifacts(b, binder)),
        ),
        Expr::NAryOp(op, es) => Expr::NAryOp(
            *op,
            es.iter().map(|e| scrub_subst_artifacts(e, binder)).collect(),
        ),
        Expr::NumOp(op, a, b) => Expr::NumOp(
            *op,
            Box::new(scrub_subst_artifacts(a, binder)),
            Box::new(scrub_subst_artifacts(b, binder)),
        ),
        Expr::NumRel(rel, a, b) => Expr::NumRel(
            *rel,
            Box::new(scrub_subst_artifacts(a, binder)),
            Box::new(scrub_subst_artifacts(b, binder)),
        ),
        Expr::Ite { cond, then, else_ } => Expr::Ite {
            cond: Box::new(scrub_subst_artifacts(cond, binder)),
            then: Box::new(scrub_subst_artifacts(then, binder)),
            else_: Box::new(scrub_subst_artifacts(else_, binder)),
        },
        Expr::App(f, es) => Expr::App(
            f.clone(),
            es.iter().map(|e| scrub_subst_artifacts(e, binder)).collect(),
        ),
        Expr::KVar(k, sigma) => Expr::KVar(
            k.clone(),
            sigma
                .iter()
                .filter(|(_, v)| !matches!(v, Expr::Var(s) if s == binder))
                .map(|(key, v)| (key.clone(), scrub_subst_artifacts(v, binder)))
                .collect(),
        ),
        Expr::Exists { binders, body } => Expr::Exists {
            binders: binders.clone(),
            body: Box::new(scrub_subst_artifacts(body, binder)),
        },
        Expr::Interp(e) => Expr::Interp(Box::new(scrub_subst_artifacts(e, binder))),
    }
}

/// Normalize the constraint record into queries and per-k-variable rules.
pub fn normalize(fi: &FInfo) -> Result<HornSystem, NormalizeError> {
    for k in &fi.kvars {
        if !fi.wf.contains_key(k) {
            return Err(NormalizeError::UnboundKVar(k.clone()));
        }
    }

    let mut rules = vec![];
    let mut queries = vec![];

    for (&cid, c) in &fi.constraints {
        let lhs_expr = substitute(&c.lhs.refinement, &single(&c.lhs.vv, Expr::var(VV)));
        let rhs_expr = substitute(&c.rhs.refinement, &single(&c.rhs.vv, Expr::var(VV)));

        // the refinement of each bound variable, stated about its binder
        let mut tagged: Vec<(Symbol, Expr)> = vec![];
        for &bid in &c.env {
            let (sym, reft) = fi
                .binds
                .get(&bid)
                .ok_or(NormalizeError::DanglingBind {
                    constraint: cid,
                    bind: bid,
                })?;
            let e = substitute(&reft.refinement, &single(&reft.vv, Expr::var(sym)));
            tagged.push((sym.clone(), e));
        }
        tagged.push((VV.to_string(), lhs_expr));

        let mut body_atoms = vec![];
        let mut children = vec![];
        for (sym, e) in &tagged {
            let e = scrub_subst_artifacts(e, sym);
            for conjunct in conjuncts(&e) {
                match conjunct {
                    Expr::Literal(true) => (),
                    Expr::KVar(kvar, subst) => {
                        if !fi.wf.contains_key(&kvar) {
                            return Err(NormalizeError::UnboundKVar(kvar));
                        }
                        children.push(KVarOcc {
                            kvar,
                            subst,
                            sym: sym.clone(),
                        });
                    }
                    other if other.has_kvars() => {
                        return Err(NormalizeError::NestedKVar {
                            constraint: cid,
                            sym: sym.clone(),
                        })
                    }
                    other => body_atoms.push(other),
                }
            }
        }
        let body = Expr::and(body_atoms);

        match scrub_subst_artifacts(&rhs_expr, VV) {
            Expr::KVar(head, sigma) => {
                if !fi.wf.contains_key(&head) {
                    return Err(NormalizeError::UnboundKVar(head));
                }
                if !sigma.is_empty() {
                    log::debug!(
                        "constraint {cid}: dropping substitution on head {head}, the head argument is implicit"
                    );
                }
                rules.push(Rule {
                    body,
                    children,
                    head,
                });
            }
            e if e.has_kvars() => {
                return Err(NormalizeError::MixedRhs { constraint: cid });
            }
            e => queries.push(Query {
                id: cid,
                body,
                children,
                head: e,
            }),
        }
    }

    let mut sym_sorts: BTreeMap<Symbol, Sort> = BTreeMap::new();
    for (sym, reft) in fi.binds.values() {
        sym_sorts.insert(sym.clone(), reft.sort.clone());
    }
    for (sym, sort) in &fi.lits {
        sym_sorts.insert(sym.clone(), sort.clone());
    }

    let kclauses = KClauses::new(rules);
    log::debug!(
        "normalized {} constraints into {} queries and rules for {} k-variables",
        fi.constraints.len(),
        queries.len(),
        kclauses.0.len(),
    );

    Ok(HornSystem {
        queries,
        kclauses,
        sym_sorts,
        kvar_sorts: fi.wf.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finfo::{FInfo, SortedReft, SubC};
    use logic::syntax::NumRel;

    fn leq(a: Expr, b: Expr) -> Expr {
        Expr::NumRel(NumRel::Leq, Box::new(a), Box::new(b))
    }

    fn reft(vv: &str, e: Expr) -> SortedReft {
        SortedReft {
            vv: vv.to_string(),
            sort: Sort::Int,
            refinement: e,
        }
    }

    fn kvar_app(k: &str, subst: &[(&str, Expr)]) -> Expr {
        Expr::KVar(
            KVar::new(k),
            subst
                .iter()
                .map(|(s, e)| (s.to_string(), e.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_scrub_removes_only_binder_artifacts() {
        let e = Expr::and([
            kvar_app("k0", &[("x", Expr::var("b")), ("y", Expr::var("z"))]),
            leq(Expr::var("b"), Expr::int(0)),
        ]);
        let scrubbed = scrub_subst_artifacts(&e, "b");
        assert_eq!(
            scrubbed,
            Expr::and([
                kvar_app("k0", &[("y", Expr::var("z"))]),
                leq(Expr::var("b"), Expr::int(0)),
            ])
        );
        // a substitution not mentioning the binder is untouched
        let other = kvar_app("k0", &[("x", Expr::var("w"))]);
        assert_eq!(scrub_subst_artifacts(&other, "b"), other);
    }

    /// Two rules and a query for a single k-variable; the recursive rule calls
    /// back into its own head.
    fn sum_finfo() -> FInfo {
        let k = KVar::new("k0");
        let mut fi = FInfo::default();
        fi.wf.insert(k.clone(), Sort::Int);
        fi.kvars.push(k);
        fi.binds.insert(
            0,
            ("k".to_string(), reft("v", Expr::Literal(true))),
        );
        fi.binds.insert(
            1,
            ("s".to_string(), reft("v", kvar_app("k0", &[]))),
        );

        // base: k <= 0 & v = 0 => K(v)
        fi.constraints.insert(
            1,
            SubC {
                env: vec![0],
                lhs: reft(
                    "v",
                    Expr::and([
                        leq(Expr::var("k"), Expr::int(0)),
                        Expr::equals(Expr::var("v"), Expr::int(0)),
                    ]),
                ),
                rhs: reft("v", kvar_app("k0", &[])),
            },
        );
        // inductive: k > 0 & K(s)[k := k-1] & v = s + k => K(v)
        fi.constraints.insert(
            2,
            SubC {
                env: vec![0, 1],
                lhs: reft(
                    "v",
                    Expr::and([
                        Expr::NumRel(
                            NumRel::Gt,
                            Box::new(Expr::var("k")),
                            Box::new(Expr::int(0)),
                        ),
                        Expr::equals(
                            Expr::var("v"),
                            Expr::NumOp(
                                logic::syntax::NumOp::Add,
                                Box::new(Expr::var("s")),
                                Box::new(Expr::var("k")),
                            ),
                        ),
                    ]),
                ),
                rhs: reft("v", kvar_app("k0", &[])),
            },
        );
        // query: K(v) => v >= k
        fi.constraints.insert(
            3,
            SubC {
                env: vec![0],
                lhs: reft("v", kvar_app("k0", &[])),
                rhs: reft("v", leq(Expr::var("k"), Expr::var("v"))),
            },
        );
        fi
    }

    #[test]
    fn test_normalize_sum() {
        let sys = normalize(&sum_finfo()).unwrap();
        assert_eq!(sys.queries.len(), 1);
        let k = KVar::new("k0");
        let (rec, nonrec) = sys.kclauses.rules_for(&k).unwrap();
        // the rule whose environment contains s (refined by K itself) is the
        // recursive one
        assert_eq!(rec.len(), 1);
        assert_eq!(nonrec.len(), 1);
        assert_eq!(rec[0].children.len(), 1);
        assert_eq!(rec[0].children[0].sym, "s");
        assert!(nonrec[0].children.is_empty());

        let q = &sys.queries[0];
        assert_eq!(q.children.len(), 1);
        assert_eq!(q.children[0].sym, VV);
        assert_eq!(sys.kvar_sorts[&k], Sort::Int);
    }

    #[test]
    fn test_normalize_rejects_dangling_bind() {
        let mut fi = sum_finfo();
        fi.constraints.get_mut(&1).unwrap().env.push(99);
        assert_eq!(
            normalize(&fi).unwrap_err(),
            NormalizeError::DanglingBind {
                constraint: 1,
                bind: 99
            }
        );
    }

    #[test]
    fn test_normalize_rejects_unbound_kvar() {
        let mut fi = sum_finfo();
        fi.wf.clear();
        assert!(matches!(
            normalize(&fi).unwrap_err(),
            NormalizeError::UnboundKVar(_)
        ));
    }

    #[test]
    fn test_mixed_rhs_is_rejected() {
        let mut fi = sum_finfo();
        fi.constraints.get_mut(&1).unwrap().rhs = reft(
            "v",
            Expr::and([kvar_app("k0", &[]), leq(Expr::var("v"), Expr::int(0))]),
        );
        assert_eq!(
            normalize(&fi).unwrap_err(),
            NormalizeError::MixedRhs { constraint: 1 }
        );
    }
}
