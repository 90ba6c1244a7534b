// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Substitution of variables by expressions, and wholesale symbol renaming.

use std::collections::BTreeMap;

use crate::syntax::{Binder, Expr, Subst, Symbol};

/// A mapping from symbols to replacement symbols, as produced by the
/// unroller's fresh-name generator. Targets are assumed fresh, so no capture
/// check is needed.
pub type Renaming = BTreeMap<Symbol, Symbol>;

/// Replace free occurrences of the keys of `subst` by their images.
/// Occurrences bound by an existential are left alone. Inside a k-variable
/// application the substitution maps over the values; the keys are formal
/// parameter names and are untouched.
pub fn substitute(expr: &Expr, subst: &Subst) -> Expr {
    substitute_rec(expr, subst, &im::HashSet::new())
}

fn substitute_rec(expr: &Expr, subst: &Subst, bound: &im::HashSet<Symbol>) -> Expr {
    match expr {
        Expr::Literal(_) | Expr::Constant(_) => expr.clone(),
        Expr::Var(s) => {
            if !bound.contains(s) && subst.contains_key(s) {
                subst[s].clone()
            } else {
                expr.clone()
            }
        }

        Expr::UnaryOp(op, e) => Expr::UnaryOp(*op, Box::new(substitute_rec(e, subst, bound))),

        Expr::BinOp(op, a, b) => Expr::BinOp(
            *op,
            Box::new(substitute_rec(a, subst, bound)),
            Box::new(substitute_rec(b, subst, bound)),
        ),

        Expr::NAryOp(op, es) => Expr::NAryOp(
            *op,
            es.iter().map(|e| substitute_rec(e, subst, bound)).collect(),
        ),

        Expr::NumOp(op, a, b) => Expr::NumOp(
            *op,
            Box::new(substitute_rec(a, subst, bound)),
            Box::new(substitute_rec(b, subst, bound)),
        ),

        Expr::NumRel(rel, a, b) => Expr::NumRel(
            *rel,
            Box::new(substitute_rec(a, subst, bound)),
            Box::new(substitute_rec(b, subst, bound)),
        ),

        Expr::Ite { cond, then, else_ } => Expr::Ite {
            cond: Box::new(substitute_rec(cond, subst, bound)),
            then: Box::new(substitute_rec(then, subst, bound)),
            else_: Box::new(substitute_rec(else_, subst, bound)),
        },

        Expr::App(f, es) => Expr::App(
            f.clone(),
            es.iter().map(|e| substitute_rec(e, subst, bound)).collect(),
        ),

        Expr::KVar(k, sigma) => Expr::KVar(
            k.clone(),
            sigma
                .iter()
                .map(|(key, e)| (key.clone(), substitute_rec(e, subst, bound)))
                .collect(),
        ),

        Expr::Exists { binders, body } => {
            let mut bound = bound.clone();
            bound.extend(binders.iter().map(|b| b.name.clone()));
            Expr::Exists {
                binders: binders.clone(),
                body: Box::new(substitute_rec(body, subst, &bound)),
            }
        }

        Expr::Interp(e) => Expr::Interp(Box::new(substitute_rec(e, subst, bound))),
    }
}

/// Rename symbols everywhere: variables, function heads, binder names, and
/// both the keys and the values of k-variable substitutions. The renamer's
/// targets are fresh symbols, so this is a total textual rename with no
/// capture concerns.
pub fn rename(expr: &Expr, renaming: &Renaming) -> Expr {
    let ren = |s: &Symbol| -> Symbol { renaming.get(s).cloned().unwrap_or_else(|| s.clone()) };
    match expr {
        Expr::Literal(_) | Expr::Constant(_) => expr.clone(),
        Expr::Var(s) => Expr::Var(ren(s)),

        Expr::UnaryOp(op, e) => Expr::UnaryOp(*op, Box::new(rename(e, renaming))),

        Expr::BinOp(op, a, b) => Expr::BinOp(
            *op,
            Box::new(rename(a, renaming)),
            Box::new(rename(b, renaming)),
        ),

        Expr::NAryOp(op, es) => {
            Expr::NAryOp(*op, es.iter().map(|e| rename(e, renaming)).collect())
        }

        Expr::NumOp(op, a, b) => Expr::NumOp(
            *op,
            Box::new(rename(a, renaming)),
            Box::new(rename(b, renaming)),
        ),

        Expr::NumRel(rel, a, b) => Expr::NumRel(
            *rel,
            Box::new(rename(a, renaming)),
            Box::new(rename(b, renaming)),
        ),

        Expr::Ite { cond, then, else_ } => Expr::Ite {
            cond: Box::new(rename(cond, renaming)),
            then: Box::new(rename(then, renaming)),
            else_: Box::new(rename(else_, renaming)),
        },

        Expr::App(f, es) => Expr::App(ren(f), es.iter().map(|e| rename(e, renaming)).collect()),

        Expr::KVar(k, sigma) => Expr::KVar(
            k.clone(),
            sigma
                .iter()
                .map(|(key, e)| (ren(key), rename(e, renaming)))
                .collect(),
        ),

        Expr::Exists { binders, body } => Expr::Exists {
            binders: binders
                .iter()
                .map(|b| Binder {
                    name: ren(&b.name),
                    sort: b.sort.clone(),
                })
                .collect(),
            body: Box::new(rename(body, renaming)),
        },

        Expr::Interp(e) => Expr::Interp(Box::new(rename(e, renaming))),
    }
}

/// Rename a single symbol.
pub fn rename_one(expr: &Expr, from: &str, to: &str) -> Expr {
    let mut renaming = Renaming::new();
    renaming.insert(from.to_string(), to.to_string());
    rename(expr, &renaming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{KVar, NumRel, Sort};

    fn leq(a: Expr, b: Expr) -> Expr {
        Expr::NumRel(NumRel::Leq, Box::new(a), Box::new(b))
    }

    #[test]
    fn test_substitute_qf() {
        let e = Expr::and([
            leq(Expr::var("x"), Expr::var("y")),
            Expr::negate(Expr::var("z")),
        ]);
        let mut sub = Subst::new();
        sub.insert("x".to_string(), Expr::int(0));
        sub.insert("z".to_string(), Expr::var("x"));
        assert_eq!(
            substitute(&e, &sub),
            Expr::and([
                leq(Expr::int(0), Expr::var("y")),
                Expr::negate(Expr::var("x")),
            ])
        );
    }

    #[test]
    fn test_substitute_respects_binders() {
        let e = Expr::Exists {
            binders: vec![Binder::new("x", &Sort::Int)],
            body: Box::new(leq(Expr::var("x"), Expr::var("y"))),
        };
        let mut sub = Subst::new();
        sub.insert("x".to_string(), Expr::int(1));
        sub.insert("y".to_string(), Expr::int(2));
        assert_eq!(
            substitute(&e, &sub),
            Expr::Exists {
                binders: vec![Binder::new("x", &Sort::Int)],
                body: Box::new(leq(Expr::var("x"), Expr::int(2))),
            }
        );
    }

    #[test]
    fn test_substitute_maps_kvar_values_only() {
        let mut sigma = Subst::new();
        sigma.insert("p".to_string(), Expr::var("x"));
        let e = Expr::KVar(KVar::new("k0"), sigma);
        let mut sub = Subst::new();
        sub.insert("x".to_string(), Expr::var("w"));
        sub.insert("p".to_string(), Expr::var("nope"));
        let mut expected_sigma = Subst::new();
        expected_sigma.insert("p".to_string(), Expr::var("w"));
        assert_eq!(
            substitute(&e, &sub),
            Expr::KVar(KVar::new("k0"), expected_sigma)
        );
    }

    #[test]
    fn test_rename_hits_kvar_keys() {
        let mut sigma = Subst::new();
        sigma.insert("p".to_string(), Expr::var("p"));
        let e = Expr::KVar(KVar::new("k0"), sigma);
        let renamed = rename_one(&e, "p", "p!0");
        let mut expected_sigma = Subst::new();
        expected_sigma.insert("p!0".to_string(), Expr::var("p!0"));
        assert_eq!(renamed, Expr::KVar(KVar::new("k0"), expected_sigma));
    }

    /// Renaming a substitution's keys first and applying it must agree with
    /// applying it and renaming the result, when the rename targets are fresh.
    #[test]
    fn test_rename_commutes_with_substitute() {
        let e = leq(Expr::var("x"), Expr::var("s"));
        let mut sub = Subst::new();
        sub.insert("s".to_string(), Expr::var("x"));

        let applied_then_renamed = rename_one(&substitute(&e, &sub), "x", "x!0");

        let renamed_sub: Subst = sub
            .iter()
            .map(|(k, v)| (k.clone(), rename_one(v, "x", "x!0")))
            .collect();
        let renamed_then_applied = substitute(&rename_one(&e, "x", "x!0"), &renamed_sub);

        assert_eq!(applied_then_renamed, renamed_then_applied);
    }
}
