// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! The AST for terms, sorts, and k-variable applications.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// An identifier. Symbols produced by the unroller's renamer carry a numeric
/// suffix separated by `!` (see [`suffixed`] and [`split_suffix`]); all other
/// symbols are opaque.
pub type Symbol = String;

/// The distinguished symbol naming the implicit argument position of a
/// k-variable. Candidate solutions are expressed in terms of it.
pub const VV: &str = "VV";

/// Attach a numeric rename suffix to a base symbol.
pub fn suffixed(base: &str, n: usize) -> Symbol {
    format!("{base}!{n}")
}

/// Split a symbol into its base and rename suffix, if it has one.
pub fn split_suffix(sym: &str) -> Option<(&str, usize)> {
    let (base, suffix) = sym.rsplit_once('!')?;
    let n = suffix.parse().ok()?;
    Some((base, n))
}

/// Unary operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UOp {
    Not,
    /// Arithmetic negation
    Neg,
}

/// Binary logical operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinOp {
    Equals,
    NotEquals,
    Implies,
    Iff,
}

/// N-ary logical operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NOp {
    And,
    Or,
}

/// Binary arithmetic operators
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NumOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Binary arithmetic relations. Equality and disequality are [`BinOp`]s.
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NumRel {
    Lt,
    Leq,
    Gt,
    Geq,
}

/// A monomorphic sort tag, used for declaring symbols to the SMT solver.
#[allow(missing_docs)]
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sort {
    Bool,
    Int,
    Real,
    Named(String),
}

impl Sort {
    /// Smart constructor for a named sort.
    pub fn named<S: AsRef<str>>(s: S) -> Self {
        Self::Named(s.as_ref().to_string())
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::Int => write!(f, "Int"),
            Sort::Real => write!(f, "Real"),
            Sort::Named(s) => write!(f, "{s}"),
        }
    }
}

/// A constant term.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Constant {
    /// An integer constant
    Int(i64),
    /// A real constant, kept in its decimal rendering so equality stays
    /// structural
    Real(String),
    /// An interpreted literal of a named sort
    Lit(String, Sort),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{i}"),
            Constant::Real(r) => write!(f, "{r}"),
            Constant::Lit(l, _) => write!(f, "{l}"),
        }
    }
}

/// An unknown predicate variable, to be solved for.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KVar(pub String);

impl KVar {
    /// Smart constructor taking the k-variable's name by reference.
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        Self(s.as_ref().to_string())
    }
}

impl fmt::Display for KVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// A finite mapping from symbols to expressions, applied to k-variable
/// occurrences. Keys are unique; iteration order is the key order.
pub type Subst = BTreeMap<Symbol, Expr>;

/// A binder for the existential quantifier
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Binder {
    /// Bound name
    pub name: Symbol,
    /// Sort for this binder
    pub sort: Sort,
}

impl Binder {
    /// Smart constructor for a Binder that takes arguments by reference.
    pub fn new<N: AsRef<str>>(name: N, sort: &Sort) -> Self {
        Binder {
            name: name.as_ref().to_string(),
            sort: sort.clone(),
        }
    }
}

/// A first-order term over uninterpreted functions, linear arithmetic, and
/// k-variable applications.
#[derive(PartialEq, Eq, Clone, Debug, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Expr {
    /// A constant true or false
    Literal(bool),
    /// A constant value
    Constant(Constant),
    /// A reference to a variable
    Var(Symbol),
    /// An applied unary operation
    UnaryOp(UOp, Box<Expr>),
    /// An applied binary logical operation
    BinOp(BinOp, Box<Expr>, Box<Expr>),
    /// An applied n-ary logical operation
    NAryOp(NOp, Vec<Expr>),
    /// An applied binary arithmetic operation
    NumOp(NumOp, Box<Expr>, Box<Expr>),
    /// An applied arithmetic relation
    NumRel(NumRel, Box<Expr>, Box<Expr>),
    /// If-then-else
    Ite {
        /// A boolean conditional
        cond: Box<Expr>,
        /// Value when `cond` is true
        then: Box<Expr>,
        /// Value when `cond` is false
        else_: Box<Expr>,
    },
    /// Application of an uninterpreted function symbol
    App(Symbol, Vec<Expr>),
    /// Application `K[σ]` of a k-variable to a substitution
    KVar(KVar, Subst),
    /// An existential quantifier
    #[allow(missing_docs)]
    Exists {
        binders: Vec<Binder>,
        body: Box<Expr>,
    },
    /// Marks its argument as a Craig-interpolation cut point. Produced only by
    /// the query serializer.
    Interp(Box<Expr>),
}

impl Expr {
    /// Flatten an n-ary operation one level deep.
    fn flatten_nary(self) -> Self {
        match self {
            Self::NAryOp(op, es) => {
                let new_es = es
                    .into_iter()
                    .flat_map(|e| match e {
                        Self::NAryOp(op2, es2) if op == op2 => es2,
                        _ => vec![e],
                    })
                    .collect();
                Self::NAryOp(op, new_es)
            }
            _ => self,
        }
    }

    /// Smart constructor for a variable reference
    pub fn var<S: AsRef<str>>(s: S) -> Self {
        Self::Var(s.as_ref().to_string())
    }

    /// Smart constructor for an integer constant
    pub fn int(i: i64) -> Self {
        Self::Constant(Constant::Int(i))
    }

    /// Smart constructor for function applications
    pub fn app(f: &str, args: &[Expr]) -> Self {
        Self::App(f.to_string(), args.to_vec())
    }

    /// Smart constructor equivalent to the conjunction of an iterator of terms
    pub fn and<I>(es: I) -> Self
    where
        I: IntoIterator,
        I::IntoIter: Iterator<Item = Expr>,
    {
        let mut es: Vec<Expr> = es.into_iter().collect();
        if es.is_empty() {
            return Expr::Literal(true);
        } else if es.len() == 1 {
            return es.pop().unwrap();
        }
        Self::NAryOp(NOp::And, es).flatten_nary()
    }

    /// Smart constructor equivalent to the disjunction of an iterator of terms
    pub fn or<I>(es: I) -> Self
    where
        I: IntoIterator,
        I::IntoIter: Iterator<Item = Expr>,
    {
        let mut es: Vec<Expr> = es.into_iter().collect();
        if es.is_empty() {
            return Expr::Literal(false);
        } else if es.len() == 1 {
            return es.pop().unwrap();
        }
        Self::NAryOp(NOp::Or, es).flatten_nary()
    }

    /// Convenience function to create `lhs = rhs`
    pub fn equals(lhs: Expr, rhs: Expr) -> Self {
        Self::BinOp(BinOp::Equals, Box::new(lhs), Box::new(rhs))
    }

    /// Convenience function to create `lhs => rhs`
    pub fn implies(lhs: Expr, rhs: Expr) -> Self {
        Self::BinOp(BinOp::Implies, Box::new(lhs), Box::new(rhs))
    }

    /// Convenience function to create `lhs <=> rhs`
    pub fn iff(lhs: Expr, rhs: Expr) -> Self {
        Self::BinOp(BinOp::Iff, Box::new(lhs), Box::new(rhs))
    }

    /// Convenience function to create `!e`
    pub fn negate(e: Expr) -> Self {
        Self::UnaryOp(UOp::Not, Box::new(e))
    }

    /// Whether this expression contains any k-variable application.
    pub fn has_kvars(&self) -> bool {
        match self {
            Expr::KVar(..) => true,
            Expr::Literal(_) | Expr::Constant(_) | Expr::Var(_) => false,
            Expr::UnaryOp(_, e) | Expr::Interp(e) => e.has_kvars(),
            Expr::BinOp(_, a, b) | Expr::NumOp(_, a, b) | Expr::NumRel(_, a, b) => {
                a.has_kvars() || b.has_kvars()
            }
            Expr::NAryOp(_, es) | Expr::App(_, es) => es.iter().any(|e| e.has_kvars()),
            Expr::Ite { cond, then, else_ } => {
                cond.has_kvars() || then.has_kvars() || else_.has_kvars()
            }
            Expr::Exists { body, .. } => body.has_kvars(),
        }
    }

    /// Collect the free symbols of this expression. Function symbols count
    /// (they must be declared to the solver); the keys of a k-variable
    /// substitution do not (they name formal parameters), but its values
    /// contribute.
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        fn go(e: &Expr, bound: &im::HashSet<Symbol>, out: &mut BTreeSet<Symbol>) {
            match e {
                Expr::Literal(_) | Expr::Constant(_) => (),
                Expr::Var(s) => {
                    if !bound.contains(s) {
                        out.insert(s.clone());
                    }
                }
                Expr::UnaryOp(_, e) | Expr::Interp(e) => go(e, bound, out),
                Expr::BinOp(_, a, b) | Expr::NumOp(_, a, b) | Expr::NumRel(_, a, b) => {
                    go(a, bound, out);
                    go(b, bound, out);
                }
                Expr::NAryOp(_, es) => es.iter().for_each(|e| go(e, bound, out)),
                Expr::Ite { cond, then, else_ } => {
                    go(cond, bound, out);
                    go(then, bound, out);
                    go(else_, bound, out);
                }
                Expr::App(f, es) => {
                    if !bound.contains(f) {
                        out.insert(f.clone());
                    }
                    es.iter().for_each(|e| go(e, bound, out));
                }
                Expr::KVar(_, subst) => subst.values().for_each(|e| go(e, bound, out)),
                Expr::Exists { binders, body } => {
                    let mut bound = bound.clone();
                    bound.extend(binders.iter().map(|b| b.name.clone()));
                    go(body, &bound, out);
                }
            }
        }
        let mut out = BTreeSet::new();
        go(self, &im::HashSet::new(), &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smart_constructors() {
        assert_eq!(Expr::and([]), Expr::Literal(true));
        assert_eq!(Expr::or([]), Expr::Literal(false));
        assert_eq!(Expr::and([Expr::var("x")]), Expr::var("x"));
        // one-level flattening of nested conjunctions
        let nested = Expr::and([Expr::and([Expr::var("a"), Expr::var("b")]), Expr::var("c")]);
        assert_eq!(
            nested,
            Expr::NAryOp(
                NOp::And,
                vec![Expr::var("a"), Expr::var("b"), Expr::var("c")]
            )
        );
    }

    #[test]
    fn test_suffix_roundtrip() {
        assert_eq!(suffixed("x", 3), "x!3");
        assert_eq!(split_suffix("x!3"), Some(("x", 3)));
        assert_eq!(split_suffix("x"), None);
        assert_eq!(split_suffix("SUB!10"), Some(("SUB", 10)));
        // only the last separator counts
        assert_eq!(split_suffix("x!1!2"), Some(("x!1", 2)));
    }

    #[test]
    fn test_free_symbols() {
        let mut subst = Subst::new();
        subst.insert("k".to_string(), Expr::var("n"));
        let e = Expr::and([
            Expr::NumRel(
                NumRel::Leq,
                Box::new(Expr::var("x")),
                Box::new(Expr::app("f", &[Expr::var("y")])),
            ),
            Expr::KVar(KVar::new("k0"), subst),
            Expr::Exists {
                binders: vec![Binder::new("z", &Sort::Int)],
                body: Box::new(Expr::equals(Expr::var("z"), Expr::var("w"))),
            },
        ]);
        let free: Vec<_> = e.free_symbols().into_iter().collect();
        // "k" is a formal parameter name, "z" is bound
        assert_eq!(free, vec!["f", "n", "w", "x", "y"]);
    }
}
