// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Converts `Expr`s to S-expressions and interpolant S-expressions back to
//! `Expr`s.

use logic::syntax::{BinOp, Binder, Constant, Expr, NOp, NumOp, NumRel, Sort, UOp};
pub use smtlib::sexp::parse;
use smtlib::sexp::{app, atom_i, atom_s, sexp_l, Atom, Sexp};
use thiserror::Error;

/// Convert a `Sort` to an S-expression.
pub fn sort(s: &Sort) -> Sexp {
    match s {
        Sort::Bool => atom_s("Bool"),
        Sort::Int => atom_s("Int"),
        Sort::Real => atom_s("Real"),
        Sort::Named(s) => atom_s(s),
    }
}

fn binder(b: &Binder) -> Sexp {
    app(&b.name, vec![sort(&b.sort)])
}

/// Convert an `Expr` to an S-expression. The `Interp` cut marker encodes as
/// `(interp e)`.
///
/// Panics on a k-variable application; the unroller eliminates those before
/// anything reaches the solver.
pub fn expr(e: &Expr) -> Sexp {
    match e {
        Expr::Literal(false) => atom_s("false"),
        Expr::Literal(true) => atom_s("true"),
        Expr::Constant(Constant::Int(i)) => {
            if *i < 0 {
                app("-", [atom_i(-i)])
            } else {
                atom_i(*i)
            }
        }
        Expr::Constant(Constant::Real(r)) => atom_s(r),
        Expr::Constant(Constant::Lit(l, _)) => atom_s(l),
        Expr::Var(s) => atom_s(s),
        Expr::UnaryOp(UOp::Not, arg) => app("not", vec![expr(arg)]),
        Expr::UnaryOp(UOp::Neg, arg) => app("-", vec![expr(arg)]),
        Expr::BinOp(op, arg1, arg2) => {
            let args = vec![expr(arg1), expr(arg2)];
            match op {
                BinOp::Equals => app("=", args),
                BinOp::NotEquals => app("distinct", args),
                BinOp::Implies => app("=>", args),
                BinOp::Iff => app("=", args),
            }
        }
        Expr::NAryOp(op, args) => {
            let args = args.iter().map(expr).collect::<Vec<_>>();
            match (op, args.is_empty()) {
                (NOp::And, false) => app("and", args),
                (NOp::Or, false) => app("or", args),
                // the solver can error if no arguments are provided like `(and)`, `(or)`
                (NOp::And, true) => atom_s("true"),
                (NOp::Or, true) => atom_s("false"),
            }
        }
        Expr::NumOp(op, x, y) => {
            let args = [expr(x), expr(y)];
            match op {
                NumOp::Add => app("+", args),
                NumOp::Sub => app("-", args),
                NumOp::Mul => app("*", args),
                NumOp::Div => app("div", args),
                NumOp::Mod => app("mod", args),
            }
        }
        Expr::NumRel(rel, x, y) => {
            let args = [expr(x), expr(y)];
            match rel {
                NumRel::Lt => app("<", args),
                NumRel::Leq => app("<=", args),
                NumRel::Gt => app(">", args),
                NumRel::Geq => app(">=", args),
            }
        }
        Expr::Ite { cond, then, else_ } => app("ite", vec![expr(cond), expr(then), expr(else_)]),
        Expr::App(f, args) => {
            if args.is_empty() {
                atom_s(f)
            } else {
                let head = vec![atom_s(f)].into_iter();
                sexp_l(head.chain(args.iter().map(expr)))
            }
        }
        Expr::Exists { binders, body } => {
            let binders = Sexp::List(binders.iter().map(binder).collect());
            app("exists", vec![binders, expr(body)])
        }
        Expr::KVar(k, _) => panic!("attempt to encode unexpanded k-variable application {k}"),
        Expr::Interp(e) => app("interp", vec![expr(e)]),
    }
}

/// Convert an `Expr` to an S-expression, then negate it.
pub fn negated_expr(e: &Expr) -> Sexp {
    app("not", [expr(e)])
}

/// An interpolant S-expression the decoder does not recognize.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("unrecognized s-expression form: {0}")]
pub struct DecodeError(pub String);

/// Whether a decoded expression is formula-shaped, which disambiguates `=`
/// between an equality atom and a logical iff.
fn is_formula(e: &Expr) -> bool {
    matches!(
        e,
        Expr::Literal(_)
            | Expr::UnaryOp(UOp::Not, _)
            | Expr::BinOp(_, _, _)
            | Expr::NAryOp(_, _)
            | Expr::NumRel(_, _, _)
    )
}

fn decode_args(args: &[Sexp]) -> Result<Vec<Expr>, DecodeError> {
    args.iter().map(decode).collect()
}

fn fold_left(op: NumOp, args: Vec<Expr>) -> Expr {
    let mut it = args.into_iter();
    let first = it.next().unwrap();
    it.fold(first, |acc, e| Expr::NumOp(op, Box::new(acc), Box::new(e)))
}

/// Decode an interpolant S-expression into an `Expr`.
///
/// Recognizes the boolean and linear-arithmetic fragment plus uninterpreted
/// function application; anything else fails cleanly.
pub fn decode(s: &Sexp) -> Result<Expr, DecodeError> {
    match s {
        Sexp::Atom(Atom::I(i)) => Ok(Expr::int(*i)),
        Sexp::Atom(Atom::S(s)) => match s.as_str() {
            "true" => Ok(Expr::Literal(true)),
            "false" => Ok(Expr::Literal(false)),
            _ => Ok(Expr::var(s)),
        },
        Sexp::Comment(c) => Err(DecodeError(format!(";{c}"))),
        Sexp::List(_) => {
            let (head, args) = s
                .app()
                .ok_or_else(|| DecodeError(s.to_string()))?;
            let wrong_arity = || DecodeError(s.to_string());
            match head {
                "not" if args.len() == 1 => Ok(Expr::negate(decode(&args[0])?)),
                "and" => Ok(Expr::and(decode_args(args)?)),
                "or" => Ok(Expr::or(decode_args(args)?)),
                "=>" if args.len() == 2 => {
                    Ok(Expr::implies(decode(&args[0])?, decode(&args[1])?))
                }
                "=" if args.len() == 2 => {
                    let lhs = decode(&args[0])?;
                    let rhs = decode(&args[1])?;
                    if is_formula(&lhs) && is_formula(&rhs) {
                        Ok(Expr::iff(lhs, rhs))
                    } else {
                        Ok(Expr::equals(lhs, rhs))
                    }
                }
                "distinct" if args.len() == 2 => Ok(Expr::BinOp(
                    BinOp::NotEquals,
                    Box::new(decode(&args[0])?),
                    Box::new(decode(&args[1])?),
                )),
                "+" if !args.is_empty() => Ok(fold_left(NumOp::Add, decode_args(args)?)),
                "*" if !args.is_empty() => Ok(fold_left(NumOp::Mul, decode_args(args)?)),
                "-" if args.len() == 1 => {
                    Ok(Expr::UnaryOp(UOp::Neg, Box::new(decode(&args[0])?)))
                }
                "-" if args.len() >= 2 => Ok(fold_left(NumOp::Sub, decode_args(args)?)),
                "div" | "/" if args.len() == 2 => Ok(Expr::NumOp(
                    NumOp::Div,
                    Box::new(decode(&args[0])?),
                    Box::new(decode(&args[1])?),
                )),
                "mod" if args.len() == 2 => Ok(Expr::NumOp(
                    NumOp::Mod,
                    Box::new(decode(&args[0])?),
                    Box::new(decode(&args[1])?),
                )),
                "<" | "<=" | ">" | ">=" if args.len() == 2 => {
                    let rel = match head {
                        "<" => NumRel::Lt,
                        "<=" => NumRel::Leq,
                        ">" => NumRel::Gt,
                        _ => NumRel::Geq,
                    };
                    Ok(Expr::NumRel(
                        rel,
                        Box::new(decode(&args[0])?),
                        Box::new(decode(&args[1])?),
                    ))
                }
                "ite" if args.len() == 3 => Ok(Expr::Ite {
                    cond: Box::new(decode(&args[0])?),
                    then: Box::new(decode(&args[1])?),
                    else_: Box::new(decode(&args[2])?),
                }),
                "not" | "=>" | "=" | "distinct" | "+" | "*" | "-" | "div" | "/" | "mod" | "<"
                | "<=" | ">" | ">=" | "ite" => Err(wrong_arity()),
                // let-bindings and quantifiers in interpolants are not handled
                "let" | "forall" | "exists" => Err(DecodeError(s.to_string())),
                f => Ok(Expr::App(f.to_string(), decode_args(args)?)),
            }
        }
    }
}
