// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Pretty printing of expressions in a compact infix form.

use crate::syntax::*;
use itertools::Itertools;

fn precedence(e: &Expr) -> usize {
    use crate::syntax::{BinOp::*, Expr::*, NOp::*, NumOp::*, UOp::*};

    match e {
        Exists { .. } => 0,
        BinOp(Implies | Iff, _, _) => 10,
        Ite { .. } => 30,
        NAryOp(Or, _) => 40,
        NAryOp(And, _) => 50,
        BinOp(Equals | NotEquals, _, _) | NumRel(_, _, _) => 60,
        UnaryOp(Not, _) => 70,
        NumOp(Add | Sub, _, _) => 80,
        NumOp(Mul | Div | Mod, _, _) => 90,
        UnaryOp(Neg, _) => 95,
        Literal(_) | Constant(_) | Var(_) | App(_, _) | KVar(_, _) | Interp(_) => 1000,
    }
}

fn parens(add_parens: bool, s: String) -> String {
    if add_parens {
        format!("({s})")
    } else {
        s
    }
}

fn binder(b: &Binder) -> String {
    format!("{}:{}", b.name, b.sort)
}

/// Print an expression. The result is infix, with as few parentheses as the
/// precedence table allows.
pub fn expr(e: &Expr) -> String {
    match e {
        Expr::Literal(false) => "false".to_string(),
        Expr::Literal(true) => "true".to_string(),
        Expr::Constant(c) => format!("{c}"),
        Expr::Var(s) => s.to_string(),
        Expr::App(f, args) => format!("{}({})", f, args.iter().map(expr).join(", ")),
        Expr::KVar(k, sigma) => {
            let bindings = sigma
                .iter()
                .map(|(key, val)| format!("{key} := {}", expr(val)))
                .join(", ");
            format!("{k}[{bindings}]")
        }
        Expr::UnaryOp(op, arg) => {
            let arg_prec = precedence(arg);
            let s = parens(arg_prec < precedence(e), expr(arg));
            match op {
                UOp::Not => format!("!{s}"),
                UOp::Neg => format!("-{s}"),
            }
        }
        Expr::BinOp(op, lhs, rhs) => {
            let my_prec = precedence(e);
            let op = match op {
                BinOp::Equals => "=",
                BinOp::NotEquals => "!=",
                BinOp::Implies => "=>",
                BinOp::Iff => "<=>",
            };
            format!(
                "{} {op} {}",
                parens(precedence(lhs) <= my_prec, expr(lhs)),
                parens(precedence(rhs) < my_prec, expr(rhs)),
            )
        }
        Expr::NAryOp(op, args) => {
            let my_prec = precedence(e);
            let op = match op {
                NOp::And => "&&",
                NOp::Or => "||",
            };
            args.iter()
                .map(|arg| parens(precedence(arg) < my_prec, expr(arg)))
                .join(&format!(" {op} "))
        }
        Expr::NumOp(op, lhs, rhs) => {
            let my_prec = precedence(e);
            let op = match op {
                NumOp::Add => "+",
                NumOp::Sub => "-",
                NumOp::Mul => "*",
                NumOp::Div => "/",
                NumOp::Mod => "mod",
            };
            format!(
                "{} {op} {}",
                parens(precedence(lhs) < my_prec, expr(lhs)),
                parens(precedence(rhs) <= my_prec, expr(rhs)),
            )
        }
        Expr::NumRel(rel, lhs, rhs) => {
            let my_prec = precedence(e);
            let rel = match rel {
                NumRel::Lt => "<",
                NumRel::Leq => "<=",
                NumRel::Gt => ">",
                NumRel::Geq => ">=",
            };
            format!(
                "{} {rel} {}",
                parens(precedence(lhs) <= my_prec, expr(lhs)),
                parens(precedence(rhs) <= my_prec, expr(rhs)),
            )
        }
        Expr::Ite { cond, then, else_ } => format!(
            "if {} then {} else {}",
            expr(cond),
            expr(then),
            expr(else_)
        ),
        Expr::Exists { binders, body } => {
            format!(
                "exists {}. {}",
                binders.iter().map(binder).join(", "),
                expr(body)
            )
        }
        Expr::Interp(e) => format!("interp({})", expr(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::expr;
    use crate::syntax::*;

    fn geq(a: Expr, b: Expr) -> Expr {
        Expr::NumRel(NumRel::Geq, Box::new(a), Box::new(b))
    }

    #[test]
    fn test_printer_precedence() {
        let e = Expr::and([
            geq(
                Expr::var("v"),
                Expr::NumOp(
                    NumOp::Add,
                    Box::new(Expr::var("s")),
                    Box::new(Expr::var("k")),
                ),
            ),
            Expr::or([Expr::var("p"), Expr::negate(Expr::var("q"))]),
        ]);
        assert_eq!(expr(&e), "v >= s + k && (p || !q)");
    }

    #[test]
    fn test_printer_kvar() {
        let mut sigma = Subst::new();
        sigma.insert("k".to_string(), Expr::int(-1));
        let e = Expr::KVar(KVar::new("k0"), sigma);
        assert_eq!(expr(&e), "$k0[k := -1]");
    }
}
