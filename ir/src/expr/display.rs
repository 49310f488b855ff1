use std::fmt;

use super::core::{Expr, Op};
use crate::types::BinaryOp;

const ATOM: u8 = 3;

fn precedence(expr: &Expr) -> u8 {
    match expr.op() {
        Op::Binary(BinaryOp::Add | BinaryOp::Sub, ..) => 1,
        Op::Binary(BinaryOp::Mul, ..) => 2,
        _ => ATOM,
    }
}

fn write_expr(f: &mut fmt::Formatter<'_>, expr: &Expr, min_prec: u8) -> fmt::Result {
    let prec = precedence(expr);
    let paren = prec < min_prec;
    if paren {
        f.write_str("(")?;
    }

    match expr.op() {
        Op::Const(v) => write!(f, "{v}")?,
        Op::Var(var) => f.write_str(&var.name)?,
        Op::Binary(op, lhs, rhs) => match op.symbol() {
            Some(symbol) => {
                write_expr(f, lhs, prec)?;
                write!(f, " {symbol} ")?;
                let rhs_prec = if *op == BinaryOp::Sub { prec + 1 } else { prec };
                write_expr(f, rhs, rhs_prec)?;
            }
            None => {
                write!(f, "{op}(")?;
                write_expr(f, lhs, 0)?;
                f.write_str(", ")?;
                write_expr(f, rhs, 0)?;
                f.write_str(")")?;
            }
        },
        Op::Cast(src) => {
            write!(f, "{}(", expr.dtype)?;
            write_expr(f, src, 0)?;
            f.write_str(")")?;
        }
        Op::Call { name, args } => {
            write!(f, "{name}(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_expr(f, arg, 0)?;
            }
            f.write_str(")")?;
        }
    }

    if paren {
        f.write_str(")")?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}
