//! Range analysis (vmin/vmax) for index expressions.
//!
//! The analysis is conservative: whenever an operation cannot be bounded
//! precisely the result widens to the dtype bounds. Arithmetic saturates at
//! the `i64` limits, and callers treat a saturated bound as unknown.

use std::sync::Arc;

use tessel_dtype::DType;

use super::core::{Expr, Op};
use super::eval::floor_div;
use crate::types::BinaryOp;

impl Expr {
    /// Smallest value this expression can take.
    pub fn vmin(self: &Arc<Self>) -> i64 {
        self.vmin_vmax().0
    }

    /// Largest value this expression can take.
    pub fn vmax(self: &Arc<Self>) -> i64 {
        self.vmin_vmax().1
    }

    pub fn vmin_vmax(self: &Arc<Self>) -> (i64, i64) {
        *self.vmin_vmax_cache.get_or_init(|| compute_vmin_vmax(self))
    }
}

fn compute_vmin_vmax(expr: &Arc<Expr>) -> (i64, i64) {
    let (lo, hi) = match &expr.op {
        Op::Const(v) => (*v, *v),
        Op::Var(var) => (var.min_val, var.max_val),
        Op::Binary(op, a, b) => binary_range(*op, a.vmin_vmax(), b.vmin_vmax(), &expr.dtype),
        Op::Cast(src) => {
            let (src_lo, src_hi) = src.vmin_vmax();
            let (dt_lo, dt_hi) = expr.dtype.bounds();
            if src_lo >= dt_lo && src_hi <= dt_hi { (src_lo, src_hi) } else { (dt_lo, dt_hi) }
        }
        Op::Call { .. } => expr.dtype.bounds(),
    };

    let (dt_lo, dt_hi) = expr.dtype.bounds();
    (lo.clamp(dt_lo, dt_hi), hi.clamp(dt_lo, dt_hi))
}

fn binary_range(op: BinaryOp, (a_lo, a_hi): (i64, i64), (b_lo, b_hi): (i64, i64), dtype: &DType) -> (i64, i64) {
    match op {
        BinaryOp::Add => (a_lo.saturating_add(b_lo), a_hi.saturating_add(b_hi)),
        BinaryOp::Sub => (a_lo.saturating_sub(b_hi), a_hi.saturating_sub(b_lo)),
        BinaryOp::Mul => {
            let corners = [
                a_lo.saturating_mul(b_lo),
                a_lo.saturating_mul(b_hi),
                a_hi.saturating_mul(b_lo),
                a_hi.saturating_mul(b_hi),
            ];
            corners.iter().fold((i64::MAX, i64::MIN), |(lo, hi), &c| (lo.min(c), hi.max(c)))
        }
        BinaryOp::FloorDiv => floordiv_range((a_lo, a_hi), (b_lo, b_hi)).unwrap_or_else(|| dtype.bounds()),
        BinaryOp::FloorMod => floormod_range((a_lo, a_hi), (b_lo, b_hi)).unwrap_or_else(|| dtype.bounds()),
    }
}

fn floordiv_range((a_lo, a_hi): (i64, i64), (b_lo, b_hi): (i64, i64)) -> Option<(i64, i64)> {
    if b_lo == b_hi {
        let c = b_lo;
        return match c.signum() {
            1 => Some((floor_div(a_lo, c)?, floor_div(a_hi, c)?)),
            -1 => Some((floor_div(a_hi, c)?, floor_div(a_lo, c)?)),
            _ => None,
        };
    }
    // Non-negative dividend over a strictly positive divisor range.
    if a_lo >= 0 && b_lo > 0 {
        return Some((floor_div(a_lo, b_hi)?, floor_div(a_hi, b_lo)?));
    }
    None
}

fn floormod_range((a_lo, a_hi): (i64, i64), (b_lo, b_hi): (i64, i64)) -> Option<(i64, i64)> {
    if b_lo > 0 {
        if a_lo >= 0 && a_hi < b_lo {
            return Some((a_lo, a_hi));
        }
        return Some((0, b_hi.saturating_sub(1)));
    }
    if b_hi < 0 {
        return Some((b_lo.saturating_add(1), 0));
    }
    None
}
