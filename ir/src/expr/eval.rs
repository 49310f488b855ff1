//! Concrete evaluation of expressions under variable bindings.

use std::collections::HashMap;
use std::sync::Arc;

use tessel_dtype::{DType, ScalarDType};

use super::core::{Expr, Op};
use crate::types::BinaryOp;

/// Floor division: the quotient rounds toward negative infinity.
///
/// Returns `None` on a zero divisor or overflow.
pub fn floor_div(a: i64, b: i64) -> Option<i64> {
    let q = a.checked_div(b)?;
    if a % b != 0 && ((a < 0) != (b < 0)) { q.checked_sub(1) } else { Some(q) }
}

/// Floor modulo: the remainder takes the sign of the divisor.
///
/// Returns `None` on a zero divisor or overflow.
pub fn floor_mod(a: i64, b: i64) -> Option<i64> {
    let r = a.checked_rem(b)?;
    if r != 0 && ((r < 0) != (b < 0)) { r.checked_add(b) } else { Some(r) }
}

/// Truncate `value` to the bit width of an integer `dtype`.
pub(crate) fn wrap_to_dtype(dtype: &DType, value: i64) -> i64 {
    match dtype.scalar() {
        Some(ScalarDType::Bool) => (value != 0) as i64,
        Some(s) if s.is_int() && s.bits() < 64 => {
            let shift = 64 - s.bits();
            if s.is_signed() { (value << shift) >> shift } else { ((value as u64) << shift >> shift) as i64 }
        }
        _ => value,
    }
}

/// Values assigned to variables, keyed by variable identity.
#[derive(Debug, Clone, Default)]
pub struct Bindings(HashMap<u64, i64>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `var` to `value`. Non-variable expressions are ignored.
    pub fn bind(&mut self, var: &Arc<Expr>, value: i64) -> &mut Self {
        if let Some(v) = var.as_var() {
            self.0.insert(v.token, value);
        }
        self
    }

    pub fn with(mut self, var: &Arc<Expr>, value: i64) -> Self {
        self.bind(var, value);
        self
    }

    pub fn get(&self, var: &Arc<Expr>) -> Option<i64> {
        var.as_var().and_then(|v| self.0.get(&v.token).copied())
    }
}

impl Expr {
    /// Evaluate with exact integer arithmetic.
    ///
    /// Casts wrap to their target width. Returns `None` when a variable is
    /// unbound, a divisor is zero, an intermediate overflows `i64`, or the
    /// expression contains an external call.
    pub fn eval(&self, bindings: &Bindings) -> Option<i64> {
        match &self.op {
            Op::Const(v) => Some(*v),
            Op::Var(var) => bindings.0.get(&var.token).copied(),
            Op::Binary(op, lhs, rhs) => {
                let a = lhs.eval(bindings)?;
                let b = rhs.eval(bindings)?;
                match op {
                    BinaryOp::Add => a.checked_add(b),
                    BinaryOp::Sub => a.checked_sub(b),
                    BinaryOp::Mul => a.checked_mul(b),
                    BinaryOp::FloorDiv => floor_div(a, b),
                    BinaryOp::FloorMod => floor_mod(a, b),
                }
            }
            Op::Cast(src) => src.eval(bindings).map(|v| wrap_to_dtype(&self.dtype, v)),
            Op::Call { .. } => None,
        }
    }
}
