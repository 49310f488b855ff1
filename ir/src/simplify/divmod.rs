//! Floor division and modulo normalization.
//!
//! For a constant divisor `c > 0` the numerator is split as `x = c * q + r`
//! with every coefficient of `r` in `[0, c)`, so `fd(x, c) = q + fd(r, c)` and
//! `fm(x, c) = fm(r, c)`. The common factor `g = gcd(r, c)` is then divided
//! out (`fd(g*a, g*b) = fd(a, b)`, `fm(g*a, g*b) = g * fm(a, b)`) before the
//! remainder is eliminated by range analysis, merged with a nested constant
//! division or modulo, or kept as an atom.

use std::sync::Arc;

use tessel_dtype::DType;
use tracing::trace;

use super::poly::{Poly, gcd};
use super::{Normalizer, render};
use crate::expr::{Expr, Op, floor_div, floor_mod};
use crate::types::BinaryOp;

impl Normalizer<'_> {
    /// Normalize `fd(x, d)` or `fm(x, d)`; `None` on overflow.
    pub(super) fn div_mod(&mut self, op: BinaryOp, x: &Poly, d: &Poly, dtype: &DType) -> Option<Poly> {
        match d.as_const() {
            Some(c) => self.div_mod_const(op, x, c, dtype),
            None => self.div_mod_symbolic(op, x, d, dtype),
        }
    }

    fn div_mod_const(&mut self, op: BinaryOp, x: &Poly, c: i64, dtype: &DType) -> Option<Poly> {
        let is_div = op == BinaryOp::FloorDiv;

        // Only reachable when a symbolic divisor cancels to zero.
        if c == 0 {
            return opaque(op, x, &Poly::zero(), dtype);
        }
        if let Some(v) = x.as_const() {
            let folded = if is_div { floor_div(v, c)? } else { floor_mod(v, c)? };
            return Some(Poly::constant(folded));
        }
        if c < 0 {
            // fd(x, c) = fd(-x, -c), fm(x, c) = -fm(-x, -c)
            let result = self.div_mod_const(op, &x.checked_scale(-1)?, c.checked_neg()?, dtype)?;
            return if is_div { Some(result) } else { result.checked_scale(-1) };
        }
        if c == 1 {
            return Some(if is_div { x.clone() } else { Poly::zero() });
        }

        let (q, r) = x.split_by(c);
        // Reducing coefficients mod c can flip signs and expose a div/mod pair.
        let recombined = self.recombine(r.clone());
        if recombined != r {
            let x = q.checked_scale(c)?.checked_add(&recombined)?;
            return self.div_mod_const(op, &x, c, dtype);
        }
        if r.is_zero() {
            return Some(if is_div { q } else { Poly::zero() });
        }

        let g = gcd(r.content(), c);
        let (r, c) = (r.div_exact(g), c / g);
        trace!(%op, divisor = c, factor = g, "split constant floor div/mod");

        let reduced = self.reduce_remainder(op, &r, c, dtype)?;
        if is_div { q.checked_add(&reduced) } else { reduced.checked_scale(g) }
    }

    /// `fd(r, c)` or `fm(r, c)` for a remainder whose coefficients lie in `[0, c)`.
    fn reduce_remainder(&mut self, op: BinaryOp, r: &Poly, c: i64, dtype: &DType) -> Option<Poly> {
        let is_div = op == BinaryOp::FloorDiv;

        if let Some(v) = r.as_const() {
            let folded = if is_div { floor_div(v, c)? } else { floor_mod(v, c)? };
            return Some(Poly::constant(folded));
        }

        // The whole range of r falls into a single quotient bucket.
        if self.config.use_bounds
            && let Some((lo, hi)) = r.range()
            && lo.div_euclid(c) == hi.div_euclid(c)
        {
            let bucket = lo.div_euclid(c);
            trace!(%op, divisor = c, lo, hi, bucket, "eliminated floor div/mod by range");
            return if is_div { Some(Poly::constant(bucket)) } else { r.checked_sub(&Poly::constant(bucket.checked_mul(c)?)) };
        }

        // fd(fd(y, a), c) = fd(y, a * c) for positive a
        if is_div
            && let Some(inner) = r.as_single_atom()
            && let Op::Binary(BinaryOp::FloorDiv, y, a) = inner.op()
            && let Some(a) = a.as_const()
            && a > 0
            && let Some(merged) = a.checked_mul(c)
        {
            let y = y.clone();
            trace!(inner = a, outer = c, "merged nested constant floor division");
            let y = self.to_poly(&y);
            return self.div_mod_const(BinaryOp::FloorDiv, &y, merged, dtype);
        }

        // fm(fm(y, a), c) = fm(y, c) when c divides a
        if !is_div
            && let Some(inner) = r.as_single_atom()
            && let Op::Binary(BinaryOp::FloorMod, y, a) = inner.op()
            && let Some(a) = a.as_const()
            && a > 0
            && a % c == 0
        {
            let y = y.clone();
            trace!(inner = a, outer = c, "collapsed nested constant floor modulo");
            let y = self.to_poly(&y);
            return self.div_mod_const(BinaryOp::FloorMod, &y, c, dtype);
        }

        opaque(op, r, &Poly::constant(c), dtype)
    }

    fn div_mod_symbolic(&mut self, op: BinaryOp, x: &Poly, d: &Poly, dtype: &DType) -> Option<Poly> {
        let is_div = op == BinaryOp::FloorDiv;

        // Pull out exact multiples of a single-term divisor: x = d * q + r.
        let (q, r) = match d.as_single_term() {
            Some((mono, coeff)) => x.split_by_monomial(mono, coeff)?,
            None => (Poly::zero(), x.clone()),
        };
        if !q.is_zero() {
            trace!(%op, "pulled divisor multiples out of numerator");
        }

        if r.is_zero() {
            return Some(if is_div { q } else { Poly::zero() });
        }
        if r == *d {
            return if is_div { q.checked_add(&Poly::constant(1)) } else { Some(Poly::zero()) };
        }

        // 0 <= r < d for every value in range.
        if self.config.use_bounds
            && let Some((r_lo, r_hi)) = r.range()
            && let Some((d_lo, _)) = d.range()
            && d_lo > 0
            && r_lo >= 0
            && r_hi < d_lo
        {
            trace!(%op, r_lo, r_hi, d_lo, "eliminated symbolic floor div/mod by range");
            return Some(if is_div { q } else { r });
        }

        let atom = opaque(op, &r, d, dtype)?;
        if is_div { q.checked_add(&atom) } else { Some(atom) }
    }
}

/// Keep `op(x, d)` as an atom over canonical operands.
fn opaque(op: BinaryOp, x: &Poly, d: &Poly, dtype: &DType) -> Option<Poly> {
    let node: Arc<Expr> = Expr::binary_unchecked(op, render(x, dtype)?, render(d, dtype)?, dtype.clone());
    Some(Poly::atom(node))
}
