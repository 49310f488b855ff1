//! Canonicalizing simplifier for integer index expressions.
//!
//! Expressions are normalized into a sum of `coeff * monomial` terms whose
//! atoms are variables, calls, opaque casts and irreducible floor div/mod
//! nodes, then rendered back in a fixed order:
//!
//! - terms by descending degree, then by the structural order of their atoms;
//! - each term as `monomial * coeff` (coefficient omitted when 1);
//! - negative terms after the first as subtraction;
//! - the constant term last.
//!
//! Equivalent inputs that normalize to the same polynomial therefore render to
//! the same hash-consed node. Div/mod rules live in [`divmod`].

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tessel_dtype::DType;
use tracing::{debug, trace};

use crate::expr::{Expr, ExprKey, Op};
use crate::types::BinaryOp;

pub mod config;
mod divmod;
pub(crate) mod poly;

pub use config::SimplifyConfig;
use poly::{Monomial, Poly, remove_atom};

/// Cap on normalize/render passes per expression.
const MAX_PASSES: usize = 4;

/// Simplify with the process-wide configuration.
pub fn simplify(expr: &Arc<Expr>) -> Arc<Expr> {
    Simplifier::default().simplify(expr)
}

/// Check that two expressions simplify to the same canonical form.
pub fn prove_equal(a: &Arc<Expr>, b: &Arc<Expr>) -> bool {
    Simplifier::default().prove_equal(a, b)
}

impl Expr {
    pub fn simplify(self: &Arc<Self>) -> Arc<Self> {
        simplify(self)
    }
}

#[derive(Debug, Clone)]
pub struct Simplifier {
    config: SimplifyConfig,
}

impl Default for Simplifier {
    fn default() -> Self {
        Self::new(SimplifyConfig::global())
    }
}

impl Simplifier {
    pub fn new(config: SimplifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimplifyConfig {
        &self.config
    }

    pub fn simplify(&self, expr: &Arc<Expr>) -> Arc<Expr> {
        let mut normalizer = Normalizer::new(&self.config);
        let result = normalizer.simplify_expr(expr);
        trace!(expr.id = expr.id, result.id = result.id, "simplified");
        result
    }

    pub fn prove_equal(&self, a: &Arc<Expr>, b: &Arc<Expr>) -> bool {
        let mut normalizer = Normalizer::new(&self.config);
        normalizer.simplify_expr(a).structurally_equal(&normalizer.simplify_expr(b))
    }
}

/// Per-call normalization state. The memo is keyed by interned node identity.
pub(crate) struct Normalizer<'c> {
    config: &'c SimplifyConfig,
    memo: HashMap<ExprKey, Poly>,
}

impl<'c> Normalizer<'c> {
    fn new(config: &'c SimplifyConfig) -> Self {
        Self { config, memo: HashMap::new() }
    }

    /// Normalize and render until the rendered node maps back onto itself.
    fn simplify_expr(&mut self, expr: &Arc<Expr>) -> Arc<Expr> {
        let mut current = expr.clone();
        for _ in 0..MAX_PASSES {
            let Some(next) = render(&self.to_poly(&current), &current.dtype) else {
                debug!(expr.id = current.id, dtype = %current.dtype, "normal form does not fit dtype, keeping node");
                return self.rebuild(&current);
            };
            if next.same_as(&current) {
                return next;
            }
            current = next;
        }
        debug!(expr.id = expr.id, passes = MAX_PASSES, "simplification did not stabilize");
        current
    }

    fn to_poly(&mut self, expr: &Arc<Expr>) -> Poly {
        let key = ExprKey(expr.clone());
        if let Some(poly) = self.memo.get(&key) {
            return poly.clone();
        }
        let poly = self.normalize(expr);
        self.memo.insert(key, poly.clone());
        poly
    }

    fn normalize(&mut self, expr: &Arc<Expr>) -> Poly {
        match expr.op() {
            Op::Const(v) => Poly::constant(*v),
            Op::Var(_) => Poly::atom(expr.clone()),
            Op::Cast(src) => {
                if src.dtype.is_int() && DType::can_safe_cast(&src.dtype, &expr.dtype) {
                    return self.to_poly(src);
                }
                let cast = self.simplify_expr(src).cast(expr.dtype());
                match cast.as_const() {
                    Some(v) => Poly::constant(v),
                    None => Poly::atom(cast),
                }
            }
            Op::Call { name, args } => {
                let args: SmallVec<[Arc<Expr>; 4]> = args.iter().map(|arg| self.simplify_expr(arg)).collect();
                Poly::atom(Expr::call_extern(expr.dtype(), name.clone(), args))
            }
            Op::Binary(op, lhs, rhs) => {
                let (lhs, rhs) = (self.to_poly(lhs), self.to_poly(rhs));
                let result = match op {
                    BinaryOp::Add => lhs.checked_add(&rhs).map(|sum| self.recombine(sum)),
                    BinaryOp::Sub => lhs.checked_sub(&rhs).map(|sum| self.recombine(sum)),
                    BinaryOp::Mul => lhs.checked_mul(&rhs).map(|product| self.recombine(product)),
                    BinaryOp::FloorDiv | BinaryOp::FloorMod => self.div_mod(*op, &lhs, &rhs, &expr.dtype),
                };
                result.unwrap_or_else(|| {
                    debug!(expr.id = expr.id, %op, "integer overflow during normalization, keeping node");
                    Poly::atom(self.rebuild(expr))
                })
            }
        }
    }

    /// The same node over simplified children.
    fn rebuild(&mut self, expr: &Arc<Expr>) -> Arc<Expr> {
        match expr.op() {
            Op::Const(_) | Op::Var(_) => expr.clone(),
            Op::Cast(src) => self.simplify_expr(src).cast(expr.dtype()),
            Op::Call { name, args } => {
                let args: SmallVec<[Arc<Expr>; 4]> = args.iter().map(|arg| self.simplify_expr(arg)).collect();
                Expr::call_extern(expr.dtype(), name.clone(), args)
            }
            Op::Binary(op, lhs, rhs) => {
                let (lhs, rhs) = (self.simplify_expr(lhs), self.simplify_expr(rhs));
                Expr::binary_unchecked(*op, lhs, rhs, expr.dtype())
            }
        }
    }

    /// Fold `k * fd(x, d) * d * rest + k * fm(x, d) * rest` into `k * x * rest`
    /// until no pair remains or the round budget runs out.
    fn recombine(&mut self, mut poly: Poly) -> Poly {
        for round in 0..self.config.max_rounds {
            match self.recombine_once(&poly) {
                Some(next) => poly = next,
                None => {
                    if round > 0 {
                        debug!(rounds = round, "div/mod recombination reached fixpoint");
                    }
                    return poly;
                }
            }
        }
        debug!(max_rounds = self.config.max_rounds, "div/mod recombination budget exhausted, keeping expanded form");
        poly
    }

    fn recombine_once(&mut self, poly: &Poly) -> Option<Poly> {
        let candidates: Vec<(Monomial, i64, usize)> = poly
            .terms()
            .flat_map(|(mono, coeff)| {
                mono.iter()
                    .enumerate()
                    .filter(|(_, atom)| matches!(atom.0.op(), Op::Binary(BinaryOp::FloorMod, ..)))
                    .map(move |(index, _)| (mono.clone(), coeff, index))
            })
            .collect();

        for (mono, coeff, index) in candidates {
            let modulo = mono[index].0.clone();
            let Op::Binary(BinaryOp::FloorMod, x, d) = modulo.op() else { continue };
            let (x, d) = (self.to_poly(x), self.to_poly(d));
            let Some(quotient) = self.div_mod(BinaryOp::FloorDiv, &x, &d, &modulo.dtype) else { continue };

            let rest = Poly::monomial(remove_atom(&mono, index), coeff);
            let Some(target) = quotient.checked_mul(&d).and_then(|t| t.checked_mul(&rest)) else { continue };
            if target.is_zero() || !poly.contains(&target) {
                continue;
            }

            if let Some(next) = substitute(poly, &target, &mono, coeff, &x, &rest) {
                trace!(modulo.id = modulo.id, coeff, "recombined floor div/mod pair");
                return Some(next);
            }
        }
        self.recombine_from_quotient(poly)
    }

    /// Same fold keyed on `fd(x, c)` for a constant `c`. The partner is the
    /// normal form of `fm(x, c)`, which need not be the atom `fm(x, c)`:
    /// `fd(fm(y, 16), 4) * 4 + fm(y, 4)` folds to `fm(y, 16)`.
    fn recombine_from_quotient(&mut self, poly: &Poly) -> Option<Poly> {
        let candidates: Vec<(Monomial, i64, usize)> = poly
            .terms()
            .flat_map(|(mono, coeff)| {
                mono.iter()
                    .enumerate()
                    .filter(|(_, atom)| matches!(atom.0.op(), Op::Binary(BinaryOp::FloorDiv, _, d) if d.as_const().is_some()))
                    .map(move |(index, _)| (mono.clone(), coeff, index))
            })
            .collect();

        for (mono, coeff, index) in candidates {
            let quotient = mono[index].0.clone();
            let Op::Binary(BinaryOp::FloorDiv, x, c) = quotient.op() else { continue };
            let Some(c) = c.as_const().filter(|&c| c > 0) else { continue };
            if coeff % c != 0 {
                continue;
            }

            let x = self.to_poly(x);
            let Some(modulo) = self.div_mod(BinaryOp::FloorMod, &x, &Poly::constant(c), &quotient.dtype) else {
                continue;
            };
            let rest = Poly::monomial(remove_atom(&mono, index), coeff / c);
            let Some(partner) = modulo.checked_mul(&rest) else { continue };
            if partner.is_zero() || !poly.contains(&partner) {
                continue;
            }

            if let Some(next) = substitute(poly, &partner, &mono, coeff, &x, &rest) {
                trace!(quotient.id = quotient.id, coeff, "recombined floor div/mod pair");
                return Some(next);
            }
        }
        None
    }
}

/// `poly - target - coeff * mono + x * rest`.
fn substitute(poly: &Poly, target: &Poly, mono: &Monomial, coeff: i64, x: &Poly, rest: &Poly) -> Option<Poly> {
    let mut next = poly.checked_sub(target)?;
    next.add_term(mono.clone(), coeff.checked_neg()?)?;
    next.add_scaled(&x.checked_mul(rest)?, 1)?;
    Some(next)
}

/// Render a polynomial back into a canonical expression of `dtype`.
///
/// `None` when a coefficient or the constant term does not fit `dtype`.
pub(crate) fn render(poly: &Poly, dtype: &DType) -> Option<Arc<Expr>> {
    let (min, max) = dtype.bounds();
    let literal = |value: i64| (min..=max).contains(&value).then(|| Expr::const_(dtype.clone(), value));
    let mul = |lhs, rhs| Expr::binary_unchecked(BinaryOp::Mul, lhs, rhs, dtype.clone());
    let scaled = |product: Arc<Expr>, coeff: i64| {
        if coeff == 1 { Some(product) } else { literal(coeff).map(|c| mul(product, c)) }
    };

    let mut terms: Vec<(&Monomial, i64)> = poly.terms().filter(|(mono, _)| !mono.is_empty()).collect();
    terms.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    let mut acc: Option<Arc<Expr>> = None;
    for (mono, coeff) in terms {
        let Some(product) = mono.iter().map(|atom| atom.0.cast(dtype.clone())).reduce(mul) else { continue };
        acc = Some(match acc {
            None => scaled(product, coeff)?,
            Some(lhs) => match coeff.checked_neg() {
                Some(neg) if coeff < 0 => {
                    Expr::binary_unchecked(BinaryOp::Sub, lhs, scaled(product, neg)?, dtype.clone())
                }
                _ => Expr::binary_unchecked(BinaryOp::Add, lhs, scaled(product, coeff)?, dtype.clone()),
            },
        });
    }

    let constant = poly.constant_term();
    match acc {
        None => literal(constant),
        Some(lhs) if constant == 0 => Some(lhs),
        Some(lhs) => match constant.checked_neg() {
            Some(neg) if constant < 0 => Some(Expr::binary_unchecked(BinaryOp::Sub, lhs, literal(neg)?, dtype.clone())),
            _ => Some(Expr::binary_unchecked(BinaryOp::Add, lhs, literal(constant)?, dtype.clone())),
        },
    }
}
