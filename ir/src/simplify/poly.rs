//! Sum-of-products normal form used by the simplifier.
//!
//! A [`Poly`] maps monomials (sorted products of atoms) to non-zero integer
//! coefficients. The empty monomial holds the constant term. All arithmetic is
//! checked and returns `None` on `i64` overflow.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::expr::Expr;

/// An expression the polynomial layer does not look into.
#[derive(Debug, Clone)]
pub(crate) struct Atom(pub Arc<Expr>);

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Atom {}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.structural_cmp(&other.0)
    }
}

/// Sorted product of atoms; repeated atoms encode powers.
pub(crate) type Monomial = SmallVec<[Atom; 2]>;

fn mul_monomials(a: &Monomial, b: &Monomial) -> Monomial {
    let mut out: Monomial = a.iter().chain(b.iter()).cloned().collect();
    out.sort();
    out
}

/// Monomial with the atom at `index` removed.
pub(crate) fn remove_atom(mono: &Monomial, index: usize) -> Monomial {
    mono.iter().enumerate().filter(|(i, _)| *i != index).map(|(_, a)| a.clone()).collect()
}

pub(crate) fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    i64::try_from(a).unwrap_or(1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Poly {
    terms: BTreeMap<Monomial, i64>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: i64) -> Self {
        let mut poly = Self::zero();
        if value != 0 {
            poly.terms.insert(Monomial::new(), value);
        }
        poly
    }

    pub fn atom(expr: Arc<Expr>) -> Self {
        Self::monomial(smallvec::smallvec![Atom(expr)], 1)
    }

    pub fn monomial(mono: Monomial, coeff: i64) -> Self {
        let mut poly = Self::zero();
        if coeff != 0 {
            poly.terms.insert(mono, coeff);
        }
        poly
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, i64)> {
        self.terms.iter().map(|(m, c)| (m, *c))
    }

    pub fn coeff(&self, mono: &Monomial) -> i64 {
        self.terms.get(mono).copied().unwrap_or(0)
    }

    pub fn constant_term(&self) -> i64 {
        self.coeff(&Monomial::new())
    }

    /// Value of a polynomial without variable terms.
    pub fn as_const(&self) -> Option<i64> {
        match self.terms.len() {
            0 => Some(0),
            1 => self.terms.get(&Monomial::new()).copied(),
            _ => None,
        }
    }

    /// The atom of a polynomial that is exactly `1 * atom`.
    pub fn as_single_atom(&self) -> Option<&Arc<Expr>> {
        let mut iter = self.terms.iter();
        match (iter.next(), iter.next()) {
            (Some((mono, 1)), None) if mono.len() == 1 => Some(&mono[0].0),
            _ => None,
        }
    }

    /// The single `(monomial, coefficient)` term, if there is exactly one.
    pub fn as_single_term(&self) -> Option<(&Monomial, i64)> {
        let mut iter = self.terms.iter();
        match (iter.next(), iter.next()) {
            (Some((mono, coeff)), None) => Some((mono, *coeff)),
            _ => None,
        }
    }

    pub fn add_term(&mut self, mono: Monomial, coeff: i64) -> Option<()> {
        let sum = self.coeff(&mono).checked_add(coeff)?;
        if sum == 0 {
            self.terms.remove(&mono);
        } else {
            self.terms.insert(mono, sum);
        }
        Some(())
    }

    /// `self += scale * other`.
    pub fn add_scaled(&mut self, other: &Poly, scale: i64) -> Option<()> {
        for (mono, coeff) in other.terms() {
            self.add_term(mono.clone(), coeff.checked_mul(scale)?)?;
        }
        Some(())
    }

    pub fn checked_add(&self, other: &Poly) -> Option<Poly> {
        let mut out = self.clone();
        out.add_scaled(other, 1)?;
        Some(out)
    }

    pub fn checked_sub(&self, other: &Poly) -> Option<Poly> {
        let mut out = self.clone();
        out.add_scaled(other, -1)?;
        Some(out)
    }

    pub fn checked_scale(&self, k: i64) -> Option<Poly> {
        let mut out = Poly::zero();
        out.add_scaled(self, k)?;
        Some(out)
    }

    pub fn checked_mul(&self, other: &Poly) -> Option<Poly> {
        let mut out = Poly::zero();
        for (ma, ca) in self.terms() {
            for (mb, cb) in other.terms() {
                out.add_term(mul_monomials(ma, mb), ca.checked_mul(cb)?)?;
            }
        }
        Some(out)
    }

    /// Greatest common divisor of all coefficients, 0 for the zero polynomial.
    pub fn content(&self) -> i64 {
        self.terms.values().fold(0, |g, &c| gcd(g, c))
    }

    /// Divide every coefficient by `g`, which must divide them all.
    pub fn div_exact(&self, g: i64) -> Poly {
        Poly { terms: self.terms.iter().map(|(m, c)| (m.clone(), c / g)).collect() }
    }

    /// Split into `(q, r)` with `self = c * q + r` and every coefficient of `r` in `[0, c)`.
    pub fn split_by(&self, c: i64) -> (Poly, Poly) {
        let mut q = Poly::zero();
        let mut r = Poly::zero();
        for (mono, coeff) in self.terms() {
            let (qc, rc) = (coeff.div_euclid(c), coeff.rem_euclid(c));
            if qc != 0 {
                q.terms.insert(mono.clone(), qc);
            }
            if rc != 0 {
                r.terms.insert(mono.clone(), rc);
            }
        }
        (q, r)
    }

    /// Split into `(q, r)` with `self = (coeff * mono) * q + r`.
    ///
    /// A term moves into `q` when its monomial contains `mono` and its
    /// coefficient is a multiple of `coeff`. `None` on overflow.
    pub fn split_by_monomial(&self, mono: &Monomial, coeff: i64) -> Option<(Poly, Poly)> {
        let mut q = Poly::zero();
        let mut r = Poly::zero();
        for (m, c) in self.terms() {
            match divide_monomial(m, mono) {
                Some(quotient) if !mono.is_empty() && c.checked_rem(coeff)? == 0 => {
                    q.add_term(quotient, c.checked_div(coeff)?)?;
                }
                _ => r.add_term(m.clone(), c)?,
            }
        }
        Some((q, r))
    }

    /// Check that subtracting `other` only shrinks existing coefficients toward zero.
    pub fn contains(&self, other: &Poly) -> bool {
        other.terms().all(|(mono, c)| {
            let have = self.coeff(mono);
            have.signum() == c.signum() && have.unsigned_abs() >= c.unsigned_abs()
        })
    }

    /// Inclusive value range from the atoms' vmin/vmax.
    ///
    /// `None` when an atom is unbounded or the range overflows.
    pub fn range(&self) -> Option<(i64, i64)> {
        self.terms().try_fold((0i64, 0i64), |(lo, hi), (mono, coeff)| {
            let (mlo, mhi) = monomial_range(mono)?;
            let (a, b) = (mlo.checked_mul(coeff)?, mhi.checked_mul(coeff)?);
            Some((lo.checked_add(a.min(b))?, hi.checked_add(a.max(b))?))
        })
    }
}

/// `a / b` when every atom of `b` occurs in `a` (with multiplicity).
fn divide_monomial(a: &Monomial, b: &Monomial) -> Option<Monomial> {
    let mut rest = Monomial::new();
    let mut divisor = b.iter().peekable();
    for atom in a {
        if divisor.peek().is_some_and(|d| *d == atom) {
            divisor.next();
        } else {
            rest.push(atom.clone());
        }
    }
    divisor.peek().is_none().then_some(rest)
}

fn monomial_range(mono: &Monomial) -> Option<(i64, i64)> {
    mono.iter().try_fold((1i64, 1i64), |(lo, hi), atom| {
        let (alo, ahi) = atom.0.vmin_vmax();
        if alo == i64::MIN || ahi == i64::MAX {
            return None;
        }
        let corners = [lo.checked_mul(alo)?, lo.checked_mul(ahi)?, hi.checked_mul(alo)?, hi.checked_mul(ahi)?];
        Some((corners.into_iter().min()?, corners.into_iter().max()?))
    })
}
