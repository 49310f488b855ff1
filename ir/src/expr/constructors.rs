//! Expression constructors: leaves, casts and checked integer arithmetic.

use std::sync::Arc;

use snafu::{OptionExt, ensure};
use tessel_dtype::{AddrSpace, DType, HasDType};

use super::core::{Expr, Op};
use super::eval::wrap_to_dtype;
use super::hash_consing::next_var_token;
use crate::Result;
use crate::error::{DivisionByZeroSnafu, InvalidDTypeForBinaryOpSnafu, TypePromotionFailedSnafu};
use crate::types::{BinaryOp, Var};

/// Values that can stand in as an expression operand.
///
/// Rust integers become constants of the dtype of the expression they are
/// combined with.
pub trait IntoExpr {
    fn into_expr(self, dtype: DType) -> Arc<Expr>;
}

impl IntoExpr for Arc<Expr> {
    fn into_expr(self, _dtype: DType) -> Arc<Expr> {
        self
    }
}

impl IntoExpr for &Arc<Expr> {
    fn into_expr(self, _dtype: DType) -> Arc<Expr> {
        self.clone()
    }
}

macro_rules! impl_into_expr_for_int {
    ($($ty:ty),* $(,)?) => {
        $(impl IntoExpr for $ty {
            fn into_expr(self, dtype: DType) -> Arc<Expr> {
                Expr::const_(dtype, self as i64)
            }
        })*
    };
}

impl_into_expr_for_int!(i8, i16, i32, i64, u8, u16, u32, usize);

macro_rules! binary_arith_ops {
    ($($method:ident => $op:ident),+ $(,)?) => {
        $(
            #[track_caller]
            pub fn $method<T: IntoExpr>(self: &Arc<Self>, rhs: T) -> Result<Arc<Self>> {
                let rhs = rhs.into_expr(self.dtype());
                let (lhs, rhs, dtype) = Self::promote_and_cast(self, &rhs, BinaryOp::$op)?;
                Ok(Self::new(Op::Binary(BinaryOp::$op, lhs, rhs), dtype))
            }
        )+
    };
}

macro_rules! division_ops {
    ($($method:ident => $op:ident),+ $(,)?) => {
        $(
            #[track_caller]
            pub fn $method<T: IntoExpr>(self: &Arc<Self>, rhs: T) -> Result<Arc<Self>> {
                let rhs = rhs.into_expr(self.dtype());
                Self::check_division_by_zero(&rhs)?;
                let (lhs, rhs, dtype) = Self::promote_and_cast(self, &rhs, BinaryOp::$op)?;
                Ok(Self::new(Op::Binary(BinaryOp::$op, lhs, rhs), dtype))
            }
        )+
    };
}

impl Expr {
    // =========================================================================
    // Leaves
    // =========================================================================

    /// Integer constant, wrapped to the width of `dtype`.
    pub fn const_(dtype: DType, value: i64) -> Arc<Self> {
        let value = wrap_to_dtype(&dtype, value);
        Self::new(Op::Const(value), dtype)
    }

    /// Constant typed by its Rust scalar type, e.g. `native_const(4i64)` is `int64`.
    pub fn native_const<T: HasDType + Into<i64>>(value: T) -> Arc<Self> {
        Self::const_(T::DTYPE, value.into())
    }

    /// Variable ranging over every value of `dtype`.
    pub fn var(name: impl Into<String>, dtype: DType) -> Arc<Self> {
        let (min_val, max_val) = dtype.bounds();
        Self::bounded_var(name, dtype, min_val, max_val)
    }

    /// Non-negative `int32` variable, the usual type of a symbolic extent.
    pub fn size_var(name: impl Into<String>) -> Arc<Self> {
        Self::bounded_var(name, DType::Int32, 0, i32::MAX as i64)
    }

    /// Variable with an explicit inclusive value domain.
    pub fn bounded_var(name: impl Into<String>, dtype: DType, min_val: i64, max_val: i64) -> Arc<Self> {
        let var = Var { name: name.into(), token: next_var_token(), min_val, max_val };
        Self::new(Op::Var(var), dtype)
    }

    /// Data handle: a pointer variable to `elem` storage in `scope`.
    pub fn handle(name: impl Into<String>, elem: DType, scope: AddrSpace) -> Arc<Self> {
        Self::var(name, elem.ptr(scope))
    }

    /// Opaque external call returning `dtype`.
    pub fn call_extern(dtype: DType, name: impl Into<String>, args: impl IntoIterator<Item = Arc<Self>>) -> Arc<Self> {
        Self::new(Op::Call { name: name.into(), args: args.into_iter().collect() }, dtype)
    }

    // =========================================================================
    // Casts
    // =========================================================================

    /// Convert to `dtype`.
    ///
    /// Constants fold, same-type casts are identity, and a widening cast
    /// followed by a cast back to the source type collapses.
    pub fn cast(self: &Arc<Self>, dtype: DType) -> Arc<Self> {
        if self.dtype == dtype {
            return self.clone();
        }
        match &self.op {
            Op::Const(v) => Self::const_(dtype, *v),
            Op::Cast(src) if src.dtype == dtype && DType::can_safe_cast(&src.dtype, &self.dtype) => src.clone(),
            _ => Self::new(Op::Cast(self.clone()), dtype),
        }
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    binary_arith_ops! {
        try_add => Add,
        try_sub => Sub,
        try_mul => Mul,
    }

    division_ops! {
        try_floordiv => FloorDiv,
        try_floormod => FloorMod,
    }

    /// Rebuild a binary node from already type-checked operands.
    pub(crate) fn binary_unchecked(op: BinaryOp, lhs: Arc<Self>, rhs: Arc<Self>, dtype: DType) -> Arc<Self> {
        Self::new(Op::Binary(op, lhs, rhs), dtype)
    }

    /// Promote both operands to their common integer dtype, casting as needed.
    pub(crate) fn promote_and_cast(
        lhs: &Arc<Self>,
        rhs: &Arc<Self>,
        operation: BinaryOp,
    ) -> Result<(Arc<Self>, Arc<Self>, DType)> {
        let lhs_dtype = lhs.dtype();
        let rhs_dtype = rhs.dtype();

        ensure!(
            lhs_dtype.is_int() && rhs_dtype.is_int(),
            InvalidDTypeForBinaryOpSnafu { operation, lhs: lhs_dtype.clone(), rhs: rhs_dtype.clone() }
        );

        let target = DType::promote_index(&lhs_dtype, &rhs_dtype)
            .context(TypePromotionFailedSnafu { lhs: lhs_dtype.clone(), rhs: rhs_dtype.clone() })?;

        Ok((lhs.cast(target.clone()), rhs.cast(target.clone()), target))
    }

    /// Reject a literal zero divisor. Symbolic divisors are not checked.
    pub(crate) fn check_division_by_zero(divisor: &Arc<Self>) -> Result<()> {
        ensure!(divisor.as_const() != Some(0), DivisionByZeroSnafu);
        Ok(())
    }
}
