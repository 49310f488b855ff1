use snafu::Snafu;
use tessel_dtype::DType;

use crate::types::BinaryOp;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Caller-distinguishable failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ErrorKind {
    /// Malformed buffer declaration; no buffer was produced.
    Validation,
    /// Index count does not match the buffer rank.
    Arity,
    /// Operation needs a single flattened group but the buffer has several.
    Layout,
    /// Ill-typed or ill-formed expression or argument.
    Expression,
}

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // =========================================================================
    // Buffer declaration
    // =========================================================================
    /// Buffers need at least one axis.
    #[snafu(display("buffer must have at least one axis"))]
    EmptyShape,

    /// Explicit strides must match the shape rank.
    #[snafu(display("strides have {strides} entries but shape has {rank} axes"))]
    StridesShapeMismatch { strides: usize, rank: usize },

    /// Axis separator outside `(0, rank)`.
    #[snafu(display("axis separator {separator} is outside (0, {rank})"))]
    AxisSeparatorOutOfRange { separator: usize, rank: usize },

    /// Axis separators must be strictly increasing.
    #[snafu(display("axis separators {separators:?} are not strictly increasing"))]
    AxisSeparatorNotIncreasing { separators: Vec<usize> },

    // =========================================================================
    // Buffer access
    // =========================================================================
    /// Wrong number of indices for the buffer rank.
    #[snafu(display("expected {expected} indices for buffer '{buffer}', got {actual}"))]
    IndexArityMismatch { buffer: String, expected: usize, actual: usize },

    /// Operation requires the buffer to flatten into a single group.
    #[snafu(display("buffer '{buffer}' flattens into {groups} groups, expected 1"))]
    MultiGroupLayout { buffer: String, groups: usize },

    // =========================================================================
    // Expressions
    // =========================================================================
    /// Division or modulo by literal zero.
    #[snafu(display("division by zero"))]
    DivisionByZero,

    /// No common integer type for the operands.
    #[snafu(display("type promotion failed: no common index type for {lhs} and {rhs}"))]
    TypePromotionFailed { lhs: DType, rhs: DType },

    /// Index arithmetic on a non-integer operand.
    #[snafu(display("invalid dtypes for {operation}: {lhs} and {rhs}"))]
    InvalidDTypeForBinaryOp { operation: BinaryOp, lhs: DType, rhs: DType },

    /// Value dtype differs from the one required.
    #[snafu(display("dtype mismatch: expected {expected}, got {actual}"))]
    DTypeMismatch { expected: DType, actual: DType },

    /// Expression used as an index or extent is not integer-typed.
    #[snafu(display("expected an integer index dtype, got {actual}"))]
    NonIndexDType { actual: DType },

    /// Access mode string contains something other than `r`/`w`.
    #[snafu(display("invalid access mode '{mode}': expected a combination of 'r' and 'w'"))]
    InvalidAccessMode { mode: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyShape
            | Self::StridesShapeMismatch { .. }
            | Self::AxisSeparatorOutOfRange { .. }
            | Self::AxisSeparatorNotIncreasing { .. } => ErrorKind::Validation,
            Self::IndexArityMismatch { .. } => ErrorKind::Arity,
            Self::MultiGroupLayout { .. } => ErrorKind::Layout,
            Self::DivisionByZero
            | Self::TypePromotionFailed { .. }
            | Self::InvalidDTypeForBinaryOp { .. }
            | Self::DTypeMismatch { .. }
            | Self::NonIndexDType { .. }
            | Self::InvalidAccessMode { .. } => ErrorKind::Expression,
        }
    }
}
