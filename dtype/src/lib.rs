//! Element types for the tessel buffer IR.
//!
//! Buffers carry a scalar element type, index expressions carry an integer
//! type, and data handles carry a pointer type tagged with the storage scope
//! the buffer lives in.

use std::fmt;
use std::str::FromStr;

pub mod cast;
pub mod ext;


pub use ext::HasDType;

/// Storage scope of a buffer (and of the pointer that addresses it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[derive(strum::EnumString, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddrSpace {
    /// Device global memory.
    #[default]
    Global,
    /// Memory shared by a thread group.
    Shared,
    /// Per-thread memory.
    Local,
}

/// Scalar data types.
///
/// Discriminants order the promotion priority: lower is more specific.
#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(strum::EnumCount, strum::EnumIter, strum::VariantArray)]
#[derive(strum::EnumString, strum::Display, strum::IntoStaticStr)]
#[derive(enumset::EnumSetType)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[enumset(repr = "u32")]
pub enum ScalarDType {
    Bool = 0,

    // Interleaved signed/unsigned for correct LUB priority
    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Int64 = 7,
    UInt64 = 8,

    Float16 = 9,
    BFloat16 = 10,
    Float32 = 11,
    Float64 = 12,

    /// Machine index type used for address arithmetic (64-bit signed).
    Index = 13,
}

/// Data type: a scalar element or a pointer to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DType {
    Scalar(ScalarDType),

    /// Handle to backing storage of `base` elements in `addrspace`.
    Ptr { base: Box<DType>, addrspace: AddrSpace },
}

impl ScalarDType {
    pub const fn bits(&self) -> u32 {
        match self {
            Self::Bool => 1,
            Self::Int8 | Self::UInt8 => 8,
            Self::Int16 | Self::UInt16 | Self::Float16 | Self::BFloat16 => 16,
            Self::Int32 | Self::UInt32 | Self::Float32 => 32,
            Self::Int64 | Self::UInt64 | Self::Float64 | Self::Index => 64,
        }
    }

    pub const fn bytes(&self) -> usize {
        match self {
            Self::Bool => 1,
            _ => (self.bits() / 8) as usize,
        }
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub const fn is_signed(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Index)
    }

    pub const fn is_unsigned(&self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    pub const fn is_int(&self) -> bool {
        self.is_signed() || self.is_unsigned()
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64)
    }

    /// Smallest representable value, clamped to the `i64` domain.
    pub const fn min_value(&self) -> i64 {
        match self {
            Self::Int8 => i8::MIN as i64,
            Self::Int16 => i16::MIN as i64,
            Self::Int32 => i32::MIN as i64,
            Self::Int64 | Self::Index => i64::MIN,
            Self::Bool | Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 => 0,
            // Floats are not index types; report the widest domain.
            Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64 => i64::MIN,
        }
    }

    /// Largest representable value, clamped to the `i64` domain.
    pub const fn max_value(&self) -> i64 {
        match self {
            Self::Bool => 1,
            Self::Int8 => i8::MAX as i64,
            Self::UInt8 => u8::MAX as i64,
            Self::Int16 => i16::MAX as i64,
            Self::UInt16 => u16::MAX as i64,
            Self::Int32 => i32::MAX as i64,
            Self::UInt32 => u32::MAX as i64,
            Self::Int64 | Self::UInt64 | Self::Index => i64::MAX,
            Self::Float16 | Self::BFloat16 | Self::Float32 | Self::Float64 => i64::MAX,
        }
    }
}

impl From<ScalarDType> for DType {
    fn from(scalar: ScalarDType) -> Self {
        Self::Scalar(scalar)
    }
}

impl DType {
    /// Create a pointer type addressing elements of this dtype.
    pub fn ptr(self, addrspace: AddrSpace) -> Self {
        Self::Ptr { base: Box::new(self), addrspace }
    }

    pub fn scalar(&self) -> Option<ScalarDType> {
        match self {
            Self::Scalar(s) => Some(*s),
            Self::Ptr { .. } => None,
        }
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self, Self::Ptr { .. })
    }

    /// Element type behind a pointer, `None` for scalars.
    pub fn pointee(&self) -> Option<&DType> {
        match self {
            Self::Ptr { base, .. } => Some(base),
            Self::Scalar(_) => None,
        }
    }

    pub fn bytes(&self) -> usize {
        match self {
            Self::Scalar(s) => s.bytes(),
            Self::Ptr { .. } => 8,
        }
    }

    pub fn is_bool(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_bool())
    }

    pub fn is_int(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_int())
    }

    pub fn is_float(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_float())
    }

    pub fn is_signed(&self) -> bool {
        self.scalar().is_some_and(|s| s.is_signed())
    }

    /// Inclusive `(min, max)` value range for integer types.
    ///
    /// Pointers and floats report the full `i64` domain.
    pub fn bounds(&self) -> (i64, i64) {
        match self {
            Self::Scalar(s) if s.is_int() || s.is_bool() => (s.min_value(), s.max_value()),
            _ => (i64::MIN, i64::MAX),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::Ptr { base, addrspace } => write!(f, "ptr<{base}, {addrspace}>"),
        }
    }
}

impl FromStr for DType {
    type Err = strum::ParseError;

    /// Parse a scalar type name such as `"float32"` or `"int64"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScalarDType::from_str(s).map(Self::Scalar)
    }
}

// Convenient constructors and aliases for common scalar types
#[allow(non_upper_case_globals)]
impl DType {
    pub const Bool: Self = Self::Scalar(ScalarDType::Bool);
    pub const Int8: Self = Self::Scalar(ScalarDType::Int8);
    pub const Int16: Self = Self::Scalar(ScalarDType::Int16);
    pub const Int32: Self = Self::Scalar(ScalarDType::Int32);
    pub const Int64: Self = Self::Scalar(ScalarDType::Int64);
    pub const UInt8: Self = Self::Scalar(ScalarDType::UInt8);
    pub const UInt16: Self = Self::Scalar(ScalarDType::UInt16);
    pub const UInt32: Self = Self::Scalar(ScalarDType::UInt32);
    pub const UInt64: Self = Self::Scalar(ScalarDType::UInt64);
    pub const Float16: Self = Self::Scalar(ScalarDType::Float16);
    pub const BFloat16: Self = Self::Scalar(ScalarDType::BFloat16);
    pub const Float32: Self = Self::Scalar(ScalarDType::Float32);
    pub const Float64: Self = Self::Scalar(ScalarDType::Float64);
    pub const Index: Self = Self::Scalar(ScalarDType::Index);
}
