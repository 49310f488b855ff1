use super::*;
use enumset::EnumSet;

impl ScalarDType {
    const fn promotion_lattice(self) -> &'static [Self] {
        use ScalarDType::*;
        match self {
            Bool => &[Int8, UInt8],
            Int8 => &[Int16],
            Int16 => &[Int32],
            Int32 => &[Int64],
            Int64 => &[Float16, BFloat16],
            UInt8 => &[Int16, UInt16],
            UInt16 => &[Int32, UInt32],
            UInt32 => &[Int64, UInt64],
            UInt64 => &[Float16, BFloat16],
            Float16 => &[Float32],
            BFloat16 => &[Float32],
            Float32 => &[Float64],
            Float64 | Index => &[],
        }
    }

    fn get_recursive_parents(self) -> EnumSet<Self> {
        self.promotion_lattice()
            .iter()
            .fold(EnumSet::only(self), |dtypes, &parent| dtypes.union(parent.get_recursive_parents()))
    }

    /// Check if every value of `self` is representable in `to`.
    pub fn can_safe_cast(self, to: Self) -> bool {
        if self == to || matches!(self, Self::Bool) {
            return true;
        }

        // Any integer fits the 64-bit index type except the upper half of uint64.
        if matches!(to, Self::Index) {
            return self.is_int() && self != Self::UInt64;
        }
        if matches!(self, Self::Index) {
            return matches!(to, Self::Int64);
        }

        self.get_recursive_parents().contains(to)
    }
}

impl DType {
    /// Check if casting from `from` to `to` preserves every value.
    pub fn can_safe_cast(from: &Self, to: &Self) -> bool {
        match (from.scalar(), to.scalar()) {
            (Some(from), Some(to)) => from.can_safe_cast(to),
            _ => from == to,
        }
    }

    /// Find the least upper bound type for a set of dtypes.
    ///
    /// Returns the most specific type every input can be safely cast to, or
    /// `None` if the lattice has no common parent (or a pointer is involved).
    pub fn least_upper_dtype(dtypes: &[Self]) -> Option<Self> {
        let first = dtypes.first()?;
        if first.is_ptr() {
            return dtypes.iter().all(|d| d == first).then(|| first.clone());
        }

        let scalar = dtypes
            .iter()
            .map(|d| d.scalar().map(ScalarDType::get_recursive_parents))
            .reduce(|lhs, rhs| Some(lhs?.intersection(rhs?)))??
            .iter()
            .min()?;

        Some(DType::Scalar(scalar))
    }

    /// Common dtype for integer index arithmetic.
    ///
    /// `index` absorbs every integer type; otherwise the lattice least upper
    /// bound is taken and must itself be an integer type.
    pub fn promote_index(lhs: &Self, rhs: &Self) -> Option<Self> {
        if !lhs.is_int() || !rhs.is_int() {
            return None;
        }
        if lhs == rhs {
            return Some(lhs.clone());
        }
        if *lhs == DType::Index || *rhs == DType::Index {
            return Some(DType::Index);
        }

        Self::least_upper_dtype(&[lhs.clone(), rhs.clone()]).filter(DType::is_int)
    }
}
