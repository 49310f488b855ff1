//! Operator and variable descriptors shared across the IR.

/// Binary integer operators.
///
/// Division and modulo use floor semantics: the quotient rounds toward
/// negative infinity and the remainder takes the sign of the divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::IntoStaticStr, strum::EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    FloorDiv,
    FloorMod,
}

impl BinaryOp {
    pub const fn is_commutative(&self) -> bool {
        matches!(self, Self::Add | Self::Mul)
    }

    /// Infix symbol, `None` for the function-style floor operators.
    pub const fn symbol(&self) -> Option<&'static str> {
        match self {
            Self::Add => Some("+"),
            Self::Sub => Some("-"),
            Self::Mul => Some("*"),
            Self::FloorDiv | Self::FloorMod => None,
        }
    }
}

/// A free symbolic variable.
///
/// `token` is a process-unique identity: two variables with the same name are
/// still distinct. `min_val..=max_val` is the declared value domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    pub name: String,
    pub token: u64,
    pub min_val: i64,
    pub max_val: i64,
}
