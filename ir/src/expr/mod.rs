//! Hash-consed integer index expressions.
//!
//! # Module Organization
//!
//! - [`core`] - `Expr` node, operations and structural queries
//! - [`hash_consing`] - interning table shared across threads
//! - [`constructors`] - leaves, casts and checked arithmetic
//! - [`eval`] - evaluation under variable bindings
//! - [`range_eval`] - vmin/vmax range analysis

pub mod constructors;
pub mod core;
mod display;
pub mod eval;
pub mod hash_consing;
pub mod range_eval;

pub use self::core::{Expr, ExprKey, Op};
pub use constructors::IntoExpr;
pub use eval::{Bindings, floor_div, floor_mod};
pub use hash_consing::{gc_dead_refs, live_expr_count};
