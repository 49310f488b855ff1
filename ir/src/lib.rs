//! Buffer indexing IR for the tessel compiler.
//!
//! This crate models multi-dimensional buffers and computes, symbolically, the
//! flat offsets and access regions implied by multi-dimensional indices.
//!
//! # Module Organization
//!
//! - [`types`] - operator and variable descriptors
//! - [`expr`] - hash-consed integer index expressions
//! - [`simplify`] - canonicalizing simplifier (div/mod recomposition)
//! - [`buffer`] - buffer descriptors, offsets, access pointers, flattening
//! - [`error`] - error types and result handling

pub mod buffer;
pub mod error;
pub mod expr;
pub mod simplify;
pub mod types;


pub use buffer::{Access, AccessMask, AccessPtr, Buffer, BufferLoad, BufferStore, BufferType};
pub use error::{Error, ErrorKind, Result};
pub use expr::{Bindings, Expr, ExprKey, IntoExpr, Op};
pub use simplify::{SimplifyConfig, Simplifier, prove_equal, simplify};
pub use types::{BinaryOp, Var};

pub use tessel_dtype::{AddrSpace, DType, ScalarDType};
