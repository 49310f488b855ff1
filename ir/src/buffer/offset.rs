//! Flat offsets, loads and stores.

use std::sync::Arc;

use snafu::ensure;
use tessel_dtype::DType;

use super::Buffer;
use crate::Result;
use crate::error::{DTypeMismatchSnafu, IndexArityMismatchSnafu, MultiGroupLayoutSnafu};
use crate::expr::Expr;

/// Load of one element at a flat offset.
#[derive(Debug, Clone)]
pub struct BufferLoad {
    pub data: Arc<Expr>,
    pub dtype: DType,
    /// Indices as supplied by the caller.
    pub indices: Vec<Arc<Expr>>,
    pub offset: Arc<Expr>,
}

/// Store of `value` at a flat offset.
#[derive(Debug, Clone)]
pub struct BufferStore {
    pub data: Arc<Expr>,
    pub value: Arc<Expr>,
    pub indices: Vec<Arc<Expr>>,
    pub offset: Arc<Expr>,
}

impl Buffer {
    /// Simplified flat offset of `indices`, one expression per axis group.
    ///
    /// Group `g` is `sum(indices[i] * strides[i])` over its axes; the first
    /// group also adds `elem_offset`.
    pub fn offset_of(&self, indices: &[Arc<Expr>]) -> Result<Vec<Arc<Expr>>> {
        ensure!(
            indices.len() == self.rank(),
            IndexArityMismatchSnafu { buffer: self.name(), expected: self.rank(), actual: indices.len() }
        );

        let strides = self.strides();
        let zero = Expr::const_(self.index_dtype(), 0);
        self.groups()
            .enumerate()
            .map(|(g, axes)| -> Result<Arc<Expr>> {
                let base = if g == 0 { self.elem_offset().clone() } else { zero.clone() };
                let sum = axes.into_iter().try_fold(base, |acc, axis| acc.try_add(&indices[axis].try_mul(&strides[axis])?))?;
                Ok(sum.simplify())
            })
            .collect()
    }

    /// Offset of `indices` in a buffer that flattens to a single group.
    fn single_offset(&self, indices: &[Arc<Expr>]) -> Result<Arc<Expr>> {
        ensure!(self.num_groups() == 1, MultiGroupLayoutSnafu { buffer: self.name(), groups: self.num_groups() });
        let mut offsets = self.offset_of(indices)?;
        Ok(offsets.swap_remove(0))
    }

    pub fn vload(&self, indices: &[Arc<Expr>]) -> Result<BufferLoad> {
        let offset = self.single_offset(indices)?;
        Ok(BufferLoad { data: self.data().clone(), dtype: self.dtype(), indices: indices.to_vec(), offset })
    }

    /// Store `value`, whose dtype must be the buffer element dtype.
    pub fn vstore(&self, indices: &[Arc<Expr>], value: &Arc<Expr>) -> Result<BufferStore> {
        ensure!(value.dtype() == self.dtype(), DTypeMismatchSnafu { expected: self.dtype(), actual: value.dtype() });
        let offset = self.single_offset(indices)?;
        Ok(BufferStore { data: self.data().clone(), value: value.clone(), indices: indices.to_vec(), offset })
    }
}
