//! Flattening to one physical axis per axis group.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::{Buffer, BufferNode, index_binary};
use crate::expr::Expr;
use crate::types::BinaryOp;

impl Buffer {
    /// Collapse every axis group into a single axis.
    ///
    /// The result shares `data`, dtype, `elem_offset`, name and scope with
    /// this buffer, uses implicit strides, and renumbers the separators to
    /// `1..groups`. Returns this very descriptor when it is already flat:
    /// implicit strides and a single axis per group.
    pub fn get_flattened_buffer(&self) -> Buffer {
        if !self.has_explicit_strides() && self.groups().all(|group| group.len() == 1) {
            debug!(buffer.name = %self.name(), rank = self.rank(), "buffer already flat");
            return self.clone();
        }

        let dtype = self.index_dtype();
        let shape: Vec<Arc<Expr>> = self
            .groups()
            .map(|group| {
                let first = group.start;
                if self.has_explicit_strides() {
                    index_binary(BinaryOp::Mul, &self.strides()[first], &self.shape()[first], &dtype).simplify()
                } else {
                    self.shape()[group]
                        .iter()
                        .cloned()
                        .reduce(|acc, dim| index_binary(BinaryOp::Mul, &acc, &dim, &dtype))
                        .map(|product| product.simplify())
                        .unwrap_or_else(|| Expr::const_(dtype.clone(), 1))
                }
            })
            .collect();

        let axis_separators: Vec<usize> = (1..shape.len()).collect();
        debug!(buffer.name = %self.name(), rank = self.rank(), groups = shape.len(), "flattened buffer");

        Buffer(Arc::new(BufferNode {
            name: self.0.name.clone(),
            data: self.0.data.clone(),
            dtype: self.0.dtype.clone(),
            shape,
            strides: Vec::new(),
            elem_offset: self.0.elem_offset.clone(),
            scope: self.0.scope,
            data_alignment: self.0.data_alignment,
            offset_factor: self.0.offset_factor,
            buffer_type: self.0.buffer_type,
            axis_separators,
            index_dtype: dtype,
            derived_strides: OnceLock::new(),
        }))
    }
}
