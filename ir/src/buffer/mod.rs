//! Buffer descriptors.
//!
//! A [`Buffer`] describes a multi-dimensional view of backing storage: shape,
//! optional explicit strides, element offset, element dtype, the data handle
//! naming the storage, and axis separators partitioning the axes into groups
//! that flatten independently. Descriptors are immutable and cheap to clone;
//! every operation returns new expressions or a new descriptor.

use std::ops::Range;
use std::sync::{Arc, OnceLock};

use bon::bon;
use snafu::ensure;
use tessel_dtype::{AddrSpace, DType};
use tracing::debug;

use crate::Result;
use crate::error::{
    AxisSeparatorNotIncreasingSnafu, AxisSeparatorOutOfRangeSnafu, EmptyShapeSnafu, NonIndexDTypeSnafu,
    StridesShapeMismatchSnafu, TypePromotionFailedSnafu,
};
use crate::expr::Expr;
use crate::types::BinaryOp;

pub mod access;
pub mod flatten;
pub mod offset;

pub use access::{Access, AccessMask, AccessPtr};
pub use offset::{BufferLoad, BufferStore};

/// How the buffer participates in broadcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum BufferType {
    #[default]
    Default,
    /// Axes of extent one are broadcast instead of indexed.
    AutoBroadcast,
}

#[derive(derive_more::Debug)]
pub struct BufferNode {
    pub(crate) name: String,
    pub(crate) data: Arc<Expr>,
    pub(crate) dtype: DType,
    pub(crate) shape: Vec<Arc<Expr>>,
    /// Empty when strides are derived from the shape.
    pub(crate) strides: Vec<Arc<Expr>>,
    pub(crate) elem_offset: Arc<Expr>,
    pub(crate) scope: AddrSpace,
    pub(crate) data_alignment: usize,
    pub(crate) offset_factor: usize,
    pub(crate) buffer_type: BufferType,
    pub(crate) axis_separators: Vec<usize>,
    pub(crate) index_dtype: DType,
    #[debug(skip)]
    pub(crate) derived_strides: OnceLock<Vec<Arc<Expr>>>,
}

/// Shared handle to an immutable buffer descriptor.
#[derive(Debug, Clone)]
pub struct Buffer(pub(crate) Arc<BufferNode>);

#[bon]
impl Buffer {
    /// Declare a buffer, validating its layout.
    ///
    /// Without a `data` handle a fresh pointer variable named after the buffer
    /// is created. `elem_offset` defaults to zero in the index dtype.
    #[builder]
    pub fn new(
        shape: Vec<Arc<Expr>>,
        #[builder(default = DType::Float32)] dtype: DType,
        #[builder(into, default = String::from("buffer"))] name: String,
        data: Option<Arc<Expr>>,
        #[builder(default)] strides: Vec<Arc<Expr>>,
        elem_offset: Option<Arc<Expr>>,
        #[builder(default)] scope: AddrSpace,
        #[builder(default = 64)] data_alignment: usize,
        #[builder(default = 0)] offset_factor: usize,
        #[builder(default)] buffer_type: BufferType,
        #[builder(default)] axis_separators: Vec<usize>,
    ) -> Result<Self> {
        let rank = shape.len();
        ensure!(rank > 0, EmptyShapeSnafu);
        ensure!(strides.is_empty() || strides.len() == rank, StridesShapeMismatchSnafu { strides: strides.len(), rank });
        validate_axis_separators(&axis_separators, rank)?;

        let index_dtype = promote_all(shape.iter().chain(strides.iter()).chain(elem_offset.iter()))?;
        let elem_offset = elem_offset.unwrap_or_else(|| Expr::const_(index_dtype.clone(), 0));
        let data = data.unwrap_or_else(|| Expr::handle(name.clone(), dtype.clone(), scope));

        debug!(
            buffer.name = %name,
            rank,
            groups = axis_separators.len() + 1,
            explicit_strides = !strides.is_empty(),
            "declared buffer"
        );

        Ok(Self(Arc::new(BufferNode {
            name,
            data,
            dtype,
            shape,
            strides,
            elem_offset,
            scope,
            data_alignment,
            offset_factor,
            buffer_type,
            axis_separators,
            index_dtype,
            derived_strides: OnceLock::new(),
        })))
    }
}

impl Buffer {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Handle naming the backing storage.
    pub fn data(&self) -> &Arc<Expr> {
        &self.0.data
    }

    pub fn dtype(&self) -> DType {
        self.0.dtype.clone()
    }

    pub fn shape(&self) -> &[Arc<Expr>] {
        &self.0.shape
    }

    pub fn rank(&self) -> usize {
        self.0.shape.len()
    }

    pub fn elem_offset(&self) -> &Arc<Expr> {
        &self.0.elem_offset
    }

    pub fn scope(&self) -> AddrSpace {
        self.0.scope
    }

    pub fn data_alignment(&self) -> usize {
        self.0.data_alignment
    }

    pub fn offset_factor(&self) -> usize {
        self.0.offset_factor
    }

    pub fn buffer_type(&self) -> BufferType {
        self.0.buffer_type
    }

    pub fn axis_separators(&self) -> &[usize] {
        &self.0.axis_separators
    }

    /// Promoted integer dtype of the layout expressions.
    pub fn index_dtype(&self) -> DType {
        self.0.index_dtype.clone()
    }

    pub fn has_explicit_strides(&self) -> bool {
        !self.0.strides.is_empty()
    }

    /// Explicit strides, or row-major strides derived per axis group.
    ///
    /// Each group is strided independently starting from 1 at its innermost
    /// axis, so `stride[i] = product(shape[i+1..group_end])`.
    pub fn strides(&self) -> &[Arc<Expr>] {
        if self.has_explicit_strides() {
            return &self.0.strides;
        }
        self.0.derived_strides.get_or_init(|| self.derive_strides())
    }

    /// Identity comparison of descriptors.
    pub fn same_as(&self, other: &Buffer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Axis ranges of the flattening groups, outermost first.
    pub fn groups(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        let bounds: Vec<usize> =
            std::iter::once(0).chain(self.0.axis_separators.iter().copied()).chain(std::iter::once(self.rank())).collect();
        (0..bounds.len() - 1).map(move |i| bounds[i]..bounds[i + 1])
    }

    pub fn num_groups(&self) -> usize {
        self.0.axis_separators.len() + 1
    }

    fn derive_strides(&self) -> Vec<Arc<Expr>> {
        let dtype = &self.0.index_dtype;
        let mut strides = vec![Expr::const_(dtype.clone(), 1); self.rank()];
        for group in self.groups() {
            let mut acc = Expr::const_(dtype.clone(), 1);
            for axis in group.rev() {
                strides[axis] = acc.clone();
                acc = index_binary(BinaryOp::Mul, &acc, &self.0.shape[axis], dtype).simplify();
            }
        }
        strides
    }
}

fn validate_axis_separators(separators: &[usize], rank: usize) -> Result<()> {
    for &separator in separators {
        ensure!(separator > 0 && separator < rank, AxisSeparatorOutOfRangeSnafu { separator, rank });
    }
    ensure!(
        separators.windows(2).all(|w| w[0] < w[1]),
        AxisSeparatorNotIncreasingSnafu { separators: separators.to_vec() }
    );
    Ok(())
}

/// Common integer dtype of all layout expressions; `int32` when there are none.
fn promote_all<'a>(exprs: impl Iterator<Item = &'a Arc<Expr>>) -> Result<DType> {
    let mut dtype: Option<DType> = None;
    for expr in exprs {
        let actual = expr.dtype();
        ensure!(actual.is_int(), NonIndexDTypeSnafu { actual });
        dtype = Some(match dtype {
            None => actual,
            Some(current) => DType::promote_index(&current, &actual)
                .ok_or_else(|| TypePromotionFailedSnafu { lhs: current.clone(), rhs: actual.clone() }.build())?,
        });
    }
    Ok(dtype.unwrap_or(DType::Int32))
}

/// Binary node over operands already known to promote to `dtype`.
pub(crate) fn index_binary(op: BinaryOp, lhs: &Arc<Expr>, rhs: &Arc<Expr>, dtype: &DType) -> Arc<Expr> {
    Expr::binary_unchecked(op, lhs.cast(dtype.clone()), rhs.cast(dtype.clone()), dtype.clone())
}
