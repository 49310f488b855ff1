//! Access pointers: data handle plus offset, extent and read/write intent.

use std::sync::Arc;

use bon::bon;
use enumset::EnumSet;
use snafu::ensure;
use tessel_dtype::DType;

use super::Buffer;
use crate::Result;
use crate::error::{InvalidAccessModeSnafu, NonIndexDTypeSnafu};
use crate::expr::Expr;

/// Access intent flags. As a mask, `Read` is bit 1 and `Write` is bit 2.
#[derive(Debug, Hash, PartialOrd, Ord)]
#[derive(enumset::EnumSetType, strum::Display)]
#[strum(serialize_all = "lowercase")]
#[enumset(repr = "u32")]
pub enum Access {
    Read,
    Write,
}

pub type AccessMask = EnumSet<Access>;

impl Access {
    /// Parse a short access mode such as `"r"`, `"w"` or `"rw"`.
    ///
    /// Flags may appear in any order but at most once each.
    pub fn parse_mask(mode: &str) -> Result<AccessMask> {
        let mut mask = AccessMask::empty();
        for ch in mode.chars() {
            let flag = match ch {
                'r' => Access::Read,
                'w' => Access::Write,
                _ => return InvalidAccessModeSnafu { mode }.fail(),
            };
            ensure!(mask.insert(flag), InvalidAccessModeSnafu { mode });
        }
        ensure!(!mask.is_empty(), InvalidAccessModeSnafu { mode });
        Ok(mask)
    }
}

/// Pointer to a buffer region, as consumed by code generation.
#[derive(Debug, Clone)]
pub struct AccessPtr {
    pub data: Arc<Expr>,
    /// Element dtype of the buffer.
    pub dtype: DType,
    /// Element offset of the region start.
    pub offset: Arc<Expr>,
    /// Number of elements in the region.
    pub extent: Arc<Expr>,
    pub mask: AccessMask,
}

impl AccessPtr {
    /// Integer encoding of the mask (`READ = 1`, `WRITE = 2`).
    pub fn mask_bits(&self) -> u32 {
        self.mask.as_repr()
    }
}

#[bon]
impl Buffer {
    /// Build an access pointer for `mode`.
    ///
    /// The region starts at `elem_offset + offset`. Without an explicit
    /// `extent` it runs to the end of the buffer: `strides[0] * shape[0] - offset`
    /// with explicit strides, `product(shape) - offset` otherwise.
    #[builder]
    pub fn access_ptr(
        &self,
        #[builder(start_fn)] mode: &str,
        offset: Option<Arc<Expr>>,
        extent: Option<Arc<Expr>>,
    ) -> Result<AccessPtr> {
        let mask = Access::parse_mask(mode)?;
        let offset = offset.unwrap_or_else(|| Expr::const_(self.index_dtype(), 0));
        let base = self.elem_offset().try_add(&offset)?.simplify();

        let extent = match extent {
            Some(extent) => {
                ensure!(extent.dtype().is_int(), NonIndexDTypeSnafu { actual: extent.dtype() });
                extent.simplify()
            }
            None => {
                let shape = self.shape();
                let total = if self.has_explicit_strides() {
                    self.strides()[0].try_mul(&shape[0])?
                } else {
                    shape[1..].iter().try_fold(shape[0].clone(), |acc, dim| acc.try_mul(dim))?
                };
                total.try_sub(&offset)?.simplify()
            }
        };

        Ok(AccessPtr { data: self.data().clone(), dtype: self.dtype(), offset: base, extent, mask })
    }
}
