//! Buffer declaration, validation, strides, offsets, loads and stores.

use std::sync::Arc;

use test_case::test_case;

use tessel_dtype::{AddrSpace, DType};

use crate::error::{Error, ErrorKind};
use crate::{Bindings, Buffer, BufferType, Expr};

fn c(v: i64) -> Arc<Expr> {
    Expr::const_(DType::Int32, v)
}

fn consts(values: &[i64]) -> Vec<Arc<Expr>> {
    values.iter().map(|&v| c(v)).collect()
}

#[track_caller]
fn assert_exprs_eq(actual: &[Arc<Expr>], expected: &[Arc<Expr>]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.structurally_equal(e), "got {a}, expected {e}");
    }
}

// =========================================================================
// Declaration
// =========================================================================

#[test]
fn test_declare_defaults() {
    let m = Expr::size_var("m");
    let n = Expr::size_var("n");
    let buf = Buffer::builder().shape(vec![m.clone(), n.clone()]).build().unwrap();

    assert_eq!(buf.dtype(), DType::Float32);
    assert_eq!(buf.rank(), 2);
    assert!(buf.shape()[0].same_as(&m));
    assert!(buf.shape()[1].same_as(&n));
    assert_eq!(buf.name(), "buffer");
    assert_eq!(buf.scope(), AddrSpace::Global);
    assert_eq!(buf.data_alignment(), 64);
    assert_eq!(buf.offset_factor(), 0);
    assert_eq!(buf.buffer_type(), BufferType::Default);
    assert!(buf.axis_separators().is_empty());
    assert_eq!(buf.index_dtype(), DType::Int32);
    assert_eq!(buf.elem_offset().as_const(), Some(0));
    assert!(!buf.has_explicit_strides());
    assert_eq!(buf.data().dtype(), DType::Float32.ptr(AddrSpace::Global));
}

#[test]
fn test_declare_with_options() {
    let data = Expr::handle("A", DType::Int8, AddrSpace::Shared);
    let buf = Buffer::builder()
        .shape(consts(&[4, 8]))
        .dtype(DType::Int8)
        .name("A")
        .data(data.clone())
        .scope(AddrSpace::Shared)
        .data_alignment(16)
        .offset_factor(4)
        .buffer_type(BufferType::AutoBroadcast)
        .build()
        .unwrap();

    assert_eq!(buf.name(), "A");
    assert!(buf.data().same_as(&data));
    assert_eq!(buf.dtype(), DType::Int8);
    assert_eq!(buf.scope(), AddrSpace::Shared);
    assert_eq!(buf.data_alignment(), 16);
    assert_eq!(buf.offset_factor(), 4);
    assert_eq!(buf.buffer_type(), BufferType::AutoBroadcast);
}

#[test]
fn test_declarations_are_distinct() {
    let a = Buffer::builder().shape(consts(&[16])).build().unwrap();
    let b = Buffer::builder().shape(consts(&[16])).build().unwrap();
    assert!(a.same_as(&a.clone()));
    assert!(!a.same_as(&b));
    assert!(!a.data().same_as(b.data()));
}

#[test]
fn test_index_dtype_promotes_layout() {
    let buf = Buffer::builder()
        .shape(consts(&[4, 8]))
        .elem_offset(Expr::var("off", DType::Int64))
        .build()
        .unwrap();
    assert_eq!(buf.index_dtype(), DType::Int64);
    assert_eq!(buf.strides()[0].dtype(), DType::Int64);
}

// =========================================================================
// Validation
// =========================================================================

#[test]
fn test_empty_shape_rejected() {
    let err = Buffer::builder().shape(vec![]).build().unwrap_err();
    assert_eq!(err, Error::EmptyShape);
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_strides_rank_mismatch_rejected() {
    let err = Buffer::builder().shape(consts(&[4, 8])).strides(consts(&[1])).build().unwrap_err();
    assert_eq!(err, Error::StridesShapeMismatch { strides: 1, rank: 2 });
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test_case(&[4], &[1, 2] ; "rank one with two separators")]
#[test_case(&[4, 8], &[0] ; "zero separator")]
#[test_case(&[4, 8], &[2] ; "separator at rank")]
#[test_case(&[4, 8, 16, 32], &[2, 1] ; "decreasing")]
#[test_case(&[4, 8, 16, 32], &[1, 1] ; "repeated")]
fn test_invalid_axis_separators_rejected(shape: &[i64], separators: &[usize]) {
    let err = Buffer::builder().shape(consts(shape)).axis_separators(separators.to_vec()).build().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation, "{err}");
}

#[test]
fn test_separator_error_variants() {
    let out_of_range = Buffer::builder().shape(consts(&[1])).axis_separators(vec![1, 2]).build().unwrap_err();
    assert_eq!(out_of_range, Error::AxisSeparatorOutOfRange { separator: 1, rank: 1 });

    let decreasing = Buffer::builder().shape(consts(&[4, 8, 16, 32])).axis_separators(vec![2, 1]).build().unwrap_err();
    assert_eq!(decreasing, Error::AxisSeparatorNotIncreasing { separators: vec![2, 1] });
}

#[test]
fn test_non_integer_shape_rejected() {
    let err = Buffer::builder().shape(vec![Expr::var("f", DType::Float32)]).build().unwrap_err();
    assert_eq!(err, Error::NonIndexDType { actual: DType::Float32 });
}

#[test]
fn test_incompatible_layout_dtypes_rejected() {
    let err = Buffer::builder()
        .shape(vec![Expr::var("a", DType::Int64), Expr::var("b", DType::UInt64)])
        .build()
        .unwrap_err();
    assert!(matches!(err, Error::TypePromotionFailed { .. }));
}

// =========================================================================
// Strides
// =========================================================================

#[test]
fn test_derived_strides_row_major() {
    let m = Expr::size_var("m");
    let n = Expr::size_var("n");
    let buf = Buffer::builder().shape(vec![m, n.clone()]).build().unwrap();
    assert_exprs_eq(buf.strides(), &[n, c(1)]);

    let buf = Buffer::builder().shape(consts(&[1, 14, 14, 1024])).build().unwrap();
    assert_exprs_eq(buf.strides(), &consts(&[200704, 14336, 1024, 1]));
}

#[test]
fn test_derived_strides_per_group() {
    let buf = Buffer::builder().shape(consts(&[4, 16, 32])).axis_separators(vec![2]).build().unwrap();
    assert_eq!(buf.num_groups(), 2);
    assert_eq!(buf.groups().collect::<Vec<_>>(), vec![0..2, 2..3]);
    assert_exprs_eq(buf.strides(), &consts(&[16, 1, 1]));
}

#[test]
fn test_derived_strides_wider_than_index_dtype() {
    let buf = Buffer::builder().shape(consts(&[2, 65536, 65536])).build().unwrap();
    assert_eq!(buf.index_dtype(), DType::Int32);

    let strides = buf.strides();
    let values: Vec<_> = strides.iter().map(|s| s.eval(&Bindings::new())).collect();
    assert_eq!(values, vec![Some(1 << 32), Some(65536), Some(1)]);
    assert_ne!(strides[0].as_const(), Some(0));

    let offset = buf.offset_of(&consts(&[1, 0, 0])).unwrap();
    assert_eq!(offset[0].eval(&Bindings::new()), Some(1 << 32));
}

#[test]
fn test_explicit_strides_kept() {
    let s = Expr::size_var("s");
    let buf = Buffer::builder().shape(consts(&[4, 8])).strides(vec![s.clone(), c(1)]).build().unwrap();
    assert!(buf.has_explicit_strides());
    assert!(buf.strides()[0].same_as(&s));
}

// =========================================================================
// Offsets
// =========================================================================

#[test]
fn test_offset_of_with_elem_offset() {
    let m = Expr::size_var("m");
    let n = Expr::size_var("n");
    let buf = Buffer::builder().shape(vec![m, n.clone()]).elem_offset(c(100)).build().unwrap();
    let offset = buf.offset_of(&consts(&[2, 3])).unwrap();
    assert_exprs_eq(&offset, &[n.try_mul(2).unwrap().try_add(103).unwrap()]);
    assert_eq!(offset[0].to_string(), "n * 2 + 103");
}

#[test]
fn test_offset_of_per_group() {
    let buf = Buffer::builder().shape(consts(&[4, 16, 32])).axis_separators(vec![2]).elem_offset(c(5)).build().unwrap();
    let a = Expr::size_var("a");
    let b = Expr::size_var("b");
    let d = Expr::size_var("d");
    let offsets = buf.offset_of(&[a.clone(), b.clone(), d.clone()]).unwrap();
    let expected = [a.try_mul(16).unwrap().try_add(&b).unwrap().try_add(5).unwrap(), d];
    assert_exprs_eq(&offsets, &expected);
}

#[test]
fn test_offset_of_arity_mismatch() {
    let buf = Buffer::builder().shape(consts(&[4, 8])).name("A").build().unwrap();
    let err = buf.offset_of(&consts(&[1])).unwrap_err();
    assert_eq!(err, Error::IndexArityMismatch { buffer: "A".into(), expected: 2, actual: 1 });
    assert_eq!(err.kind(), ErrorKind::Arity);
}

// =========================================================================
// Loads and stores
// =========================================================================

#[test]
fn test_vload() {
    let m = Expr::size_var("m");
    let n = Expr::size_var("n");
    let buf = Buffer::builder().shape(vec![m, n.clone()]).elem_offset(c(100)).build().unwrap();
    let indices = consts(&[2, 3]);
    let load = buf.vload(&indices).unwrap();

    assert!(load.data.same_as(buf.data()));
    assert_eq!(load.dtype, DType::Float32);
    assert_exprs_eq(&load.indices, &indices);
    assert!(load.offset.structurally_equal(&n.try_mul(2).unwrap().try_add(103).unwrap()));
}

#[test]
fn test_vload_requires_single_group() {
    let buf = Buffer::builder().shape(consts(&[4, 16, 32])).name("B").axis_separators(vec![2]).build().unwrap();
    let err = buf.vload(&consts(&[0, 0, 0])).unwrap_err();
    assert_eq!(err, Error::MultiGroupLayout { buffer: "B".into(), groups: 2 });
    assert_eq!(err.kind(), ErrorKind::Layout);
}

#[test]
fn test_vload_arity_mismatch() {
    let buf = Buffer::builder().shape(consts(&[4, 8])).build().unwrap();
    assert_eq!(buf.vload(&consts(&[1, 2, 3])).unwrap_err().kind(), ErrorKind::Arity);
}

#[test]
fn test_vstore() {
    let buf = Buffer::builder().shape(consts(&[4, 8])).build().unwrap();
    let value = Expr::var("v", DType::Float32);
    let i = Expr::size_var("i");
    let store = buf.vstore(&[i.clone(), c(1)], &value).unwrap();
    assert!(store.value.same_as(&value));
    assert!(store.data.same_as(buf.data()));
    assert!(store.offset.structurally_equal(&i.try_mul(8).unwrap().try_add(1).unwrap()));
}

#[test]
fn test_vstore_dtype_mismatch() {
    let buf = Buffer::builder().shape(consts(&[4, 8])).build().unwrap();
    let err = buf.vstore(&consts(&[0, 0]), &Expr::var("v", DType::Int32)).unwrap_err();
    assert_eq!(err, Error::DTypeMismatch { expected: DType::Float32, actual: DType::Int32 });
    assert_eq!(err.kind(), ErrorKind::Expression);
}
