//! Floor semantics and concrete evaluation.

use test_case::test_case;

use tessel_dtype::DType;

use crate::expr::{floor_div, floor_mod};
use crate::{Bindings, Expr};

#[test_case(7, 2, 3, 1 ; "positive over positive")]
#[test_case(-7, 2, -4, 1 ; "negative over positive")]
#[test_case(7, -2, -4, -1 ; "positive over negative")]
#[test_case(-7, -2, 3, -1 ; "negative over negative")]
#[test_case(-8, 4, -2, 0 ; "exact negative")]
#[test_case(0, 5, 0, 0 ; "zero dividend")]
#[test_case(3, 5, 0, 3 ; "small dividend")]
#[test_case(-3, 5, -1, 2 ; "small negative dividend")]
fn test_floor_div_mod(a: i64, b: i64, quotient: i64, remainder: i64) {
    assert_eq!(floor_div(a, b), Some(quotient));
    assert_eq!(floor_mod(a, b), Some(remainder));
    assert_eq!(quotient * b + remainder, a);
}

#[test]
fn test_floor_div_mod_undefined() {
    assert_eq!(floor_div(5, 0), None);
    assert_eq!(floor_mod(5, 0), None);
    assert_eq!(floor_div(i64::MIN, -1), None);
}

#[test]
fn test_eval_arithmetic() {
    let x = Expr::var("x", DType::Int64);
    let y = Expr::var("y", DType::Int64);
    let e = x.try_mul(3).unwrap().try_add(&y.try_floordiv(4).unwrap()).unwrap().try_sub(1).unwrap();
    let bindings = Bindings::new().with(&x, 5).with(&y, -9);
    // 15 + floordiv(-9, 4) - 1 = 15 - 3 - 1
    assert_eq!(e.eval(&bindings), Some(11));
}

#[test]
fn test_eval_floormod_negative() {
    let x = Expr::var("x", DType::Int64);
    let e = x.try_floormod(-4).unwrap();
    assert_eq!(e.eval(&Bindings::new().with(&x, 7)), Some(-1));
    assert_eq!(e.eval(&Bindings::new().with(&x, -7)), Some(-3));
}

#[test]
fn test_eval_unbound_variable() {
    let x = Expr::size_var("x");
    let y = Expr::size_var("y");
    let e = x.try_add(&y).unwrap();
    assert_eq!(e.eval(&Bindings::new().with(&x, 1)), None);
}

#[test]
fn test_eval_symbolic_zero_divisor() {
    let x = Expr::size_var("x");
    let n = Expr::size_var("n");
    let e = x.try_floordiv(&n).unwrap();
    assert_eq!(e.eval(&Bindings::new().with(&x, 1).with(&n, 0)), None);
}

#[test]
fn test_eval_overflow() {
    let x = Expr::var("x", DType::Int64);
    let e = x.try_add(1).unwrap();
    assert_eq!(e.eval(&Bindings::new().with(&x, i64::MAX)), None);
}

#[test]
fn test_eval_cast_wraps() {
    let x = Expr::size_var("x");
    let e = x.cast(DType::Int8);
    assert_eq!(e.eval(&Bindings::new().with(&x, 300)), Some(44));
    assert_eq!(e.eval(&Bindings::new().with(&x, 100)), Some(100));
}

#[test]
fn test_eval_call_is_opaque() {
    let x = Expr::size_var("x");
    let e = Expr::call_extern(DType::Int32, "f", [x.clone()]);
    assert_eq!(e.eval(&Bindings::new().with(&x, 1)), None);
}

#[test]
fn test_bindings_ignore_non_variables() {
    let x = Expr::size_var("x");
    let sum = x.try_add(1).unwrap();
    let mut bindings = Bindings::new();
    bindings.bind(&sum, 10).bind(&x, 2);
    assert_eq!(bindings.get(&sum), None);
    assert_eq!(bindings.get(&x), Some(2));
    assert_eq!(sum.eval(&bindings), Some(3));
}
