//! Soundness and canonicity of the simplifier over random index expressions.

use proptest::prelude::*;

use tessel_dtype::DType;

use crate::expr::{floor_div, floor_mod};
use crate::{Bindings, Expr, simplify};

use super::generators::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Simplification never changes the value of an expression.
    #[test]
    fn simplify_preserves_value(tree in arb_index_tree(), assignment in arb_assignment()) {
        let vars = IndexVars::new();
        let expr = vars.build(&tree).unwrap();
        let bindings = vars.bindings(&assignment);
        let expected = expr.eval(&bindings);
        prop_assume!(expected.is_some());

        let simplified = simplify(&expr);
        prop_assert_eq!(simplified.eval(&bindings), expected, "{} simplified to {}", expr, simplified);
    }

    /// A simplified expression is its own canonical form.
    #[test]
    fn simplify_is_idempotent(tree in arb_index_tree()) {
        let vars = IndexVars::new();
        let once = simplify(&vars.build(&tree).unwrap());
        let twice = simplify(&once);
        prop_assert!(twice.same_as(&once), "{} resimplified to {}", once, twice);
    }

    /// `a - b` simplifies to zero exactly when both sides share a canonical form.
    #[test]
    fn self_difference_is_zero(tree in arb_index_tree()) {
        let vars = IndexVars::new();
        let expr = vars.build(&tree).unwrap();
        let diff = simplify(&expr.try_sub(&expr).unwrap());
        prop_assert_eq!(diff.as_const(), Some(0));
    }

    /// Floor division and modulo reassemble the dividend for either divisor sign.
    #[test]
    fn floor_div_mod_identity(a in -1000i64..=1000, c in arb_nonzero_divisor()) {
        let q = floor_div(a, c).unwrap();
        let r = floor_mod(a, c).unwrap();
        prop_assert_eq!(q * c + r, a);
        if c > 0 {
            prop_assert!((0..c).contains(&r));
        } else {
            prop_assert!((c + 1..=0).contains(&r));
        }
    }

    /// `fd(v, c) * c + fm(v, c)` recombines to `v` symbolically.
    #[test]
    fn div_mod_recombine_to_dividend(var in 0..NUM_VARS, c in arb_nonzero_divisor()) {
        let vars = IndexVars::new();
        let v = &vars.vars[var];
        let e = v.try_floordiv(c).unwrap().try_mul(c).unwrap().try_add(&v.try_floormod(c).unwrap()).unwrap();
        let simplified = simplify(&e);
        prop_assert!(simplified.same_as(v), "{} simplified to {}", e, simplified);
    }

    /// Constant expressions fold completely.
    #[test]
    fn constant_trees_fold(a in -50i64..=50, b in -50i64..=50, c in arb_nonzero_divisor()) {
        let ca = Expr::const_(DType::Int64, a);
        let e = ca.try_mul(b).unwrap().try_add(&ca.try_floordiv(c).unwrap()).unwrap().try_sub(&ca.try_floormod(c).unwrap()).unwrap();
        let expected = e.eval(&Bindings::new());
        prop_assert_eq!(simplify(&e).as_const(), expected);
    }
}
