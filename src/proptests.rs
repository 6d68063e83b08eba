//! Property-based tests for the reducer.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::{
        algebra::{
            derivative, ops, reduce_to_fixed_point, BinaryOperation,
            Expression, Function, Parameter,
        },
        config::Config,
    };

    const SAMPLES: [f64; 5] = [0.5, 0.75, 1.1, 1.25, 1.5];

    fn x() -> Parameter { Parameter::named("x") }

    fn leaf() -> impl Strategy<Value = Expression> {
        prop_oneof![
            (1..=3_i32).prop_map(|k| Expression::Constant(f64::from(k))),
            Just(Expression::Parameter(x())),
        ]
    }

    // Small powers of leaves, so values stay in a range where floating
    // point error doesn't swamp the comparison
    fn atom() -> impl Strategy<Value = Expression> {
        prop_oneof![
            3 => leaf(),
            1 => (leaf(), 2..=3_i32).prop_map(|(base, k)| {
                base.pow(Expression::Constant(f64::from(k)))
            }),
        ]
    }

    fn tree() -> impl Strategy<Value = Expression> {
        atom().prop_recursive(3, 16, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l + r),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l - r),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l * r),
                (inner.clone(), inner.clone()).prop_map(|(l, r)| l / r),
                (inner.clone(), 2..=3_i32).prop_map(|(base, k)| {
                    base.pow(Expression::Constant(f64::from(k)))
                }),
                inner.clone().prop_map(|e| -e),
                inner.clone().prop_map(|e| call(Function::Sine, e)),
                inner.prop_map(|e| call(Function::Cosine, e)),
            ]
        })
    }

    fn call(function: Function, argument: Expression) -> Expression {
        Expression::apply(function, vec![argument]).unwrap()
    }

    /// Roughly how big the intermediate values get, used to scale the
    /// tolerance. Dividing by something close to zero blows up whatever
    /// rounding error the denominator had.
    fn magnitude(expr: &Expression, value: f64) -> f64 {
        match expr {
            Expression::Parameter(_) => value.abs(),
            Expression::Constant(k) => k.abs(),
            Expression::Binary { left, right, op } => {
                let l = magnitude(left, value);
                let r = magnitude(right, value);

                match op {
                    BinaryOperation::Plus | BinaryOperation::Minus => l + r,
                    BinaryOperation::Times => l * r,
                    BinaryOperation::Divide => {
                        let denominator =
                            ops::evaluate(right, &x(), value).unwrap().abs();
                        l / denominator * (1.0 + r / denominator)
                    },
                    BinaryOperation::Power => {
                        let k = ops::evaluate(right, &x(), value).unwrap();
                        l.powf(k) * (1.0 + k.abs())
                    },
                }
            },
            Expression::Negate(inner) => magnitude(inner, value),
            Expression::FunctionCall { arguments, .. } => {
                // sin and cos are bounded but their arguments' error isn't
                1.0 + arguments
                    .iter()
                    .map(|arg| magnitude(arg, value))
                    .sum::<f64>()
            },
        }
    }

    fn assert_same_values(
        original: &Expression,
        other: &Expression,
    ) -> Result<(), TestCaseError> {
        for &sample in &SAMPLES {
            let expected = ops::evaluate(original, &x(), sample).unwrap();
            let scale = magnitude(original, sample);
            if !expected.is_finite() || !scale.is_finite() {
                // the sample landed on a singularity
                continue;
            }

            let got = ops::evaluate(other, &x(), sample).unwrap();
            let tolerance = 1e-9 * (1.0 + scale);

            prop_assert!(
                (expected - got).abs() <= tolerance,
                "{} = {} but {} = {} at x = {}",
                original,
                expected,
                other,
                got,
                sample,
            );
        }

        Ok(())
    }

    proptest! {
        #[test]
        fn reduction_is_idempotent(t in tree()) {
            let config = Config::default();

            let once = reduce_to_fixed_point(&t, &config);
            let twice = reduce_to_fixed_point(&once.expression, &config);

            prop_assert!(
                !twice.changed,
                "{} became {}",
                once.expression,
                twice.expression
            );
        }

        #[test]
        fn reduction_preserves_the_value(t in tree()) {
            let reduced = reduce_to_fixed_point(&t, &Config::default());

            assert_same_values(&t, &reduced.expression)?;
        }

        #[test]
        fn sequential_reduction_matches_parallel(t in tree()) {
            let parallel = reduce_to_fixed_point(&t, &Config::default());
            let sequential =
                reduce_to_fixed_point(&t, &Config::default().sequential());

            prop_assert_eq!(parallel, sequential);
        }

        #[test]
        fn reduced_derivatives_keep_their_value(t in tree()) {
            let raw = derivative(&t, &x()).unwrap();
            let reduced = reduce_to_fixed_point(&raw, &Config::default());

            assert_same_values(&raw, &reduced.expression)?;
        }

        #[test]
        fn displayed_trees_parse_back(t in tree()) {
            let reduced =
                reduce_to_fixed_point(&t, &Config::default()).expression;

            let text = reduced.to_string();
            let round_tripped: Expression = text.parse().unwrap();

            assert_same_values(&reduced, &round_tripped)?;
        }
    }
}
