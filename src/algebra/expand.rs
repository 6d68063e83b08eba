//! Multiply out products of sums.
//!
//! This is the opposite of the factoring done while reducing, so the two are
//! never run as part of the same fixed point.

use crate::{
    algebra::{
        simplify::{merge_coefficients, Reduced},
        BinaryOperation, Expression,
    },
    config::Config,
};
use std::sync::Arc;

/// Apply one distribution pass to the whole tree.
pub fn expand_once(expr: &Expression) -> Reduced {
    match expr {
        Expression::Parameter(_) | Expression::Constant(_) => Reduced {
            expression: expr.clone(),
            changed: false,
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Times,
        } => match distribute(left, right) {
            Some(expression) => {
                tracing::trace!(from = %expr, to = %expression, "Distributed");
                Reduced {
                    expression,
                    changed: true,
                }
            },
            None => descend(BinaryOperation::Times, left, right),
        },
        Expression::Binary { left, right, op } => descend(*op, left, right),
        Expression::Negate(inner) => {
            let Reduced {
                expression,
                changed,
            } = expand_once(inner);

            Reduced {
                expression: -expression,
                changed,
            }
        },
        Expression::FunctionCall {
            function,
            arguments,
        } => {
            let expanded: Vec<Reduced> =
                arguments.iter().map(|arg| expand_once(arg)).collect();
            let changed = expanded.iter().any(|e| e.changed);

            Reduced {
                expression: Expression::FunctionCall {
                    function: *function,
                    arguments: expanded
                        .into_iter()
                        .map(|e| Arc::new(e.expression))
                        .collect(),
                },
                changed,
            }
        },
    }
}

/// Keep applying [`expand_once()`] until the tree stops changing.
pub fn expand_to_fixed_point(expr: &Expression, config: &Config) -> Reduced {
    let mut current = Reduced {
        expression: expr.clone(),
        changed: false,
    };

    for _ in 0..config.max_passes {
        let next = expand_once(&current.expression);

        if !next.changed {
            return current;
        }

        current = Reduced {
            expression: next.expression,
            changed: true,
        };
    }

    tracing::warn!(
        max_passes = config.max_passes,
        expr = %current.expression,
        "Expansion didn't reach a fixed point",
    );
    current
}

fn descend(
    op: BinaryOperation,
    left: &Arc<Expression>,
    right: &Arc<Expression>,
) -> Reduced {
    let l = expand_once(left);
    let r = expand_once(right);

    Reduced {
        changed: l.changed || r.changed,
        expression: Expression::binary(op, l.expression, r.expression),
    }
}

fn additive(
    expr: &Expression,
) -> Option<(BinaryOperation, &Arc<Expression>, &Arc<Expression>)> {
    match expr {
        Expression::Binary { left, right, op }
            if *op == BinaryOperation::Plus || *op == BinaryOperation::Minus =>
        {
            Some((*op, left, right))
        },
        _ => None,
    }
}

fn times(left: &Arc<Expression>, right: &Arc<Expression>) -> Expression {
    Expression::binary(
        BinaryOperation::Times,
        Arc::clone(left),
        Arc::clone(right),
    )
}

fn distribute(
    left: &Arc<Expression>,
    right: &Arc<Expression>,
) -> Option<Expression> {
    match (additive(left), additive(right)) {
        // (A ± B)*(C ± D) = A*(C ± D) ± B*(C ± D)
        (Some((op, a, b)), Some(_)) => {
            let (a, b) = (times(a, right), times(b, right));
            return Some(Expression::binary(op, a, b));
        },
        // (B ± C)*A = B*A ± C*A
        (Some((op, b, c)), None) => {
            let (b, c) = (times(b, right), times(c, right));
            return Some(Expression::binary(op, b, c));
        },
        // A*(B ± C) = A*B ± A*C
        (None, Some((op, b, c))) => {
            let (b, c) = (times(left, b), times(left, c));
            return Some(Expression::binary(op, b, c));
        },
        (None, None) => {},
    }

    // A*(B/C) = (A*B)/C
    if let Some((b, c)) = right.operands(BinaryOperation::Divide) {
        return Some(Expression::binary(
            BinaryOperation::Divide,
            times(left, b),
            Arc::clone(c),
        ));
    }
    if let Some((b, c)) = left.operands(BinaryOperation::Divide) {
        return Some(Expression::binary(
            BinaryOperation::Divide,
            times(right, b),
            Arc::clone(c),
        ));
    }

    merge_coefficients(left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{ops, simplify::reduce_to_fixed_point, Parameter};

    fn parse(src: &str) -> Expression { src.parse().unwrap() }

    #[test]
    fn distribute_products() {
        let inputs = vec![
            ("2*(x + 1)", "2*x + 2*1"),
            ("(x - 1)*3", "x*3 - 1*3"),
            ("(x + 1)*(x - 1)", "(x*(x - 1)) + (1*(x - 1))"),
            ("x*(y/z)", "(x*y)/z"),
            ("(y/z)*x", "(x*y)/z"),
            ("3*(2*x)", "6*x"),
            ("sin(2*(x + 1))", "sin(2*x + 2*1)"),
            ("x + 1", "x + 1"),
        ];

        for (src, should_be) in inputs {
            let got = expand_once(&parse(src));
            let should_be = parse(should_be);

            assert_eq!(got.expression, should_be, "{}", src);
        }
    }

    #[test]
    fn nothing_to_distribute() {
        let got = expand_once(&parse("x*y + sin(x)"));

        assert!(!got.changed);
    }

    #[test]
    fn fully_expand() {
        let config = Config::default();

        let got = expand_to_fixed_point(&parse("(x + 1)*(x - 1)"), &config);

        assert!(got.changed);
        assert_eq!(
            got.expression.to_string(),
            "((x*x) - (x*1)) + ((1*x) - (1*1))"
        );
        assert!(!expand_once(&got.expression).changed);
    }

    #[test]
    fn expanding_then_reducing_keeps_the_value() {
        let x = Parameter::named("x");
        let config = Config::default();
        let inputs =
            vec!["(x + 1)*(x - 1)", "3*(x + 2)*(2*x)", "(x^2 + 1)*(y/x)"];

        for src in inputs {
            let original = ops::substitute(
                &parse(src),
                &Parameter::named("y"),
                &Arc::new(Expression::Constant(0.25)),
            );
            let expanded = expand_to_fixed_point(&original, &config);
            let reduced = reduce_to_fixed_point(&expanded.expression, &config);

            for &sample in &[0.5, 1.5, 2.5, 4.0, 7.0] {
                let before = ops::evaluate(&original, &x, sample).unwrap();
                let after =
                    ops::evaluate(&reduced.expression, &x, sample).unwrap();
                approx::assert_relative_eq!(before, after, max_relative = 1e-9);
            }
        }
    }
}
