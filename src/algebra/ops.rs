//! [`Expression`] operations.

use crate::algebra::{Expression, Parameter};
use smol_str::SmolStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationError {
    #[error("no value was provided for \"{name}\"")]
    UnboundParameter { name: SmolStr },
}

/// Evaluate an [`Expression`] numerically, with `param` bound to `value`.
///
/// Domain errors (`log(-1)`, `1/0`) aren't errors, they just produce the same
/// NaN or infinity the floating point operation would.
pub fn evaluate(
    expr: &Expression,
    param: &Parameter,
    value: f64,
) -> Result<f64, EvaluationError> {
    match expr {
        Expression::Parameter(p) if p == param => Ok(value),
        Expression::Parameter(p) => Err(EvaluationError::UnboundParameter {
            name: p.name().into(),
        }),
        Expression::Constant(constant) => Ok(*constant),
        Expression::Binary { left, right, op } => {
            let left = evaluate(left, param, value)?;
            let right = evaluate(right, param, value)?;
            Ok(op.apply(left, right))
        },
        Expression::Negate(inner) => Ok(-evaluate(inner, param, value)?),
        Expression::FunctionCall {
            function,
            arguments,
        } => {
            let arguments = arguments
                .iter()
                .map(|arg| evaluate(arg, param, value))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(function.evaluate(&arguments))
        },
    }
}

/// Replace all references to a [`Parameter`] with an [`Expression`].
///
/// Each replacement shares `value` rather than copying it.
pub fn substitute(
    expression: &Expression,
    param: &Parameter,
    value: &Arc<Expression>,
) -> Expression {
    match expression {
        Expression::Parameter(p) if p == param => Expression::clone(value),
        Expression::Parameter(_) | Expression::Constant(_) => {
            expression.clone()
        },
        Expression::Binary { left, right, op } => Expression::binary(
            *op,
            substituted(left, param, value),
            substituted(right, param, value),
        ),
        Expression::Negate(inner) => {
            Expression::Negate(substituted(inner, param, value))
        },
        Expression::FunctionCall {
            function,
            arguments,
        } => Expression::FunctionCall {
            function: *function,
            arguments: arguments
                .iter()
                .map(|arg| substituted(arg, param, value))
                .collect(),
        },
    }
}

fn substituted(
    node: &Arc<Expression>,
    param: &Parameter,
    value: &Arc<Expression>,
) -> Arc<Expression> {
    match **node {
        Expression::Parameter(ref p) if p == param => Arc::clone(value),
        Expression::Parameter(_) | Expression::Constant(_) => Arc::clone(node),
        _ => Arc::new(substitute(node, param, value)),
    }
}
