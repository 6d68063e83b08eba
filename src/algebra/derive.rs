//! Symbolic differentiation.

use crate::algebra::{
    function::Function, BinaryOperation, Expression, Lambda, Parameter,
};
use smol_str::SmolStr;
use std::sync::Arc;
use thiserror::Error;

/// Something outside the set of constructs this crate knows how to handle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnsupportedConstruct {
    #[error("the exponent, \"{exponent}\", isn't constant")]
    SymbolicExponent { exponent: String },
    #[error("the logarithm's base, \"{base}\", isn't constant")]
    VariableLogBase { base: String },
    #[error("\"{name}\" is not a supported function")]
    UnknownFunction { name: SmolStr },
    #[error("{function} doesn't accept {found} argument(s)")]
    WrongArity { function: Function, found: usize },
    #[error("a function must have exactly one parameter, found {found}")]
    ParameterCount { found: usize },
}

/// Differentiate a [`Lambda`] with respect to its parameter.
///
/// The result isn't simplified in any way.
pub fn derive(lambda: &Lambda) -> Result<Lambda, UnsupportedConstruct> {
    let derivative = derivative(lambda.body(), lambda.parameter())?;
    Ok(lambda.with_body(derivative))
}

/// Calculate an [`Expression`]'s derivative with respect to a particular
/// [`Parameter`].
pub fn derivative(
    expr: &Expression,
    param: &Parameter,
) -> Result<Expression, UnsupportedConstruct> {
    let got = match expr {
        Expression::Parameter(p) => {
            if p == param {
                Expression::Constant(1.0)
            } else {
                Expression::Constant(0.0)
            }
        },
        Expression::Constant(_) => Expression::Constant(0.0),
        Expression::Negate(inner) => -derivative(inner, param)?,
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Plus,
        } => derivative(left, param)? + derivative(right, param)?,
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Minus,
        } => derivative(left, param)? - derivative(right, param)?,
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Times,
        } => {
            // The product rule
            let d_left = derivative(left, param)?;
            let d_right = derivative(right, param)?;
            let (left, right) = (Arc::clone(left), Arc::clone(right));

            let first =
                Expression::binary(BinaryOperation::Times, d_left, right);
            let second =
                Expression::binary(BinaryOperation::Times, left, d_right);
            first + second
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Divide,
        } => {
            // The quotient rule
            let d_left = derivative(left, param)?;
            let d_right = derivative(right, param)?;

            let numerator = Expression::binary(
                BinaryOperation::Times,
                d_left,
                Arc::clone(right),
            ) - Expression::binary(
                BinaryOperation::Times,
                Arc::clone(left),
                d_right,
            );
            let denominator = Expression::binary(
                BinaryOperation::Power,
                Arc::clone(right),
                Expression::Constant(2.0),
            );

            numerator / denominator
        },
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Power,
        } => power_rule(left, right, param)?,
        Expression::FunctionCall {
            function,
            arguments,
        } => {
            // implement the chain rule: (f o g)' = (f' o g) * g'
            let (inner, base) = match arguments.as_slice() {
                [inner] => (inner, None),
                [inner, base] => (inner, Some(base)),
                _ => {
                    return Err(UnsupportedConstruct::WrongArity {
                        function: *function,
                        found: arguments.len(),
                    })
                },
            };

            if let Some(base) = base {
                if base.depends_on(param) {
                    return Err(UnsupportedConstruct::VariableLogBase {
                        base: base.to_string(),
                    });
                }
            }

            let f_dash_of_g = function.derivative(arguments);
            let g_dash = derivative(inner, param)?;

            f_dash_of_g * g_dash
        },
    };

    Ok(got)
}

/// `d/dx u^v = v * u^(v - 1) * u'`, for constant `v`.
fn power_rule(
    base: &Arc<Expression>,
    exponent: &Arc<Expression>,
    param: &Parameter,
) -> Result<Expression, UnsupportedConstruct> {
    if exponent.depends_on(param) {
        return Err(UnsupportedConstruct::SymbolicExponent {
            exponent: exponent.to_string(),
        });
    }

    let reduced_exponent = Expression::binary(
        BinaryOperation::Minus,
        Arc::clone(exponent),
        Expression::Constant(1.0),
    );
    let outer = Expression::binary(
        BinaryOperation::Times,
        Arc::clone(exponent),
        Expression::binary(
            BinaryOperation::Power,
            Arc::clone(base),
            reduced_exponent,
        ),
    );

    Ok(outer * derivative(base, param)?)
}
