//! The allow-list of builtin functions.
//!
//! Everything the rest of the crate needs to know about a function (its name,
//! how many arguments it takes, its derivative and how to evaluate it) lives
//! here so there is exactly one place to add a new one.

use crate::algebra::{ops, Expression, Parameter, UnsupportedConstruct};
use std::{
    fmt::{self, Display, Formatter},
    ops::RangeInclusive,
    sync::Arc,
};

/// Various builtin functions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Function {
    /// The natural logarithm, or `log(x, base)` when called with two
    /// arguments.
    Log,
    Log10,
    Sine,
    Cosine,
    Tangent,
}

impl Function {
    pub const ALL: [Function; 5] = [
        Function::Log,
        Function::Log10,
        Function::Sine,
        Function::Cosine,
        Function::Tangent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Function::Log => "log",
            Function::Log10 => "log10",
            Function::Sine => "sin",
            Function::Cosine => "cos",
            Function::Tangent => "tan",
        }
    }

    pub fn from_name(name: &str) -> Result<Function, UnsupportedConstruct> {
        Function::ALL
            .iter()
            .copied()
            .find(|f| f.name() == name)
            .ok_or_else(|| UnsupportedConstruct::UnknownFunction {
                name: name.into(),
            })
    }

    /// The function whose name is the longest prefix of `src`, so `log10(x)`
    /// isn't read as `log` followed by `10(x)`.
    pub(crate) fn longest_prefix(src: &str) -> Option<Function> {
        Function::ALL
            .iter()
            .copied()
            .filter(|f| src.starts_with(f.name()))
            .max_by_key(|f| f.name().len())
    }

    pub fn arity(self) -> RangeInclusive<usize> {
        match self {
            Function::Log => 1..=2,
            _ => 1..=1,
        }
    }

    pub fn accepts(self, argument_count: usize) -> bool {
        self.arity().contains(&argument_count)
    }

    pub fn evaluate(self, arguments: &[f64]) -> f64 {
        match (self, arguments) {
            (Function::Log, [x]) => x.ln(),
            (Function::Log, [x, base]) => x.log(*base),
            (Function::Log10, [x]) => x.log10(),
            (Function::Sine, [x]) => x.sin(),
            (Function::Cosine, [x]) => x.cos(),
            (Function::Tangent, [x]) => x.tan(),
            // arity is checked when the call is constructed
            _ => f64::NAN,
        }
    }

    /// For some function, `f`, get `f'(u)` where `u` (and the log base, `b`)
    /// are placeholder parameters.
    fn derivative_template(self, argument_count: usize) -> Expression {
        let u = || Expression::Parameter(placeholder(0));
        let one = || Expression::Constant(1.0);

        match (self, argument_count) {
            (Function::Log, 2) => {
                let ln_b = Expression::unary_call(
                    Function::Log,
                    Expression::Parameter(placeholder(1)),
                );
                one() / (u() * ln_b)
            },
            (Function::Log, _) => one() / u(),
            (Function::Log10, _) => {
                let ln_10 = Expression::unary_call(
                    Function::Log,
                    Expression::Constant(10.0),
                );
                one() / (u() * ln_10)
            },
            (Function::Sine, _) => {
                Expression::unary_call(Function::Cosine, u())
            },
            (Function::Cosine, _) => {
                -Expression::unary_call(Function::Sine, u())
            },
            (Function::Tangent, _) => {
                let cos_u = Expression::unary_call(Function::Cosine, u());
                one() / cos_u.pow(Expression::Constant(2.0))
            },
        }
    }

    /// The outer half of the chain rule, `f'(g)`, for a call `f(g)`.
    pub(crate) fn derivative(
        self,
        arguments: &[Arc<Expression>],
    ) -> Expression {
        let template = self.derivative_template(arguments.len());

        arguments
            .iter()
            .enumerate()
            .fold(template, |rule, (i, argument)| {
                ops::substitute(&rule, &placeholder(i), argument)
            })
    }
}

fn placeholder(index: usize) -> Parameter {
    Parameter::named(format!("__arg{}__", index))
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
