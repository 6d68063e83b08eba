use crate::algebra::{
    function::Function,
    ops::{self, EvaluationError},
    UnsupportedConstruct,
};
use approx::abs_diff_eq;
use arrayvec::ArrayVec;
use smol_str::SmolStr;
use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, Div, Mul, Neg, Sub},
    sync::Arc,
};

/// The arguments passed to a [`Function`]. No builtin takes more than two.
pub type Arguments = ArrayVec<[Arc<Expression>; 2]>;

/// An expression.
///
/// Trees are never mutated once they've been built. Every rewrite produces a
/// new node, which means subtrees can be shared (via [`Arc`]) between a tree
/// and whatever gets derived from it.
#[derive(Debug, Clone)]
pub enum Expression {
    Parameter(Parameter),
    Constant(f64),
    /// An expression involving two operands.
    Binary {
        left: Arc<Expression>,
        right: Arc<Expression>,
        op: BinaryOperation,
    },
    /// Negate the expression.
    Negate(Arc<Expression>),
    /// Invoke a builtin function.
    FunctionCall {
        function: Function,
        arguments: Arguments,
    },
}

impl Expression {
    pub fn binary<L, R>(op: BinaryOperation, left: L, right: R) -> Expression
    where
        L: Into<Arc<Expression>>,
        R: Into<Arc<Expression>>,
    {
        Expression::Binary {
            left: left.into(),
            right: right.into(),
            op,
        }
    }

    /// Raise this expression to some power.
    pub fn pow<E: Into<Arc<Expression>>>(self, exponent: E) -> Expression {
        Expression::binary(BinaryOperation::Power, self, exponent)
    }

    /// Call one of the allow-listed functions by name.
    pub fn call<I>(
        name: &str,
        arguments: I,
    ) -> Result<Expression, UnsupportedConstruct>
    where
        I: IntoIterator<Item = Expression>,
    {
        Expression::apply(Function::from_name(name)?, arguments)
    }

    /// Invoke a [`Function`], making sure it accepts this many arguments.
    pub fn apply<I>(
        function: Function,
        arguments: I,
    ) -> Result<Expression, UnsupportedConstruct>
    where
        I: IntoIterator<Item = Expression>,
    {
        let arguments: Vec<Arc<Expression>> =
            arguments.into_iter().map(Arc::new).collect();

        if !function.accepts(arguments.len()) {
            return Err(UnsupportedConstruct::WrongArity {
                function,
                found: arguments.len(),
            });
        }

        Ok(Expression::FunctionCall {
            function,
            arguments: arguments.into_iter().collect(),
        })
    }

    /// Build a single-argument call without going through the arity check.
    pub(crate) fn unary_call<A>(function: Function, argument: A) -> Expression
    where
        A: Into<Arc<Expression>>,
    {
        let mut arguments = Arguments::new();
        arguments.push(argument.into());
        Expression::FunctionCall {
            function,
            arguments,
        }
    }

    pub fn as_constant(&self) -> Option<f64> {
        match self {
            Expression::Constant(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_constant(&self) -> bool { self.as_constant().is_some() }

    pub fn is_zero(&self) -> bool {
        self.as_constant()
            .map(|value| abs_diff_eq!(value, 0.0))
            .unwrap_or(false)
    }

    pub fn is_one(&self) -> bool {
        self.as_constant()
            .map(|value| abs_diff_eq!(value, 1.0))
            .unwrap_or(false)
    }

    /// Constants and parameters; there is nothing inside them to rewrite.
    pub fn is_leaf(&self) -> bool {
        match self {
            Expression::Constant(_) | Expression::Parameter(_) => true,
            _ => false,
        }
    }

    /// If this is a `left op right` node, get its operands.
    pub fn operands(
        &self,
        wanted: BinaryOperation,
    ) -> Option<(&Arc<Expression>, &Arc<Expression>)> {
        match self {
            Expression::Binary { left, right, op } if *op == wanted => {
                Some((left, right))
            },
            _ => None,
        }
    }

    /// The thing being raised to a power, if this is a power.
    pub fn power_base(&self) -> Option<&Expression> {
        self.operands(BinaryOperation::Power).map(|(base, _)| &**base)
    }

    /// Does this expression mention `param` anywhere?
    pub fn depends_on(&self, param: &Parameter) -> bool {
        match self {
            Expression::Parameter(p) => p == param,
            Expression::Constant(_) => false,
            Expression::Binary { left, right, .. } => {
                left.depends_on(param) || right.depends_on(param)
            },
            Expression::Negate(inner) => inner.depends_on(param),
            Expression::FunctionCall { arguments, .. } => {
                arguments.iter().any(|arg| arg.depends_on(param))
            },
        }
    }

    /// The left-most [`Parameter`] in the tree.
    pub fn first_parameter(&self) -> Option<&Parameter> {
        match self {
            Expression::Parameter(p) => Some(p),
            Expression::Constant(_) => None,
            Expression::Binary { left, right, .. } => {
                left.first_parameter().or_else(|| right.first_parameter())
            },
            Expression::Negate(inner) => inner.first_parameter(),
            Expression::FunctionCall { arguments, .. } => {
                arguments.iter().find_map(|arg| arg.first_parameter())
            },
        }
    }

    fn is_compound(&self) -> bool {
        match self {
            Expression::Parameter(_) | Expression::FunctionCall { .. } => false,
            Expression::Constant(value) => value.is_sign_negative(),
            Expression::Negate(_) | Expression::Binary { .. } => true,
        }
    }
}

/// Structural equality.
///
/// Two trees are equal when they have the same shape, the same operators and
/// parameters, and constants with the same value. Shared subtrees are
/// detected by pointer so comparing a tree against its own rewrite is cheap.
impl PartialEq for Expression {
    fn eq(&self, other: &Expression) -> bool {
        match (self, other) {
            (Expression::Parameter(left), Expression::Parameter(right)) => {
                left == right
            },
            (Expression::Constant(left), Expression::Constant(right)) => {
                left == right || (left.is_nan() && right.is_nan())
            },
            (Expression::Negate(left), Expression::Negate(right)) => {
                same_subtree(left, right)
            },
            (
                Expression::Binary {
                    left: left_a,
                    right: right_a,
                    op: op_a,
                },
                Expression::Binary {
                    left: left_b,
                    right: right_b,
                    op: op_b,
                },
            ) => {
                op_a == op_b
                    && same_subtree(left_a, left_b)
                    && same_subtree(right_a, right_b)
            },
            (
                Expression::FunctionCall {
                    function: function_a,
                    arguments: arguments_a,
                },
                Expression::FunctionCall {
                    function: function_b,
                    arguments: arguments_b,
                },
            ) => {
                function_a == function_b
                    && arguments_a.len() == arguments_b.len()
                    && arguments_a
                        .iter()
                        .zip(arguments_b.iter())
                        .all(|(a, b)| same_subtree(a, b))
            },
            _ => false,
        }
    }
}

fn same_subtree(left: &Arc<Expression>, right: &Arc<Expression>) -> bool {
    Arc::ptr_eq(left, right) || **left == **right
}

/// A named variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Parameter {
    name: SmolStr,
}

impl Parameter {
    pub fn named<S: Into<SmolStr>>(name: S) -> Self {
        Parameter { name: name.into() }
    }

    pub fn name(&self) -> &str { &self.name }
}

impl Display for Parameter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An operation that can be applied to two arguments.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOperation {
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl BinaryOperation {
    pub fn from_symbol(symbol: char) -> Option<BinaryOperation> {
        match symbol {
            '+' => Some(BinaryOperation::Plus),
            '-' => Some(BinaryOperation::Minus),
            '*' => Some(BinaryOperation::Times),
            '/' => Some(BinaryOperation::Divide),
            '^' => Some(BinaryOperation::Power),
            _ => None,
        }
    }

    /// Evaluate the operation numerically.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            BinaryOperation::Plus => left + right,
            BinaryOperation::Minus => left - right,
            BinaryOperation::Times => left * right,
            BinaryOperation::Divide => left / right,
            BinaryOperation::Power => left.powf(right),
        }
    }
}

/// A function of one parameter, `f(x) = body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    parameter: Parameter,
    body: Arc<Expression>,
}

impl Lambda {
    pub fn new<B>(parameter: Parameter, body: B) -> Self
    where
        B: Into<Arc<Expression>>,
    {
        Lambda {
            parameter,
            body: body.into(),
        }
    }

    /// Create a [`Lambda`] from an arbitrary parameter list, which must
    /// contain exactly one parameter.
    pub fn from_parts<B: Into<Arc<Expression>>>(
        parameters: Vec<Parameter>,
        body: B,
    ) -> Result<Self, UnsupportedConstruct> {
        let found = parameters.len();
        let mut parameters = parameters.into_iter();

        match (parameters.next(), parameters.next()) {
            (Some(parameter), None) => Ok(Lambda::new(parameter, body)),
            _ => Err(UnsupportedConstruct::ParameterCount { found }),
        }
    }

    pub fn parameter(&self) -> &Parameter { &self.parameter }

    pub fn body(&self) -> &Expression { &self.body }

    /// The same function signature with a new body.
    pub fn with_body<B: Into<Arc<Expression>>>(&self, body: B) -> Lambda {
        Lambda::new(self.parameter.clone(), body)
    }

    /// Evaluate `f(value)`.
    pub fn call(&self, value: f64) -> Result<f64, EvaluationError> {
        ops::evaluate(&self.body, &self.parameter, value)
    }
}

impl Display for Lambda {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "f({}) = {}", self.parameter, self.body)
    }
}

// define some operator overloads to make constructing an expression easier.

impl From<f64> for Expression {
    fn from(value: f64) -> Expression { Expression::Constant(value) }
}

impl From<Parameter> for Expression {
    fn from(param: Parameter) -> Expression { Expression::Parameter(param) }
}

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Plus, self, rhs)
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Minus, self, rhs)
    }
}

impl Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Times, self, rhs)
    }
}

impl Div for Expression {
    type Output = Expression;

    fn div(self, rhs: Expression) -> Expression {
        Expression::binary(BinaryOperation::Divide, self, rhs)
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Self::Output { Expression::Negate(Arc::new(self)) }
}

/// The canonical text form. Every compound operand is parenthesized, so the
/// output can be fed back through the parser.
impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Parameter(p) => write!(f, "{}", p),
            Expression::Constant(value) => write!(f, "{}", value),
            Expression::Binary { left, right, op } => {
                write_compound(left, f)?;

                let op = match op {
                    BinaryOperation::Plus => " + ",
                    BinaryOperation::Minus => " - ",
                    BinaryOperation::Times => "*",
                    BinaryOperation::Divide => "/",
                    BinaryOperation::Power => "^",
                };
                write!(f, "{}", op)?;

                write_compound(right, f)?;

                Ok(())
            },
            Expression::Negate(inner) => {
                write!(f, "-")?;
                write_compound(inner, f)?;
                Ok(())
            },
            Expression::FunctionCall {
                function,
                arguments,
            } => {
                write!(f, "{}(", function)?;

                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", argument)?;
                }

                write!(f, ")")
            },
        }
    }
}

fn write_compound(expr: &Expression, f: &mut Formatter<'_>) -> fmt::Result {
    if expr.is_compound() {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expression { Expression::Parameter(Parameter::named("x")) }

    #[test]
    fn display() {
        let inputs = vec![
            (Expression::Constant(3.0), "3"),
            (Expression::Constant(-3.0), "-3"),
            (Expression::Constant(0.5), "0.5"),
            (
                Expression::unary_call(
                    Function::Sine,
                    Expression::Constant(5.0),
                ),
                "sin(5)",
            ),
            (
                Expression::Negate(Arc::new(Expression::Constant(5.0))),
                "-5",
            ),
            (
                -Expression::unary_call(Function::Sine, x()),
                "-sin(x)",
            ),
            (Expression::from(1.0) + Expression::from(1.0), "1 + 1"),
            (Expression::from(1.0) - Expression::from(1.0), "1 - 1"),
            (Expression::from(1.0) * x(), "1*x"),
            (Expression::from(1.0) / x(), "1/x"),
            (x().pow(Expression::from(2.0)), "x^2"),
            (x().pow(Expression::from(-1.0)), "x^(-1)"),
            (
                Expression::from(-2.0).pow(x()),
                "(-2)^x",
            ),
            (
                (Expression::from(1.0) + Expression::from(2.0))
                    / Expression::from(3.0),
                "(1 + 2)/3",
            ),
            (-(x() + Expression::from(1.0)), "-(x + 1)"),
            (
                Expression::apply(
                    Function::Log,
                    vec![x(), Expression::from(2.0)],
                )
                .unwrap(),
                "log(x, 2)",
            ),
        ];

        for (expr, should_be) in inputs {
            let got = expr.to_string();
            assert_eq!(got, should_be);
        }
    }

    #[test]
    fn structural_equality_ignores_sharing() {
        let shared = Arc::new(x() * Expression::from(2.0));
        let a = Expression::binary(
            BinaryOperation::Plus,
            Arc::clone(&shared),
            Expression::from(1.0),
        );
        let b = (x() * Expression::from(2.0)) + Expression::from(1.0);

        assert_eq!(a, b);
        assert_ne!(a, (x() * Expression::from(3.0)) + Expression::from(1.0));
        assert_ne!(x() + Expression::from(1.0), x() - Expression::from(1.0));
    }

    #[test]
    fn nan_constants_are_structurally_equal() {
        assert_eq!(
            Expression::Constant(f64::NAN),
            Expression::Constant(f64::NAN)
        );
    }

    #[test]
    fn calls_are_checked_against_the_allow_list() {
        assert!(Expression::call("sin", vec![x()]).is_ok());
        assert_eq!(
            Expression::call("sinh", vec![x()]),
            Err(UnsupportedConstruct::UnknownFunction { name: "sinh".into() })
        );
        assert_eq!(
            Expression::call("cos", vec![x(), x()]),
            Err(UnsupportedConstruct::WrongArity {
                function: Function::Cosine,
                found: 2
            })
        );
    }

    #[test]
    fn lambdas_bind_exactly_one_parameter() {
        let x_param = Parameter::named("x");

        assert!(Lambda::from_parts(vec![x_param.clone()], x()).is_ok());
        assert_eq!(
            Lambda::from_parts(Vec::new(), x()),
            Err(UnsupportedConstruct::ParameterCount { found: 0 })
        );
        assert_eq!(
            Lambda::from_parts(
                vec![x_param.clone(), Parameter::named("y")],
                x()
            ),
            Err(UnsupportedConstruct::ParameterCount { found: 2 })
        );
    }

    #[test]
    fn dependencies() {
        let x_param = Parameter::named("x");
        let y = Expression::Parameter(Parameter::named("y"));

        assert!((y.clone() * x()).depends_on(&x_param));
        assert!(!(y.clone() + Expression::from(1.0)).depends_on(&x_param));
        assert_eq!(
            (y * x()).first_parameter(),
            Some(&Parameter::named("y"))
        );
    }
}
