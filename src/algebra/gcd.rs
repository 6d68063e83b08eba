//! Structural greatest common factors.
//!
//! The "GCD" of two expressions is the product of the factors they share,
//! where a factor is one term of a multiplicative chain (`2*x^2*sin(x)` has
//! the chain `2`, `x` twice, then `sin(x)`). It's what lets the simplifier
//! rewrite `3*x^2 + 6*x` as `(x + 2)*(3*x)` and cancel whatever a numerator
//! shares with its denominator.

use crate::algebra::{BinaryOperation, Expression};
use std::sync::Arc;

/// One term in a multiplicative chain, `base^exponent`.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub base: Expression,
    /// Always a positive whole number.
    pub exponent: f64,
}

impl Factor {
    fn new(base: Expression, exponent: f64) -> Self {
        Factor { base, exponent }
    }

    fn to_expression(&self) -> Expression {
        if self.exponent == 1.0 {
            self.base.clone()
        } else {
            self.base.clone().pow(Expression::Constant(self.exponent))
        }
    }
}

/// Find the structural greatest common factor of two expressions, if they
/// have one.
///
/// The result may be trivial (e.g. the constant `1`); it's up to the caller
/// to decide whether factoring it out is worthwhile.
pub fn gcd(a: &Expression, b: &Expression) -> Option<Expression> {
    if a.is_zero() {
        return Some(b.clone());
    }
    if b.is_zero() {
        return Some(a.clone());
    }
    if a == b {
        return Some(a.clone());
    }

    if let (Expression::Constant(a), Expression::Constant(b)) = (a, b) {
        return integer_gcd(*a, *b).map(Expression::Constant);
    }

    if a.power_base().is_some() || b.power_base().is_some() {
        // a power inside a product only shows up in the product's chain
        if is_product(a) || is_product(b) {
            return shared_factors(a, b).or_else(|| shared_factors(b, a));
        }

        // only the bases of powers are compared, the exponents are picked up
        // when the factor is divided out
        if let Some(base) = a.power_base() {
            return gcd(base, b.power_base().unwrap_or(b));
        }
        if let Some(base) = b.power_base() {
            return gcd(base, a);
        }
    }

    // anything shared by a sum is shared by both of its terms
    if let Some((left, right)) = additive_operands(a) {
        return gcd(left, b).and_then(|g| gcd(&g, right));
    }
    if let Some((left, right)) = additive_operands(b) {
        return gcd(left, a).and_then(|g| gcd(&g, right));
    }

    shared_factors(a, b).or_else(|| shared_factors(b, a))
}

fn is_product(expr: &Expression) -> bool {
    match expr {
        Expression::Binary {
            op: BinaryOperation::Times,
            ..
        }
        | Expression::Negate(_) => true,
        _ => false,
    }
}

fn additive_operands(
    expr: &Expression,
) -> Option<(&Arc<Expression>, &Arc<Expression>)> {
    expr.operands(BinaryOperation::Plus)
        .or_else(|| expr.operands(BinaryOperation::Minus))
}

/// Euclid's algorithm, defined only for whole numbers.
fn integer_gcd(a: f64, b: f64) -> Option<f64> {
    if !is_whole(a) || !is_whole(b) {
        return None;
    }

    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0.0 {
        let remainder = a % b;
        a = b;
        b = remainder;
    }

    Some(a)
}

fn is_whole(value: f64) -> bool { value.is_finite() && value.fract() == 0.0 }

/// The product of every factor in `b`'s chain that `a` also contains, along
/// with the common part of their constant coefficients.
fn shared_factors(a: &Expression, b: &Expression) -> Option<Expression> {
    let mut shared = Vec::new();

    if let Some(coefficient) = integer_gcd(coefficient(a), coefficient(b)) {
        if coefficient > 1.0 {
            shared.push(Factor::new(Expression::Constant(coefficient), 1.0));
        }
    }

    for factor in chain_terms(b) {
        if factor.base.is_constant() {
            continue;
        }

        let times = contains_factor(a, &factor).floor();
        if times >= 1.0 {
            shared.push(Factor::new(factor.base, times));
        }
    }

    shared
        .iter()
        .map(Factor::to_expression)
        .reduce(|product, factor| product * factor)
}

/// Break an expression into its multiplicative chain.
///
/// Nested products are flattened, whole-number powers become repeated
/// factors, and equal bases are merged. A negation contributes a `-1`
/// factor. Anything else is a single factor.
pub fn chain_terms(expr: &Expression) -> Vec<Factor> {
    let mut terms: Vec<Factor> = Vec::new();
    push_chain_terms(expr, 1.0, &mut terms);
    terms
}

fn push_chain_terms(expr: &Expression, power: f64, terms: &mut Vec<Factor>) {
    match expr {
        Expression::Binary {
            left,
            right,
            op: BinaryOperation::Times,
        } => {
            push_chain_terms(left, power, terms);
            push_chain_terms(right, power, terms);
        },
        Expression::Negate(inner) => {
            push_term(Expression::Constant(-1.0), power, terms);
            push_chain_terms(inner, power, terms);
        },
        _ => match whole_power(expr) {
            // (u*v)^k = u^k * v^k and (-u)^k = (-1)^k * u^k
            Some((base, k)) => push_chain_terms(base, power * k, terms),
            None => push_term(expr.clone(), power, terms),
        },
    }
}

fn push_term(base: Expression, exponent: f64, terms: &mut Vec<Factor>) {
    match terms.iter_mut().find(|term| term.base == base) {
        Some(existing) => existing.exponent += exponent,
        None => terms.push(Factor::new(base, exponent)),
    }
}

/// `base^k` for some positive whole number, `k`.
fn whole_power(expr: &Expression) -> Option<(&Expression, f64)> {
    let (base, exponent) = expr.operands(BinaryOperation::Power)?;
    let exponent = exponent.as_constant()?;

    if is_whole(exponent) && exponent > 0.0 {
        Some((base, exponent))
    } else {
        None
    }
}

/// The product of the constant terms in an expression's chain.
fn coefficient(expr: &Expression) -> f64 {
    chain_terms(expr)
        .iter()
        .filter_map(|term| {
            term.base
                .as_constant()
                .map(|value| value.abs().powf(term.exponent))
        })
        .product()
}

/// How many times (up to `factor.exponent`) does `factor.base` divide `expr`?
pub fn contains_factor(expr: &Expression, factor: &Factor) -> f64 {
    exponent_in(expr, &factor.base).min(factor.exponent).max(0.0)
}

fn exponent_in(expr: &Expression, base: &Expression) -> f64 {
    if expr == base {
        return 1.0;
    }

    match expr {
        Expression::Binary { left, right, op } => match op {
            BinaryOperation::Times => {
                exponent_in(left, base) + exponent_in(right, base)
            },
            BinaryOperation::Plus | BinaryOperation::Minus => {
                exponent_in(left, base).min(exponent_in(right, base))
            },
            BinaryOperation::Divide => exponent_in(left, base),
            BinaryOperation::Power => match whole_power(expr) {
                Some((inner, k)) => k * exponent_in(inner, base),
                None => 0.0,
            },
        },
        Expression::Negate(inner) => exponent_in(inner, base),
        _ => 0.0,
    }
}

/// Divide `expr` by `divisor`, which should be something [`gcd()`] returned
/// for it. Returns `None` if `divisor` doesn't actually divide `expr`.
pub fn divide_out(
    expr: &Expression,
    divisor: &Expression,
) -> Option<Expression> {
    let mut factors = chain_terms(divisor);
    // constants last, so there's more left to take them from
    factors.sort_by_key(|factor| factor.base.is_constant());

    factors
        .iter()
        .try_fold(expr.clone(), |quotient, factor| match factor.base {
            Expression::Constant(k) => {
                divide_constant(&quotient, k.powf(factor.exponent))
            },
            ref base => divide_power(&quotient, base, factor.exponent),
        })
}

/// Remove `base^exponent` from `expr`.
fn divide_power(
    expr: &Expression,
    base: &Expression,
    exponent: f64,
) -> Option<Expression> {
    if exponent <= 0.0 {
        return Some(expr.clone());
    }
    if expr == base {
        return if exponent == 1.0 {
            Some(Expression::Constant(1.0))
        } else {
            None
        };
    }

    match expr {
        Expression::Binary { left, right, op } => match op {
            BinaryOperation::Times => {
                let from_left = exponent_in(left, base).min(exponent);
                let left = divide_power(left, base, from_left)?;
                let right = divide_power(right, base, exponent - from_left)?;
                Some(left * right)
            },
            BinaryOperation::Plus | BinaryOperation::Minus => {
                let left = divide_power(left, base, exponent)?;
                let right = divide_power(right, base, exponent)?;
                Some(Expression::binary(*op, left, right))
            },
            BinaryOperation::Divide => {
                let numerator = divide_power(left, base, exponent)?;
                Some(Expression::binary(
                    BinaryOperation::Divide,
                    numerator,
                    Arc::clone(right),
                ))
            },
            BinaryOperation::Power => {
                let (inner, k) = whole_power(expr)?;

                if inner == base {
                    let remaining = k - exponent;
                    if remaining < 0.0 {
                        None
                    } else if remaining == 0.0 {
                        Some(Expression::Constant(1.0))
                    } else if remaining == 1.0 {
                        Some(inner.clone())
                    } else {
                        Some(inner.clone().pow(Expression::Constant(remaining)))
                    }
                } else if (exponent / k).fract() == 0.0 {
                    // (u*x)^2 / x^2 = u^2
                    let inner = divide_power(inner, base, exponent / k)?;
                    Some(inner.pow(Expression::Constant(k)))
                } else {
                    None
                }
            },
        },
        Expression::Negate(inner) => {
            Some(-divide_power(inner, base, exponent)?)
        },
        _ => None,
    }
}

/// Divide the coefficient of `expr` by `k`.
fn divide_constant(expr: &Expression, k: f64) -> Option<Expression> {
    if k == 1.0 {
        return Some(expr.clone());
    }

    match expr {
        Expression::Negate(inner) if k == -1.0 => {
            Some(Expression::clone(inner))
        },
        Expression::Constant(value) => {
            let quotient = value / k;
            if is_whole(quotient) {
                Some(Expression::Constant(quotient))
            } else {
                None
            }
        },
        Expression::Binary { left, right, op } => match op {
            BinaryOperation::Times => divide_constant(left, k)
                .map(|left| left * Expression::clone(right))
                .or_else(|| {
                    divide_constant(right, k)
                        .map(|right| Expression::clone(left) * right)
                }),
            BinaryOperation::Plus | BinaryOperation::Minus => {
                let left = divide_constant(left, k)?;
                let right = divide_constant(right, k)?;
                Some(Expression::binary(*op, left, right))
            },
            BinaryOperation::Divide => {
                let numerator = divide_constant(left, k)?;
                Some(Expression::binary(
                    BinaryOperation::Divide,
                    numerator,
                    Arc::clone(right),
                ))
            },
            BinaryOperation::Power => None,
        },
        Expression::Negate(inner) => Some(-divide_constant(inner, k)?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::{ops, Parameter};

    fn parse(src: &str) -> Expression { src.parse().unwrap() }

    /// Evaluate at `x = 2.3, y = 1.7`.
    fn at(expr: &Expression) -> f64 {
        let y = Arc::new(Expression::Constant(1.7));
        let expr = ops::substitute(expr, &Parameter::named("y"), &y);
        ops::evaluate(&expr, &Parameter::named("x"), 2.3).unwrap()
    }

    #[test]
    fn greatest_common_factors() {
        let inputs = vec![
            ("0", "x", Some("x")),
            ("x", "0", Some("x")),
            ("x", "x", Some("x")),
            ("12", "18", Some("6")),
            ("-4", "6", Some("2")),
            ("1.5", "3", None),
            ("x^2", "x^3", Some("x")),
            ("x^2", "x", Some("x")),
            ("2*x", "3*x", Some("x")),
            ("6*x", "4*x^2", Some("2*x")),
            ("x*sin(x)", "sin(x)", Some("sin(x)")),
            ("x*y", "y*x", Some("y*x")),
            ("2*x", "y", None),
            ("x*y + x*z", "x", Some("x")),
            ("x + 1", "x", None),
            ("6*(x + 1)^4", "(x + 1)^8", Some("(x + 1)^4")),
            ("((-x)^1)*x", "(-x)^2", Some("x^2")),
        ];

        for (a, b, should_be) in inputs {
            let got = gcd(&parse(a), &parse(b));
            let should_be = should_be.map(parse);

            assert_eq!(got, should_be, "gcd({}, {})", a, b);
        }
    }

    #[test]
    fn chain_terms_are_flattened_and_merged() {
        let got = chain_terms(&parse("2*x*x^2*sin(x)"));

        let should_be = vec![
            Factor::new(parse("2"), 1.0),
            Factor::new(parse("x"), 3.0),
            Factor::new(parse("sin(x)"), 1.0),
        ];
        assert_eq!(got, should_be);
    }

    #[test]
    fn negation_is_a_separate_factor() {
        let got = chain_terms(&parse("-(2*x)^2"));

        let should_be = vec![
            Factor::new(Expression::Constant(-1.0), 1.0),
            Factor::new(parse("2"), 2.0),
            Factor::new(parse("x"), 2.0),
        ];
        assert_eq!(got, should_be);
    }

    #[test]
    fn negated_bases_keep_their_sign() {
        let got = chain_terms(&parse("(-x)^3"));

        let should_be = vec![
            Factor::new(Expression::Constant(-1.0), 3.0),
            Factor::new(parse("x"), 3.0),
        ];
        assert_eq!(got, should_be);
    }

    #[test]
    fn fractional_powers_are_opaque() {
        let got = chain_terms(&parse("x^0.5"));

        assert_eq!(got, vec![Factor::new(parse("x^0.5"), 1.0)]);
    }

    #[test]
    fn how_many_times_a_factor_is_contained() {
        let x_cubed = Factor::new(parse("x"), 3.0);
        let inputs = vec![
            ("x", 1.0),
            ("x^2", 2.0),
            ("x^5", 3.0),
            ("x*x", 2.0),
            ("x^2 + x", 1.0),
            ("x/y", 1.0),
            ("y/x", 0.0),
            ("-x", 1.0),
            ("sin(x)", 0.0),
            ("(2x)^2", 2.0),
        ];

        for (src, should_be) in inputs {
            let got = contains_factor(&parse(src), &x_cubed);
            assert_eq!(got, should_be, "{}", src);
        }
    }

    #[test]
    fn dividing_out_a_common_factor() {
        let inputs = vec![
            ("x^2", "x", Some("x")),
            ("x^3", "x", Some("x^2")),
            ("x", "x", Some("1")),
            ("2*x", "x", Some("2*1")),
            ("6*x^2", "2*x", Some("3*x^2/x")),
            ("x*y + x", "x", Some("1*y + 1")),
            ("-(x*y)", "y", Some("-(x*1)")),
            ("x", "x^2", None),
            ("3", "2", None),
            ("sin(x)", "x", None),
            ("-x", "-x", Some("1")),
            ("(-x)^2", "x^2", Some("1")),
            ("((-x)^1)*x", "x^2", Some("-1")),
            ("((-x)^1)*x", "(-x)*x", Some("1")),
            ("x*y", "-y", Some("-x")),
        ];

        for (src, divisor, should_be) in inputs {
            let got = divide_out(&parse(src), &parse(divisor));

            match should_be {
                Some(expected) => {
                    let got = got.unwrap();
                    let expected = parse(expected);
                    approx::assert_relative_eq!(at(&got), at(&expected));
                },
                None => assert!(got.is_none(), "{} / {}", src, divisor),
            }
        }
    }
}
