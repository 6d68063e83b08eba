//! Reduce an expression to a simpler, equivalent form.
//!
//! A single pass walks the tree once. Each node is checked against a
//! prioritized list of local rewrites for its kind and the first one which
//! matches wins. If nothing matches, both children are reduced (and factored)
//! independently and the node is rebuilt around them.
//!
//! Passes are repeated by [`reduce_to_fixed_point()`] until the tree stops
//! changing.

use crate::{
    algebra::{
        gcd::{divide_out, gcd},
        BinaryOperation, Expression, Lambda,
    },
    config::Config,
};
use rayon::prelude::*;
use std::sync::Arc;

/// The result of a rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduced {
    pub expression: Expression,
    /// Did any rewrite rule fire?
    pub changed: bool,
}

impl Reduced {
    fn unchanged(expression: Expression) -> Self {
        Reduced {
            expression,
            changed: false,
        }
    }

    fn changed(expression: Expression) -> Self {
        Reduced {
            expression,
            changed: true,
        }
    }
}

/// Apply one reduction pass to the whole tree.
pub fn reduce_once(expr: &Expression, config: &Config) -> Reduced {
    Pass { config }.refine(expr, 0)
}

/// Keep applying [`reduce_once()`] until the tree stops changing (or the
/// [`Config::max_passes`] limit is hit).
pub fn reduce_to_fixed_point(expr: &Expression, config: &Config) -> Reduced {
    let mut current = expr.clone();
    let mut changed = false;

    for pass in 0..config.max_passes {
        let next = reduce_once(&current, config);
        let settled = next.expression == current;
        tracing::debug!(pass, changed = !settled, "Finished a reduction pass");

        if settled {
            return Reduced {
                expression: current,
                changed,
            };
        }

        changed = true;
        current = next.expression;
    }

    tracing::warn!(
        max_passes = config.max_passes,
        expr = %current,
        "Reduction didn't reach a fixed point, returning the last pass",
    );

    Reduced {
        expression: current,
        changed,
    }
}

/// Reduce the body of a [`Lambda`] to a fixed point.
pub fn reduce_lambda(lambda: &Lambda, config: &Config) -> (Lambda, bool) {
    let Reduced {
        expression,
        changed,
    } = reduce_to_fixed_point(lambda.body(), config);

    (lambda.with_body(expression), changed)
}

/// Pull the structural GCD out of a sum, difference, or quotient.
///
/// `L + R` becomes `(L/g + R/g)*g` and `L/R` becomes `(L/g)/(R/g)`, with the
/// divisions carried out structurally. Factors which are trivial (a constant
/// no greater than `1`) or which are just one of the operands of a sum are
/// left alone.
pub fn factor(expr: &Expression) -> Reduced {
    let (left, right, op) = match expr {
        Expression::Binary { left, right, op }
            if *op != BinaryOperation::Times
                && *op != BinaryOperation::Power =>
        {
            (left, right, *op)
        },
        _ => return Reduced::unchanged(expr.clone()),
    };

    let common = match gcd(left, right) {
        Some(common) => common,
        None => return Reduced::unchanged(expr.clone()),
    };

    let trivial = common.as_constant().map(|k| k <= 1.0).unwrap_or(false);
    let is_an_operand = common == **left || common == **right;

    if trivial || (op != BinaryOperation::Divide && is_an_operand) {
        return Reduced::unchanged(expr.clone());
    }

    let quotients = divide_out(left, &common)
        .and_then(|l| divide_out(right, &common).map(|r| (l, r)));

    let (left, right) = match quotients {
        Some(quotients) => quotients,
        None => return Reduced::unchanged(expr.clone()),
    };

    let factored = match op {
        BinaryOperation::Divide => left / right,
        _ => Expression::binary(op, left, right) * common.clone(),
    };

    tracing::trace!(expr = %expr, gcd = %common, "Factored");
    Reduced::changed(factored)
}

/// `k*(k'*u)`, `k*(u*k')`, `(k'*u)*k` and `(u*k')*k` all become
/// `(k*k')*u`.
pub(crate) fn merge_coefficients(
    left: &Arc<Expression>,
    right: &Arc<Expression>,
) -> Option<Expression> {
    let (k, product) = match (left.as_constant(), right.as_constant()) {
        (Some(k), None) => (k, right),
        (None, Some(k)) => (k, left),
        _ => return None,
    };

    let (inner_left, inner_right) = product.operands(BinaryOperation::Times)?;

    let constants = (inner_left.as_constant(), inner_right.as_constant());
    let (inner_k, u) = match constants {
        (Some(inner_k), _) => (inner_k, inner_right),
        (None, Some(inner_k)) => (inner_k, inner_left),
        (None, None) => return None,
    };

    Some(Expression::binary(
        BinaryOperation::Times,
        Expression::Constant(k * inner_k),
        Arc::clone(u),
    ))
}

/// Evaluate `left op right`, as long as the answer is a real number.
fn fold(op: BinaryOperation, left: f64, right: f64) -> Option<f64> {
    let value = op.apply(left, right);

    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}

fn rewrite(rule: &'static str, expression: Expression) -> Reduced {
    tracing::trace!(rule, result = %expression, "Rewrote");
    Reduced::changed(expression)
}

/// Reuse the original node when nothing changed.
fn rebuilt(original: &Arc<Expression>, reduced: Reduced) -> Arc<Expression> {
    if reduced.changed {
        Arc::new(reduced.expression)
    } else {
        Arc::clone(original)
    }
}

#[derive(Debug, Copy, Clone)]
struct Pass<'c> {
    config: &'c Config,
}

impl<'c> Pass<'c> {
    /// Reduce a node then try to factor it, reducing again if that worked.
    fn refine(&self, expr: &Expression, depth: usize) -> Reduced {
        if expr.is_leaf() || depth > self.config.max_depth {
            return Reduced::unchanged(expr.clone());
        }

        let reduced = self.reduce(expr, depth);
        let factored = factor(&reduced.expression);

        if factored.changed {
            let again = self.reduce(&factored.expression, depth);
            Reduced::changed(again.expression)
        } else {
            reduced
        }
    }

    fn reduce(&self, expr: &Expression, depth: usize) -> Reduced {
        match expr {
            Expression::Parameter(_) | Expression::Constant(_) => {
                Reduced::unchanged(expr.clone())
            },
            Expression::Binary { left, right, op } => match op {
                BinaryOperation::Plus => self.add(left, right, depth),
                BinaryOperation::Minus => self.subtract(left, right, depth),
                BinaryOperation::Times => self.multiply(left, right, depth),
                BinaryOperation::Divide => self.divide(left, right, depth),
                BinaryOperation::Power => self.power(left, right, depth),
            },
            Expression::Negate(inner) => self.negate(inner, depth),
            Expression::FunctionCall {
                function,
                arguments,
            } => {
                // the function itself is opaque, only its arguments are
                // reduced
                let refine =
                    |arg: &Arc<Expression>| self.refine(arg, depth + 1);
                let parallel = depth < self.config.parallel_depth;
                let reduced: Vec<Reduced> = if parallel {
                    arguments.as_slice().par_iter().map(refine).collect()
                } else {
                    arguments.iter().map(refine).collect()
                };

                let changed = reduced.iter().any(|r| r.changed);
                let arguments = arguments
                    .iter()
                    .zip(reduced)
                    .map(|(original, reduced)| rebuilt(original, reduced))
                    .collect();

                Reduced {
                    expression: Expression::FunctionCall {
                        function: *function,
                        arguments,
                    },
                    changed,
                }
            },
        }
    }

    /// Reduce both children independently and rebuild the node.
    fn descend(
        &self,
        op: BinaryOperation,
        left: &Arc<Expression>,
        right: &Arc<Expression>,
        depth: usize,
    ) -> Reduced {
        let (left_r, right_r) = if depth < self.config.parallel_depth {
            rayon::join(
                || self.refine(left, depth + 1),
                || self.refine(right, depth + 1),
            )
        } else {
            (self.refine(left, depth + 1), self.refine(right, depth + 1))
        };

        let changed = left_r.changed || right_r.changed;

        Reduced {
            expression: Expression::binary(
                op,
                rebuilt(left, left_r),
                rebuilt(right, right_r),
            ),
            changed,
        }
    }

    fn add(
        &self,
        left: &Arc<Expression>,
        right: &Arc<Expression>,
        depth: usize,
    ) -> Reduced {
        // 0 + x = x
        if left.is_zero() {
            return rewrite("0 + x = x", Expression::clone(right));
        }
        // x + 0 = x
        if right.is_zero() {
            return rewrite("x + 0 = x", Expression::clone(left));
        }

        if let (Some(l), Some(r)) = (left.as_constant(), right.as_constant()) {
            if let Some(value) = fold(BinaryOperation::Plus, l, r) {
                return rewrite("fold addition", Expression::Constant(value));
            }
        }

        if left == right {
            return rewrite(
                "x + x = 2*x",
                Expression::binary(
                    BinaryOperation::Times,
                    Expression::Constant(2.0),
                    Arc::clone(left),
                ),
            );
        }

        if let Expression::Negate(negated) = &**right {
            return rewrite(
                "x + (-y) = x - y",
                Expression::binary(
                    BinaryOperation::Minus,
                    Arc::clone(left),
                    Arc::clone(negated),
                ),
            );
        }

        self.descend(BinaryOperation::Plus, left, right, depth)
    }

    fn subtract(
        &self,
        left: &Arc<Expression>,
        right: &Arc<Expression>,
        depth: usize,
    ) -> Reduced {
        // x - 0 = x
        if right.is_zero() {
            return rewrite("x - 0 = x", Expression::clone(left));
        }

        if let (Some(l), Some(r)) = (left.as_constant(), right.as_constant()) {
            if left.is_zero() {
                return rewrite("0 - k = -k", Expression::Constant(-r));
            }
            if let Some(value) = fold(BinaryOperation::Minus, l, r) {
                return rewrite("fold subtraction", Expression::Constant(value));
            }
        }

        if left == right {
            return rewrite("x - x = 0", Expression::Constant(0.0));
        }

        // (A + B) - A = B, (A + B) - B = A
        if let Some((a, b)) = left.operands(BinaryOperation::Plus) {
            if **a == **right {
                return rewrite("(A + B) - A = B", Expression::clone(b));
            }
            if **b == **right {
                return rewrite("(A + B) - B = A", Expression::clone(a));
            }
        }

        // A - (A + B) = -B, B - (A + B) = -A
        if let Some((a, b)) = right.operands(BinaryOperation::Plus) {
            if **a == **left {
                let negated = Expression::Negate(Arc::clone(b));
                return rewrite("A - (A + B) = -B", negated);
            }
            if **b == **left {
                let negated = Expression::Negate(Arc::clone(a));
                return rewrite("B - (A + B) = -A", negated);
            }
        }

        // minus a negative is plus a positive
        if let Some(k) = right.as_constant().filter(|k| *k < 0.0) {
            return rewrite(
                "x - (-k) = x + k",
                Expression::binary(
                    BinaryOperation::Plus,
                    Arc::clone(left),
                    Expression::Constant(k.abs()),
                ),
            );
        }

        if let Some((a, b)) = right.operands(BinaryOperation::Times) {
            if let Some(k) = a.as_constant().filter(|k| *k < 0.0) {
                let positive = Expression::binary(
                    BinaryOperation::Times,
                    Expression::Constant(k.abs()),
                    Arc::clone(b),
                );
                return rewrite(
                    "x - (-k*y) = x + k*y",
                    Expression::binary(
                        BinaryOperation::Plus,
                        Arc::clone(left),
                        positive,
                    ),
                );
            }
            if let Some(k) = b.as_constant().filter(|k| *k < 0.0) {
                let positive = Expression::binary(
                    BinaryOperation::Times,
                    Arc::clone(a),
                    Expression::Constant(k.abs()),
                );
                return rewrite(
                    "x - (y*-k) = x + y*k",
                    Expression::binary(
                        BinaryOperation::Plus,
                        Arc::clone(left),
                        positive,
                    ),
                );
            }
        }

        if let Expression::Negate(negated) = &**right {
            return rewrite(
                "x - (-y) = x + y",
                Expression::binary(
                    BinaryOperation::Plus,
                    Arc::clone(left),
                    Arc::clone(negated),
                ),
            );
        }

        // 0 - x = -x
        if left.is_zero() {
            return rewrite("0 - x = -x", Expression::Negate(Arc::clone(right)));
        }

        self.descend(BinaryOperation::Minus, left, right, depth)
    }

    fn multiply(
        &self,
        left: &Arc<Expression>,
        right: &Arc<Expression>,
        depth: usize,
    ) -> Reduced {
        // 0 * x = 0
        if left.is_zero() || right.is_zero() {
            return rewrite("0 * x = 0", Expression::Constant(0.0));
        }

        // 1 * x = x
        if left.is_one() {
            return rewrite("1 * x = x", Expression::clone(right));
        }
        if right.is_one() {
            return rewrite("x * 1 = x", Expression::clone(left));
        }

        if let (Some(l), Some(r)) = (left.as_constant(), right.as_constant()) {
            if let Some(value) = fold(BinaryOperation::Times, l, r) {
                return rewrite(
                    "fold multiplication",
                    Expression::Constant(value),
                );
            }
        }

        // k * x can't be reduced any further
        match (&**left, &**right) {
            (Expression::Constant(_), Expression::Parameter(_))
            | (Expression::Parameter(_), Expression::Constant(_)) => {
                return Reduced::unchanged(Expression::binary(
                    BinaryOperation::Times,
                    Arc::clone(left),
                    Arc::clone(right),
                ));
            },
            _ => {},
        }

        if let Some(merged) = merge_coefficients(left, right) {
            return rewrite("k*(k'*x) = (k*k')*x", merged);
        }

        // A * (1/B) = A/B
        if let Some((one, b)) = right.operands(BinaryOperation::Divide) {
            if one.is_one() {
                return rewrite(
                    "A * (1/B) = A/B",
                    Expression::binary(
                        BinaryOperation::Divide,
                        Arc::clone(left),
                        Arc::clone(b),
                    ),
                );
            }
        }
        if let Some((one, b)) = left.operands(BinaryOperation::Divide) {
            if one.is_one() {
                return rewrite(
                    "(1/B) * A = A/B",
                    Expression::binary(
                        BinaryOperation::Divide,
                        Arc::clone(right),
                        Arc::clone(b),
                    ),
                );
            }
        }

        // (B/A) * A = B
        if let Some((b, a)) = left.operands(BinaryOperation::Divide) {
            if **a == **right {
                return rewrite("(B/A) * A = B", Expression::clone(b));
            }
        }
        if let Some((b, a)) = right.operands(BinaryOperation::Divide) {
            if **a == **left {
                return rewrite("A * (B/A) = B", Expression::clone(b));
            }
        }

        self.descend(BinaryOperation::Times, left, right, depth)
    }

    fn divide(
        &self,
        left: &Arc<Expression>,
        right: &Arc<Expression>,
        depth: usize,
    ) -> Reduced {
        // x / 1 = x
        if right.is_one() {
            return rewrite("x / 1 = x", Expression::clone(left));
        }

        // 0 / x = 0
        if left.is_zero() && !right.is_zero() {
            return rewrite("0 / x = 0", Expression::Constant(0.0));
        }

        if let (Some(l), Some(r)) = (left.as_constant(), right.as_constant()) {
            if let Some(value) = fold(BinaryOperation::Divide, l, r) {
                return rewrite("fold division", Expression::Constant(value));
            }
        }

        if left == right && !right.is_zero() {
            return rewrite("x / x = 1", Expression::Constant(1.0));
        }

        // (A*B)/A = B, (A*B)/B = A
        if let Some((a, b)) = left.operands(BinaryOperation::Times) {
            if **a == **right {
                return rewrite("(A*B)/A = B", Expression::clone(b));
            }
            if **b == **right {
                return rewrite("(A*B)/B = A", Expression::clone(a));
            }
        }

        // (A^B)/A = A^(B - 1)
        if let Some((a, b)) = left.operands(BinaryOperation::Power) {
            if **a == **right {
                let exponent = Expression::binary(
                    BinaryOperation::Minus,
                    Arc::clone(b),
                    Expression::Constant(1.0),
                );
                return rewrite(
                    "(A^B)/A = A^(B - 1)",
                    Expression::binary(
                        BinaryOperation::Power,
                        Arc::clone(a),
                        exponent,
                    ),
                );
            }
        }

        if let Some((y, denominator)) = left.operands(BinaryOperation::Divide) {
            // (Y/X^N)/X = Y/X^(N + 1)
            if let Some((x, n)) = denominator.operands(BinaryOperation::Power) {
                if **x == **right {
                    let exponent = Expression::binary(
                        BinaryOperation::Plus,
                        Arc::clone(n),
                        Expression::Constant(1.0),
                    );
                    return rewrite(
                        "(Y/X^N)/X = Y/X^(N + 1)",
                        Expression::binary(
                            BinaryOperation::Divide,
                            Arc::clone(y),
                            Expression::binary(
                                BinaryOperation::Power,
                                Arc::clone(right),
                                exponent,
                            ),
                        ),
                    );
                }
            }

            // (Y/X)/X = Y/X^2
            if **denominator == **right {
                return rewrite(
                    "(Y/X)/X = Y/X^2",
                    Expression::binary(
                        BinaryOperation::Divide,
                        Arc::clone(y),
                        Expression::binary(
                            BinaryOperation::Power,
                            Arc::clone(right),
                            Expression::Constant(2.0),
                        ),
                    ),
                );
            }
        }

        self.descend(BinaryOperation::Divide, left, right, depth)
    }

    fn power(
        &self,
        left: &Arc<Expression>,
        right: &Arc<Expression>,
        depth: usize,
    ) -> Reduced {
        // x^1 = x
        if right.is_one() {
            return rewrite("x^1 = x", Expression::clone(left));
        }
        // x^0 = 1
        if right.is_zero() {
            return rewrite("x^0 = 1", Expression::Constant(1.0));
        }

        if let (Some(l), Some(r)) = (left.as_constant(), right.as_constant()) {
            if let Some(value) = fold(BinaryOperation::Power, l, r) {
                return rewrite("fold power", Expression::Constant(value));
            }
        }

        // (a^b)^c = a^(b*c)
        if let Some((a, b)) = left.operands(BinaryOperation::Power) {
            let exponent = Expression::binary(
                BinaryOperation::Times,
                Arc::clone(b),
                Arc::clone(right),
            );
            return rewrite(
                "(a^b)^c = a^(b*c)",
                Expression::binary(
                    BinaryOperation::Power,
                    Arc::clone(a),
                    exponent,
                ),
            );
        }

        self.descend(BinaryOperation::Power, left, right, depth)
    }

    fn negate(&self, inner: &Arc<Expression>, depth: usize) -> Reduced {
        match &**inner {
            Expression::Constant(value) => {
                rewrite("-(k) = -k", Expression::Constant(-value))
            },
            Expression::Negate(double_negative) => {
                rewrite("-(-x) = x", Expression::clone(double_negative))
            },
            _ => {
                let reduced = self.refine(inner, depth + 1);
                let changed = reduced.changed;

                Reduced {
                    expression: Expression::Negate(rebuilt(inner, reduced)),
                    changed,
                }
            },
        }
    }
}
