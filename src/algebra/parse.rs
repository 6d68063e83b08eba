use crate::{
    algebra::{
        function::Function, normalize::parenthesize, BinaryOperation,
        Expression, Lambda, Parameter,
    },
    config::Config,
};
use std::{str::FromStr, sync::Arc};
use thiserror::Error;

/// Parse a [`Lambda`] from text that has already been through
/// [`normalize`](crate::algebra::normalize()).
pub fn parse(normalized: &str) -> Result<Lambda, ParseError> {
    Parser::new(normalized).parse()
}

/// A recursive descent parser for fully parenthesized text.
///
/// Rather than using a precedence table, the parser is driven by parenthesis
/// depth. Each group (the text between a `(` and its matching `)`) is parsed
/// on its own and folded into a running left-hand operand using whichever
/// operator came before it.
///
/// ```text
/// group    := operand (OPERATOR operand)*
/// operand  := "-" operand
///           | "+" operand
///           | "(" group ")"
///           | FUNCTION "(" group ("," group)* ")"
///           | NUMBER
///           | LETTER
/// ```
///
/// Operators within a group are folded left to right with no notion of
/// precedence, which is why the input needs to be normalized first.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    src: &'a str,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Parser {
            src,
            max_depth: Config::default().max_depth,
        }
    }

    /// Reject input nested more than `max_depth` groups deep.
    pub fn max_depth(self, max_depth: usize) -> Self {
        Parser { max_depth, ..self }
    }

    /// Parse the whole input as the body of a single-parameter function.
    ///
    /// The parameter is `x` when the body mentions it, otherwise whichever
    /// letter appears first.
    pub fn parse(self) -> Result<Lambda, ParseError> {
        let body = self.parse_expression()?;

        let x = Parameter::named("x");
        let parameter = if body.depends_on(&x) {
            x
        } else {
            body.first_parameter().cloned().unwrap_or(x)
        };

        Ok(Lambda::new(parameter, body))
    }

    pub fn parse_expression(&self) -> Result<Expression, ParseError> {
        self.group(0, self.src.len(), 0)
    }

    /// Parse `src[start..end]`, which must not contain unmatched parens.
    fn group(
        &self,
        start: usize,
        end: usize,
        depth: usize,
    ) -> Result<Expression, ParseError> {
        if depth > self.max_depth {
            return Err(ParseError::NestingTooDeep {
                limit: self.max_depth,
            });
        }

        let mut acc = Accumulator::default();
        let mut cursor = start;

        while cursor < end {
            let rest = &self.src[cursor..end];
            let c = match rest.chars().next() {
                Some(c) => c,
                None => break,
            };

            match c {
                space if space.is_whitespace() => {
                    cursor += space.len_utf8();
                },
                '(' => {
                    let close = self.matching_paren(cursor, end)?;
                    let inner = self.group(cursor + 1, close, depth + 1)?;
                    acc.operand(inner, cursor)?;
                    cursor = close + 1;
                },
                ')' => {
                    return Err(ParseError::UnbalancedParenthesis {
                        index: cursor,
                    })
                },
                '+' | '-' | '*' | '/' | '^' => {
                    acc.operator(c, cursor)?;
                    cursor += 1;
                },
                'a'..='z' | 'A'..='Z' => match function_at(rest) {
                    Some(function) => {
                        let (call, next) =
                            self.function_call(function, cursor, end, depth)?;
                        acc.operand(call, cursor)?;
                        cursor = next;
                    },
                    None => {
                        let param = Parameter::named(&rest[..1]);
                        acc.operand(Expression::Parameter(param), cursor)?;
                        cursor += 1;
                    },
                },
                '0'..='9' | '.' => {
                    let length = number_prefix(rest);
                    if length == 0 {
                        return Err(ParseError::UnexpectedCharacter {
                            character: c,
                            index: cursor,
                        });
                    }

                    let text = &rest[..length];
                    let value = text.replace(',', "").parse().map_err(|_| {
                        ParseError::InvalidNumber {
                            text: text.to_string(),
                            index: cursor,
                        }
                    })?;

                    acc.operand(Expression::Constant(value), cursor)?;
                    cursor += length;
                },
                other => {
                    return Err(ParseError::UnexpectedCharacter {
                        character: other,
                        index: cursor,
                    })
                },
            }
        }

        acc.finish(start, end)
    }

    /// Find the `)` which closes the `(` at `open`.
    fn matching_paren(
        &self,
        open: usize,
        end: usize,
    ) -> Result<usize, ParseError> {
        let mut depth = 0;

        for (i, c) in self.src[open..end].char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(open + i);
                    }
                },
                _ => {},
            }
        }

        Err(ParseError::UnbalancedParenthesis { index: open })
    }

    /// Parse `name(arg, ...)` starting at `start`, returning the call and the
    /// index just after its closing paren.
    fn function_call(
        &self,
        function: Function,
        start: usize,
        end: usize,
        depth: usize,
    ) -> Result<(Expression, usize), ParseError> {
        let after_name = start + function.name().len();
        let open = after_name
            + self.src[after_name..end]
                .find('(')
                .ok_or(ParseError::MissingOperand { index: after_name })?;
        let close = self.matching_paren(open, end)?;

        let mut arguments = Vec::new();
        for (arg_start, arg_end) in split_arguments(self.src, open + 1, close) {
            arguments.push(self.group(arg_start, arg_end, depth + 1)?);
        }

        if !function.accepts(arguments.len()) {
            return Err(ParseError::WrongArity {
                function,
                found: arguments.len(),
                index: start,
            });
        }

        let call = Expression::FunctionCall {
            function,
            arguments: arguments.into_iter().map(Arc::new).collect(),
        };

        Ok((call, close + 1))
    }
}

/// Split the text between a call's parens at top-level commas.
fn split_arguments(src: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0;
    let mut arg_start = start;

    for (i, c) in src[start..end].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            // a thousands separator is never followed by whitespace
            ','
                if depth == 0
                    && !is_thousands_separator(&src[start + i..end]) =>
            {
                spans.push((arg_start, start + i));
                arg_start = start + i + 1;
            },
            _ => {},
        }
    }

    spans.push((arg_start, end));
    spans
}

fn is_thousands_separator(from_comma: &str) -> bool {
    let digits = from_comma[1..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    digits == 3
}

/// Which function (if any) is being called at the start of `src`?
fn function_at(src: &str) -> Option<Function> {
    let function = Function::longest_prefix(src)?;

    if src[function.name().len()..].trim_start().starts_with('(') {
        Some(function)
    } else {
        None
    }
}

/// The length of the number at the start of `src`, allowing `,`-separated
/// thousands groups (`1,234,567`) and a decimal portion (`3.14`, `5.`,
/// `.5`). Returns `0` if there is no number.
pub(crate) fn number_prefix(src: &str) -> usize {
    let bytes = src.as_bytes();
    let digits_from = |start: usize| {
        bytes
            .get(start..)
            .unwrap_or_default()
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    let leading = digits_from(0);
    let mut end = leading;

    if (1..=3).contains(&leading) {
        while bytes.get(end) == Some(&b',') && digits_from(end + 1) == 3 {
            end += 4;
        }
    }

    let mut fraction = 0;
    if bytes.get(end) == Some(&b'.') {
        fraction = digits_from(end + 1);
        end += 1 + fraction;
    }

    if leading == 0 && fraction == 0 {
        0
    } else {
        end
    }
}

/// The left-hand operand for the group currently being parsed, plus whatever
/// operator is waiting for its right-hand side.
#[derive(Debug, Default)]
struct Accumulator {
    left: Option<Expression>,
    pending: Option<BinaryOperation>,
    negations: usize,
}

impl Accumulator {
    fn expecting_operand(&self) -> bool {
        self.left.is_none() || self.pending.is_some()
    }

    fn operator(
        &mut self,
        symbol: char,
        index: usize,
    ) -> Result<(), ParseError> {
        if self.expecting_operand() {
            return match symbol {
                '-' => {
                    self.negations += 1;
                    Ok(())
                },
                '+' => Ok(()),
                _ => Err(ParseError::MissingOperand { index }),
            };
        }

        self.pending = BinaryOperation::from_symbol(symbol);
        debug_assert!(self.pending.is_some());

        Ok(())
    }

    fn operand(
        &mut self,
        mut operand: Expression,
        index: usize,
    ) -> Result<(), ParseError> {
        for _ in 0..self.negations {
            operand = Expression::Negate(Arc::new(operand));
        }
        self.negations = 0;

        self.left = match (self.left.take(), self.pending.take()) {
            (None, _) => Some(operand),
            (Some(left), Some(op)) => {
                Some(Expression::binary(op, left, operand))
            },
            (Some(_), None) => {
                return Err(ParseError::MissingOperator { index })
            },
        };

        Ok(())
    }

    fn finish(
        self,
        start: usize,
        end: usize,
    ) -> Result<Expression, ParseError> {
        if self.negations > 0 || self.pending.is_some() {
            return Err(ParseError::MissingOperand { index: end });
        }

        self.left.ok_or(ParseError::EmptyGroup { index: start })
    }
}

/// Parse raw (un-normalized) text into an [`Expression`].
impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parser::new(&parenthesize(s)).parse_expression()
    }
}

/// Possible errors that may occur while parsing.
///
/// Indices are byte offsets into the text handed to the [`Parser`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("the parenthesis at {index} is never matched")]
    UnbalancedParenthesis { index: usize },
    #[error("unexpected character, {character:?}, at {index}")]
    UnexpectedCharacter { character: char, index: usize },
    #[error("the group starting at {index} is empty")]
    EmptyGroup { index: usize },
    #[error("expected an operand at {index}")]
    MissingOperand { index: usize },
    #[error("expected an operator at {index}")]
    MissingOperator { index: usize },
    #[error("\"{text}\" at {index} isn't a valid number")]
    InvalidNumber { text: String, index: usize },
    #[error("{function} doesn't accept {found} argument(s) (at {index})")]
    WrongArity {
        function: Function,
        found: usize,
        index: usize,
    },
    #[error("the expression is nested more than {limit} levels deep")]
    NestingTooDeep { limit: usize },
}


#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! parser_test {
        ($name:ident, $src:expr) => {
            parser_test!($name, $src, $src);
        };
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let got = Parser::new($src).parse_expression().unwrap();

                let round_tripped = got.to_string();
                assert_eq!(round_tripped, $should_be);
            }
        };
    }

    parser_test!(simple_integer, "1");
    parser_test!(wrapped_constant, "0+(3)", "0 + 3");
    parser_test!(one_plus_one, "(1+1)", "1 + 1");
    parser_test!(left_fold_within_a_group, "1+2*3", "(1 + 2)*3");
    parser_test!(nested_groups, "((1+2)*(x^2))", "(1 + 2)*(x^2)");
    parser_test!(number_in_parens, "(1)", "1");
    parser_test!(negative_one, "(-1)", "-1");
    parser_test!(double_negative, "--x", "-(-x)");
    parser_test!(negative_operand, "2*(-x)", "2*(-x)");
    parser_test!(thousands_separator, "1,000*x", "1000*x");
    parser_test!(decimal, "0.5*x", "0.5*x");
    parser_test!(whitespace_is_ignored, " ( x + 1 ) ", "x + 1");
    parser_test!(function_call, "sin(x)");
    parser_test!(function_call_with_group, "cos((2*x))", "cos(2*x)");
    parser_test!(log_with_base, "log(x, 2)");
    parser_test!(log10, "log10((x+1))", "log10(x + 1)");

    macro_rules! parse_error_test {
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let got = Parser::new($src).parse_expression().unwrap_err();
                assert_eq!(got, $should_be);
            }
        };
    }

    parse_error_test!(
        unclosed_paren,
        "0+((x+1)",
        ParseError::UnbalancedParenthesis { index: 2 }
    );
    parse_error_test!(
        unopened_paren,
        "x+1)",
        ParseError::UnbalancedParenthesis { index: 3 }
    );
    parse_error_test!(empty_group, "0+()", ParseError::EmptyGroup { index: 3 });
    parse_error_test!(empty_input, "", ParseError::EmptyGroup { index: 0 });
    parse_error_test!(
        unknown_character,
        "0+(x%2)",
        ParseError::UnexpectedCharacter {
            character: '%',
            index: 4
        }
    );
    parse_error_test!(
        trailing_operator,
        "(x+)",
        ParseError::MissingOperand { index: 3 }
    );
    parse_error_test!(
        leading_binary_operator,
        "*x",
        ParseError::MissingOperand { index: 0 }
    );
    parse_error_test!(
        two_operands_in_a_row,
        "x 2",
        ParseError::MissingOperator { index: 2 }
    );
    parse_error_test!(
        bare_dot,
        "x*.",
        ParseError::UnexpectedCharacter {
            character: '.',
            index: 2
        }
    );
    parse_error_test!(
        too_many_arguments,
        "sin(x, 2)",
        ParseError::WrongArity {
            function: Function::Sine,
            found: 2,
            index: 0
        }
    );

    #[test]
    fn deep_nesting_is_rejected() {
        let src = format!("{}x{}", "(".repeat(10), ")".repeat(10));

        let got = Parser::new(&src).max_depth(5).parse_expression();

        assert_eq!(got, Err(ParseError::NestingTooDeep { limit: 5 }));
        assert!(Parser::new(&src).max_depth(10).parse_expression().is_ok());
    }

    #[test]
    fn lambda_binds_the_referenced_letter() {
        let inputs = vec![
            ("0+((2*x))", "x"),
            ("0+((a*x))", "x"),
            ("0+((t^2))", "t"),
            ("0+(3)", "x"),
        ];

        for (src, should_be) in inputs {
            let got = parse(src).unwrap();
            assert_eq!(got.parameter().name(), should_be);
        }
    }

    #[test]
    fn parse_raw_text() {
        let got: Expression = "2x^2 - 3".parse().unwrap();

        let x = Expression::Parameter(Parameter::named("x"));
        let should_be = Expression::from(2.0) * x.pow(Expression::from(2.0))
            - Expression::from(3.0);
        assert_eq!(got, should_be);
    }
}
