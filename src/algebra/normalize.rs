//! Rewrite raw input so every binary operation is explicitly parenthesized.
//!
//! Raw input like `2x^2 + 3x` leans on implicit multiplication and the usual
//! precedence rules. The [`parse`](crate::algebra::parse()) step only ever
//! combines two operands per group, so everything gets bracketed first:
//!
//! ```rust
//! use symbolic_derivative::algebra::normalize;
//!
//! assert_eq!(normalize("2x^2 + 3x"), "0+(((2*(x^2))+(3*x)))");
//! ```
//!
//! Nothing is validated here. Input that can't be bracketed is passed through
//! (with any implicit multiplication made explicit) and the parser gets to
//! report what is wrong with it.

use crate::algebra::{function::Function, parse::number_prefix};

/// Normalize raw text into the form expected by
/// [`parse`](crate::algebra::parse()), wrapped as `0+(...)` so there is always
/// one outermost additive group.
pub fn normalize(raw: &str) -> String {
    format!("0+({})", parenthesize(raw))
}

/// Make precedence and implicit multiplication explicit, without the outer
/// `0+(...)` wrapper.
pub fn parenthesize(raw: &str) -> String {
    let tokens = with_implicit_multiplication(Tokens::new(raw).collect());

    let mut bracketer = Bracketer {
        tokens: &tokens,
        cursor: 0,
    };

    match bracketer.expression(Precedence::Additive) {
        Some(bracketed) if bracketer.is_finished() => bracketed,
        _ => render(&tokens),
    }
}

/// `2x`, `x(x + 1)`, `(x + 1)(x - 1)` and friends.
fn with_implicit_multiplication(tokens: Vec<Token<'_>>) -> Vec<Token<'_>> {
    let mut expanded = Vec::with_capacity(tokens.len());

    for token in tokens {
        let previous_ends_operand = expanded
            .last()
            .map(|prev: &Token<'_>| prev.kind.ends_operand())
            .unwrap_or(false);

        if previous_ends_operand && token.kind.starts_operand() {
            expanded.push(Token {
                text: "*",
                kind: TokenKind::Times,
            });
        }

        expanded.push(token);
    }

    expanded
}

fn render(tokens: &[Token<'_>]) -> String {
    tokens
        .iter()
        .map(|token| match token.kind {
            TokenKind::Comma => ", ",
            _ => token.text,
        })
        .collect()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Additive,
    Multiplicative,
    Exponent,
}

/// Precedence climbing over the token stream, producing the bracketed text
/// directly.
#[derive(Debug)]
struct Bracketer<'t, 'a> {
    tokens: &'t [Token<'a>],
    cursor: usize,
}

impl<'t, 'a> Bracketer<'t, 'a> {
    fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.cursor).map(|tok| tok.kind)
    }

    fn advance(&mut self) -> Option<&'t Token<'a>> {
        let token = self.tokens.get(self.cursor)?;
        self.cursor += 1;
        Some(token)
    }

    fn is_finished(&self) -> bool { self.cursor >= self.tokens.len() }

    fn expect(&mut self, kind: TokenKind) -> Option<()> {
        if self.peek()? == kind {
            self.advance();
            Some(())
        } else {
            None
        }
    }

    fn expression(&mut self, min: Precedence) -> Option<String> {
        let mut left = self.unary()?;

        while let Some((symbol, precedence)) =
            self.peek().and_then(TokenKind::binary_operator)
        {
            if precedence < min {
                break;
            }
            self.advance();

            // exponents are right-associative
            let right = if precedence == Precedence::Exponent {
                self.expression(Precedence::Exponent)?
            } else {
                self.expression(precedence.tighter())?
            };

            left = format!("({}{}{})", left, symbol, right);
        }

        Some(left)
    }

    fn unary(&mut self) -> Option<String> {
        match self.peek()? {
            TokenKind::Minus => {
                self.advance();
                let operand = self.expression(Precedence::Exponent)?;
                Some(format!("(-{})", operand))
            },
            TokenKind::Plus => {
                self.advance();
                self.expression(Precedence::Exponent)
            },
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Option<String> {
        let token = self.advance()?;

        match token.kind {
            TokenKind::Number | TokenKind::Letter => {
                Some(token.text.to_string())
            },
            TokenKind::OpenParen => {
                let inner = self.expression(Precedence::Additive)?;
                self.expect(TokenKind::CloseParen)?;
                Some(inner)
            },
            TokenKind::Function(function) => {
                self.expect(TokenKind::OpenParen)?;
                let mut arguments =
                    vec![self.expression(Precedence::Additive)?];

                while self.peek() == Some(TokenKind::Comma) {
                    self.advance();
                    arguments.push(self.expression(Precedence::Additive)?);
                }

                self.expect(TokenKind::CloseParen)?;
                Some(format!("{}({})", function, arguments.join(", ")))
            },
            _ => None,
        }
    }
}

impl Precedence {
    fn tighter(self) -> Precedence {
        match self {
            Precedence::Additive => Precedence::Multiplicative,
            Precedence::Multiplicative | Precedence::Exponent => {
                Precedence::Exponent
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Tokens<'a> {
    src: &'a str,
    cursor: usize,
}

impl<'a> Tokens<'a> {
    fn new(src: &'a str) -> Self { Tokens { src, cursor: 0 } }

    fn rest(&self) -> &'a str { &self.src[self.cursor..] }

    fn peek(&self) -> Option<char> { self.rest().chars().next() }

    fn chomp_bytes(&mut self, length: usize, kind: TokenKind) -> Token<'a> {
        let start = self.cursor;
        self.cursor += length;

        Token {
            text: &self.src[start..self.cursor],
            kind,
        }
    }

    fn chomp(&mut self, kind: TokenKind) -> Option<Token<'a>> {
        let length = self.peek()?.len_utf8();
        Some(self.chomp_bytes(length, kind))
    }

    /// A function name only counts when it's being called.
    fn function_call(&self) -> Option<Function> {
        let rest = self.rest();
        let function = Function::longest_prefix(rest)?;
        let after_name = rest[function.name().len()..].trim_start();

        if after_name.starts_with('(') {
            Some(function)
        } else {
            None
        }
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.peek()? {
                space if space.is_whitespace() => {
                    self.cursor += space.len_utf8();
                    continue;
                },
                '(' => self.chomp(TokenKind::OpenParen),
                ')' => self.chomp(TokenKind::CloseParen),
                ',' => self.chomp(TokenKind::Comma),
                '+' => self.chomp(TokenKind::Plus),
                '-' => self.chomp(TokenKind::Minus),
                '*' => self.chomp(TokenKind::Times),
                '/' => self.chomp(TokenKind::Divide),
                '^' => self.chomp(TokenKind::Caret),
                '0'..='9' | '.' => match number_prefix(self.rest()) {
                    0 => self.chomp(TokenKind::Unknown),
                    length => Some(self.chomp_bytes(length, TokenKind::Number)),
                },
                'a'..='z' | 'A'..='Z' => match self.function_call() {
                    Some(function) => Some(self.chomp_bytes(
                        function.name().len(),
                        TokenKind::Function(function),
                    )),
                    None => self.chomp(TokenKind::Letter),
                },
                _ => self.chomp(TokenKind::Unknown),
            };
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token<'a> {
    text: &'a str,
    kind: TokenKind,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum TokenKind {
    Number,
    Letter,
    Function(Function),
    OpenParen,
    CloseParen,
    Comma,
    Plus,
    Minus,
    Times,
    Divide,
    Caret,
    Unknown,
}

impl TokenKind {
    fn binary_operator(self) -> Option<(char, Precedence)> {
        match self {
            TokenKind::Plus => Some(('+', Precedence::Additive)),
            TokenKind::Minus => Some(('-', Precedence::Additive)),
            TokenKind::Times => Some(('*', Precedence::Multiplicative)),
            TokenKind::Divide => Some(('/', Precedence::Multiplicative)),
            TokenKind::Caret => Some(('^', Precedence::Exponent)),
            _ => None,
        }
    }

    fn ends_operand(self) -> bool {
        match self {
            TokenKind::Number
            | TokenKind::Letter
            | TokenKind::CloseParen => true,
            _ => false,
        }
    }

    fn starts_operand(self) -> bool {
        match self {
            TokenKind::Number
            | TokenKind::Letter
            | TokenKind::Function(_)
            | TokenKind::OpenParen => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! normalize_test {
        ($name:ident, $src:expr, $should_be:expr) => {
            #[test]
            fn $name() {
                let got = normalize($src);
                assert_eq!(got, $should_be);
            }
        };
    }

    normalize_test!(constant, "3", "0+(3)");
    normalize_test!(single_variable, "x", "0+(x)");
    normalize_test!(left_associative_sum, "1 + 2 - 3", "0+(((1+2)-3))");
    normalize_test!(products_bind_tighter, "1 + 2*x", "0+((1+(2*x)))");
    normalize_test!(powers_bind_tightest, "2*x^3", "0+((2*(x^3)))");
    normalize_test!(powers_are_right_associative, "x^2^3", "0+((x^(2^3)))");
    normalize_test!(implicit_coefficient, "3x^2", "0+((3*(x^2)))");
    normalize_test!(implicit_product_of_letters, "xy", "0+((x*y))");
    normalize_test!(
        implicit_product_with_group,
        "2(x + 1)",
        "0+((2*(x+1)))"
    );
    normalize_test!(
        adjacent_groups,
        "(x + 1)(x - 1)",
        "0+(((x+1)*(x-1)))"
    );
    normalize_test!(unary_minus, "-x^2", "0+((-(x^2)))");
    normalize_test!(unary_minus_after_operator, "2/-x", "0+((2/(-x)))");
    normalize_test!(unary_plus_is_dropped, "+x", "0+(x)");
    normalize_test!(redundant_parens, "((x))", "0+(x)");
    normalize_test!(
        mixed_sum,
        "2/x+(-3/x^2)+6*x",
        "0+((((2/x)+((-3)/(x^2)))+(6*x)))"
    );
    normalize_test!(function_call, "sin(2x)", "0+(sin((2*x)))");
    normalize_test!(
        function_with_base,
        "log(x,2)",
        "0+(log(x, 2))"
    );
    normalize_test!(longest_function_name, "log10(x)", "0+(log10(x))");
    normalize_test!(
        coefficient_before_function,
        "3cos(x)",
        "0+((3*cos(x)))"
    );
    normalize_test!(thousands_separator, "1,000x", "0+((1,000*x))");
    normalize_test!(unbalanced_is_passed_through, "(x+1", "0+((x+1)");
    normalize_test!(empty_group_is_passed_through, "()", "0+(())");
    normalize_test!(unknown_characters_are_kept, "x % 2", "0+(x%2)");

    #[test]
    fn function_names_need_an_argument_list() {
        // without the parens this is just a product of letters
        assert_eq!(normalize("sinx"), "0+((((s*i)*n)*x))");
    }
}
