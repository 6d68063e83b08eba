//! The symbolic algebra system.
//!
//! Text goes through [`normalize()`] and [`parse()`] to become a [`Lambda`],
//! which can then be differentiated with [`derive()`] and tidied up with
//! [`reduce_lambda()`].

mod derive;
mod expand;
mod expr;
pub mod function;
pub mod gcd;
mod normalize;
pub mod ops;
mod parse;
mod simplify;

pub use derive::{derivative, derive, UnsupportedConstruct};
pub use expand::{expand_once, expand_to_fixed_point};
pub use expr::{Arguments, BinaryOperation, Expression, Lambda, Parameter};
pub use function::Function;
pub use gcd::gcd;
pub use normalize::{normalize, parenthesize};
pub use ops::EvaluationError;
pub use parse::{parse, ParseError, Parser};
pub use simplify::{
    factor, reduce_lambda, reduce_once, reduce_to_fixed_point, Reduced,
};
