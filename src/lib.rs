//! Differentiate single-variable functions symbolically.
//!
//! ```rust
//! use symbolic_derivative::{config::Config, pipeline};
//!
//! let got = pipeline::differentiate("x^2 + sin(x)", &Config::default())?;
//!
//! assert_eq!(got.derivative.body().to_string(), "(2*x) + cos(x)");
//! # Ok::<(), symbolic_derivative::pipeline::Error>(())
//! ```

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod algebra;
pub mod config;
pub mod pipeline;
mod proptests;

pub use algebra::{Expression, Lambda, Parameter};
pub use config::Config;
pub use pipeline::{differentiate, read, Derivation, Error};
