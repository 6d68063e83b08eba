//! Going from text to a function and its derivative.

use crate::{
    algebra::{
        derive, normalize, reduce_lambda, Lambda, ParseError, Parser,
        UnsupportedConstruct,
    },
    config::Config,
};
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedConstruct),
}

/// Read the right-hand side of `f(x) = ...` and reduce it.
pub fn read(text: &str, config: &Config) -> Result<Lambda, Error> {
    let normalized = normalize(text);
    tracing::debug!(%text, %normalized, "Normalized the input");

    let function = Parser::new(&normalized)
        .max_depth(config.max_depth)
        .parse()?;
    let (function, _) = reduce_lambda(&function, config);

    Ok(function)
}

/// Read a function and work out its derivative.
pub fn differentiate(text: &str, config: &Config) -> Result<Derivation, Error> {
    let function = read(text, config)?;
    Derivation::of(function, config)
}

/// A reduced function alongside its reduced derivative.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub function: Lambda,
    pub derivative: Lambda,
}

impl Derivation {
    pub fn of(function: Lambda, config: &Config) -> Result<Derivation, Error> {
        let (derivative, changed) = reduce_lambda(&derive(&function)?, config);
        tracing::debug!(%function, %derivative, changed, "Differentiated");

        Ok(Derivation {
            function,
            derivative,
        })
    }

    /// Differentiate the derivative.
    pub fn next(&self, config: &Config) -> Result<Derivation, Error> {
        Derivation::of(self.derivative.clone(), config)
    }
}

impl Display for Derivation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.function)?;
        write!(f, "{}'", self.derivative)
    }
}
