//! Knobs for the parser and the reducer.

/// Limits applied while parsing and reducing.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// The maximum number of passes [`crate::algebra::reduce_to_fixed_point()`]
    /// will make before giving up and returning what it has.
    pub max_passes: usize,
    /// How deep parentheses may nest when parsing, and how deep the reducer
    /// will walk into a tree.
    pub max_depth: usize,
    /// Sibling subtrees shallower than this are reduced in parallel.
    pub parallel_depth: usize,
}

impl Config {
    pub const DEFAULT_MAX_PASSES: usize = 256;
    pub const DEFAULT_MAX_DEPTH: usize = 512;
    pub const DEFAULT_PARALLEL_DEPTH: usize = 4;

    pub fn with_max_passes(self, max_passes: usize) -> Self {
        Config { max_passes, ..self }
    }

    pub fn with_max_depth(self, max_depth: usize) -> Self {
        Config { max_depth, ..self }
    }

    pub fn with_parallel_depth(self, parallel_depth: usize) -> Self {
        Config {
            parallel_depth,
            ..self
        }
    }

    /// Never use more than the current thread.
    pub fn sequential(self) -> Self { self.with_parallel_depth(0) }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_passes: Config::DEFAULT_MAX_PASSES,
            max_depth: Config::DEFAULT_MAX_DEPTH,
            parallel_depth: Config::DEFAULT_PARALLEL_DEPTH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_only_touch_their_own_field() {
        let got = Config::default().with_max_passes(3).sequential();

        assert_eq!(
            got,
            Config {
                max_passes: 3,
                max_depth: Config::DEFAULT_MAX_DEPTH,
                parallel_depth: 0,
            }
        );
    }
}
