//! Simplifier configuration.
//!
//! Built explicitly with a bon builder or read from the environment.

use std::sync::OnceLock;

use bon::bon;

const DEFAULT_MAX_ROUNDS: usize = 64;

/// Knobs for [`Simplifier`](super::Simplifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimplifyConfig {
    /// Cap on div/mod recombination rounds per sum.
    pub max_rounds: usize,
    /// Eliminate floor div/mod whose numerator range fits in one quotient bucket.
    pub use_bounds: bool,
}

impl Default for SimplifyConfig {
    fn default() -> Self {
        Self { max_rounds: DEFAULT_MAX_ROUNDS, use_bounds: true }
    }
}

#[bon]
impl SimplifyConfig {
    #[builder]
    pub fn new(#[builder(default = DEFAULT_MAX_ROUNDS)] max_rounds: usize, #[builder(default = true)] use_bounds: bool) -> Self {
        Self { max_rounds, use_bounds }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `TESSEL_SIMPLIFY_ROUNDS=N` - recombination round cap (default 64)
    /// * `TESSEL_SIMPLIFY_NO_BOUNDS` - disable range-based elimination when set
    pub fn from_env() -> Self {
        let max_rounds =
            std::env::var("TESSEL_SIMPLIFY_ROUNDS").ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_MAX_ROUNDS);
        let use_bounds = std::env::var("TESSEL_SIMPLIFY_NO_BOUNDS").is_err();

        Self { max_rounds, use_bounds }
    }

    /// Process-wide configuration, read from the environment on first use.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<SimplifyConfig> = OnceLock::new();
        *GLOBAL.get_or_init(Self::from_env)
    }
}
