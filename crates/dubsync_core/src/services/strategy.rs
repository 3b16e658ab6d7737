//! Ordered fallback over interchangeable strategies.
//!
//! "Try provider A, then B" is expressed as a [`StrategyChain`]: named
//! strategies share one `attempt() -> Result<T, E>` contract and are tried
//! in order until one succeeds.

use std::fmt;

type Attempt<'a, T, E> = Box<dyn FnMut() -> Result<T, E> + 'a>;

/// A value produced by the first successful strategy.
#[derive(Debug)]
pub struct StrategySuccess<T, E> {
    /// Name of the strategy that succeeded.
    pub name: String,
    pub value: T,
    /// Strategies that failed before it, in order.
    pub failures: Vec<(String, E)>,
}

/// Every strategy failed.
#[derive(Debug)]
pub struct StrategyExhausted<E> {
    pub failures: Vec<(String, E)>,
}

impl<E: fmt::Display> fmt::Display for StrategyExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failures.is_empty() {
            return write!(f, "no strategies configured");
        }
        let parts: Vec<String> = self
            .failures
            .iter()
            .map(|(name, err)| format!("{}: {}", name, err))
            .collect();
        write!(f, "all strategies failed ({})", parts.join("; "))
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for StrategyExhausted<E> {}

/// Ordered list of fallible strategies.
pub struct StrategyChain<'a, T, E> {
    strategies: Vec<(String, Attempt<'a, T, E>)>,
}

impl<'a, T, E> Default for StrategyChain<'a, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, E> StrategyChain<'a, T, E> {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Append a strategy tried after all previously added ones.
    pub fn then(
        mut self,
        name: impl Into<String>,
        attempt: impl FnMut() -> Result<T, E> + 'a,
    ) -> Self {
        self.strategies.push((name.into(), Box::new(attempt)));
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Try each strategy in order, stopping at the first success.
    pub fn run(self) -> Result<StrategySuccess<T, E>, StrategyExhausted<E>> {
        let mut failures = Vec::new();
        for (name, mut attempt) in self.strategies {
            match attempt() {
                Ok(value) => {
                    return Ok(StrategySuccess {
                        name,
                        value,
                        failures,
                    })
                }
                Err(e) => {
                    tracing::debug!("Strategy '{}' failed", name);
                    failures.push((name, e));
                }
            }
        }
        Err(StrategyExhausted { failures })
    }
}
