//! Retry budgets for the two nested scopes.

use serde::Serialize;

/// Which budget a retry is charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScopeKind {
    /// Outer scope: 429 responses only.
    TooManyRequests,
    /// Inner scope: general-transient failures. Reset by every outer retry.
    Transient,
}

/// A retry counter with a fixed budget. Call-local; never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryScope {
    pub kind: ScopeKind,
    pub attempts_used: usize,
    pub max_attempts: usize,
}

impl RetryScope {
    pub fn new(kind: ScopeKind, max_attempts: usize) -> Self {
        Self {
            kind,
            attempts_used: 0,
            max_attempts,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts_used >= self.max_attempts
    }

    /// Charge one retry. Returns the 0-based index of that retry within the scope.
    pub fn consume(&mut self) -> usize {
        let index = self.attempts_used;
        self.attempts_used += 1;
        index
    }

    pub fn reset(&mut self) {
        self.attempts_used = 0;
    }
}
