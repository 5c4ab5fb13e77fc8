// src/quant/retry.rs

use std::thread;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// State of one sample's retry loop. The number is the attempt it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Attempting(u32),
    Succeeded(u32),
    Exhausted(u32),
}

impl AttemptState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptState::Attempting(_))
    }
}

/// Bounded retry with a constant (non-exponential) delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least 1.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Transition taken once the attempt held by `state` has finished.
    pub fn next(&self, state: AttemptState, succeeded: bool) -> AttemptState {
        match state {
            AttemptState::Attempting(n) if succeeded => AttemptState::Succeeded(n),
            AttemptState::Attempting(n) if n >= self.max_attempts => AttemptState::Exhausted(n),
            AttemptState::Attempting(n) => AttemptState::Attempting(n + 1),
            terminal => terminal,
        }
    }

    /// Calls `attempt(n)` for n = 1, 2, ... until it returns true or the bound
    /// is reached, sleeping `backoff` between failed attempts. Blocks the
    /// calling thread.
    pub fn run<F>(&self, label: &str, mut attempt: F) -> AttemptState
    where
        F: FnMut(u32) -> bool,
    {
        let mut state = AttemptState::Attempting(1);
        while let AttemptState::Attempting(n) = state {
            let ok = attempt(n);
            state = self.next(state, ok);

            if let AttemptState::Attempting(upcoming) = state {
                log::warn!(
                    "{label}: attempt {n}/{} failed, retrying in {}s (attempt {upcoming})",
                    self.max_attempts,
                    self.backoff.as_secs_f64()
                );
                if !self.backoff.is_zero() {
                    thread::sleep(self.backoff);
                }
            }
        }
        state
    }
}
