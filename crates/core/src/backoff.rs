// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff for failed layers and runs
//!
//! `backoff(base, n)` is `base` for `n == 0` and `base × ⌊eⁿ⌋` otherwise.
//! There is no cap and no jitter. Values too large to represent saturate at
//! `Duration::MAX`.

use std::time::Duration;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Wait duration after `failure_count` consecutive failures
pub fn backoff(base: Duration, failure_count: u32) -> Duration {
    if failure_count == 0 {
        return base;
    }
    // f64 -> u128 casts saturate, and exp() of a large count is +inf
    let factor = f64::from(failure_count).exp().trunc() as u128;
    match base.as_nanos().checked_mul(factor) {
        Some(nanos) => from_nanos_saturating(nanos),
        None => Duration::MAX,
    }
}

/// Backoff for an optional counter, where absence means no failure yet
pub fn backoff_opt(base: Duration, failure_count: Option<u32>) -> Duration {
    backoff(base, failure_count.unwrap_or(0))
}

fn from_nanos_saturating(nanos: u128) -> Duration {
    let secs = nanos / NANOS_PER_SEC;
    let sub = (nanos % NANOS_PER_SEC) as u32;
    match u64::try_from(secs) {
        Ok(secs) => Duration::new(secs, sub),
        Err(_) => Duration::MAX,
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
