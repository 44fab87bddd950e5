//! Usage and cost accounting.
//!
//! [`UsageStats`] is the running counter a coordinator carries through a run. Every model
//! response and every worker sub-run produces an increment that is folded in with
//! [`UsageStats::merge`]. The delta fields (`calls`, `tokens_in`, `tokens_out`, `cost_delta`)
//! are plain sums. `cost_total` is the cumulative figure carried forward: each merge sets it to
//! the previous total plus the merged `cost_delta`, so after any sequence of merges it equals
//! the seed's `cost_total` plus every merged `cost_delta`.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Token usage reported by a single model response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    /// Number of model calls this usage represents (normally 1)
    #[serde(default)]
    pub calls: u64,
    /// Prompt tokens sent
    #[serde(default)]
    pub tokens_in: u64,
    /// Completion tokens received
    #[serde(default)]
    pub tokens_out: u64,
}

impl ModelUsage {
    /// Usage of a single call with the given token counts.
    pub fn single_call(tokens_in: u64, tokens_out: u64) -> Self {
        Self {
            calls: 1,
            tokens_in,
            tokens_out,
        }
    }
}

/// Per-token pricing, supplied by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Price of one prompt token
    pub price_in: f64,
    /// Price of one completion token
    pub price_out: f64,
}

impl PricingPolicy {
    /// Create a pricing policy from per-token rates.
    pub fn new(price_in: f64, price_out: f64) -> Self {
        Self {
            price_in,
            price_out,
        }
    }

    /// Pricing that charges nothing; useful for local models and tests.
    pub fn free() -> Self {
        Self::default()
    }

    /// Cost of the given usage: `tokens_in * price_in + tokens_out * price_out`.
    pub fn cost(&self, usage: &ModelUsage) -> f64 {
        usage.tokens_in as f64 * self.price_in + usage.tokens_out as f64 * self.price_out
    }

    /// Convert a model usage report into a stats increment.
    pub fn price(&self, usage: &ModelUsage) -> UsageStats {
        let cost = self.cost(usage);
        UsageStats {
            calls: usage.calls,
            tokens_in: usage.tokens_in,
            tokens_out: usage.tokens_out,
            cost_delta: cost,
            cost_total: cost,
        }
    }
}

/// Running usage statistics for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Model calls made
    #[serde(default)]
    pub calls: u64,
    /// Prompt tokens consumed
    #[serde(default)]
    pub tokens_in: u64,
    /// Completion tokens produced
    #[serde(default)]
    pub tokens_out: u64,
    /// Cost accumulated by the merges folded into this value
    #[serde(default)]
    pub cost_delta: f64,
    /// Cumulative cost, carried forward from the most recent merge
    #[serde(default)]
    pub cost_total: f64,
}

impl UsageStats {
    /// Zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed statistics for a run, as supplied by a caller.
    pub fn seeded(calls: u64, cost_total: f64) -> Self {
        Self {
            calls,
            cost_total,
            ..Self::default()
        }
    }

    /// Fold an increment into this value.
    ///
    /// Delta fields add pointwise; `cost_total` becomes the previous total plus the
    /// increment's `cost_delta`.
    pub fn merge(&mut self, other: &UsageStats) {
        self.calls = self.calls.saturating_add(other.calls);
        self.tokens_in = self.tokens_in.saturating_add(other.tokens_in);
        self.tokens_out = self.tokens_out.saturating_add(other.tokens_out);
        self.cost_delta += other.cost_delta;
        self.cost_total += other.cost_delta;
    }

    /// Return a copy with `other` merged in.
    pub fn merged(mut self, other: &UsageStats) -> Self {
        self.merge(other);
        self
    }

    /// A zero-delta value carrying only this value's cumulative cost.
    ///
    /// Used to seed a nested run: its increments start from zero while cost limits still see
    /// the cumulative spend of the enclosing run.
    pub fn baseline(&self) -> Self {
        Self {
            cost_total: self.cost_total,
            ..Self::default()
        }
    }

    /// Whether no usage has been recorded in the delta fields.
    pub fn is_empty(&self) -> bool {
        self.calls == 0 && self.tokens_in == 0 && self.tokens_out == 0 && self.cost_delta == 0.0
    }
}

impl AddAssign<&UsageStats> for UsageStats {
    fn add_assign(&mut self, rhs: &UsageStats) {
        self.merge(rhs);
    }
}

impl Add<&UsageStats> for UsageStats {
    type Output = UsageStats;

    fn add(self, rhs: &UsageStats) -> UsageStats {
        self.merged(rhs)
    }
}
