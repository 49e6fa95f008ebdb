//! Token usage and cost tracking for reasoning calls.
//!
//! Provides a thread-safe [`CostTracker`] that records the token usage
//! reported for each reasoning call and prices it with a per-model table
//! of per-million-token rates (prompt, cached prompt, completion). The
//! summary ends up in the run's `metadata.json`.
//!
//! All monetary calculations use [`rust_decimal::Decimal`] for financial
//! precision -- no floating-point arithmetic.

use std::fmt;
use std::sync::Mutex;

use evac_core::decision::TokenUsage;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

/// One million, used as the denominator for per-million-token pricing.
const ONE_MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Per-million-token rates for one model, in dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPrice {
    /// Uncached prompt tokens.
    pub prompt: Decimal,
    /// Prompt tokens served from the provider's cache.
    pub cached: Decimal,
    /// Completion tokens.
    pub completion: Decimal,
}

impl ModelPrice {
    /// Rates in hundred-thousandths of a dollar, e.g. `15_000` is $0.15.
    fn micros(prompt: i64, cached: i64, completion: i64) -> Self {
        Self {
            prompt: Decimal::new(prompt, 5),
            cached: Decimal::new(cached, 5),
            completion: Decimal::new(completion, 5),
        }
    }

    /// Dollar cost of one call.
    fn cost_of(&self, usage: &TokenUsage) -> Decimal {
        let part = |tokens: u64, rate: Decimal| {
            Decimal::from(tokens)
                .checked_div(ONE_MILLION)
                .unwrap_or(Decimal::ZERO)
                .checked_mul(rate)
                .unwrap_or(Decimal::ZERO)
        };
        part(usage.prompt_tokens, self.prompt)
            .checked_add(part(usage.cached_tokens, self.cached))
            .and_then(|sum| sum.checked_add(part(usage.completion_tokens, self.completion)))
            .unwrap_or(Decimal::ZERO)
    }
}

/// Known model prices, matched on the model identifier.
///
/// More specific identifiers come first so `gpt-4o-mini` is not priced as
/// `gpt-4o`.
fn price_table() -> [(&'static str, ModelPrice); 7] {
    [
        ("gpt-4o-mini", ModelPrice::micros(15_000, 7_500, 60_000)),
        ("gpt-4o", ModelPrice::micros(250_000, 125_000, 1_000_000)),
        ("gpt-4.5", ModelPrice::micros(7_500_000, 3_750_000, 15_000_000)),
        ("gpt-4.1-mini", ModelPrice::micros(40_000, 10_000, 160_000)),
        ("gpt-4.1-nano", ModelPrice::micros(10_000, 3_000, 40_000)),
        ("google/gemini-2.5-flash-preview", ModelPrice::micros(15_000, 0, 60_000)),
        ("deepseek/deepseek-chat", ModelPrice::micros(38_000, 0, 89_000)),
    ]
}

/// Look up the price for a model. Dated snapshots such as
/// `gpt-4o-mini-2024-07-18` match their base identifier.
pub fn price_for(model: &str) -> Option<ModelPrice> {
    let table = price_table();
    table
        .iter()
        .find(|(name, _)| *name == model)
        .or_else(|| table.iter().find(|(name, _)| model.starts_with(name)))
        .map(|(_, price)| *price)
}

/// Thread-safe token usage and cost tracker.
///
/// Safe to share via `Arc<CostTracker>` across agent decision tasks.
#[derive(Debug, Default)]
pub struct CostTracker {
    inner: Mutex<CostTrackerInner>,
}

/// Mutable accumulation state held inside the mutex.
#[derive(Debug, Default)]
struct CostTrackerInner {
    model: Option<String>,
    total_requests: u64,
    prompt_tokens: u64,
    cached_tokens: u64,
    completion_tokens: u64,
    total_cost: Decimal,
    warned_unpriced: bool,
}

/// Snapshot of the tracker, written as `llm_usage` in `metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostSummary {
    /// Model of the most recent call, empty before the first one.
    pub model: String,
    /// Uncached prompt tokens across all calls.
    pub prompt_tokens: u64,
    /// Cached prompt tokens across all calls.
    pub cached_tokens: u64,
    /// Completion tokens across all calls.
    pub completion_tokens: u64,
    /// Number of reasoning calls that returned a reply.
    pub total_requests: u64,
    /// Estimated cost in dollars.
    #[serde(rename = "total_cost_usd")]
    pub total_cost: Decimal,
}

impl CostTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed call.
    ///
    /// Unknown models are counted with zero cost and a single warning.
    /// Token totals saturate instead of overflowing.
    pub fn record(&self, model: &str, usage: &TokenUsage) {
        let price = price_for(model);

        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        if price.is_none() && !inner.warned_unpriced {
            inner.warned_unpriced = true;
            warn!(model, "no price known for model, cost will be reported as zero");
        }
        let call_cost = price.map_or(Decimal::ZERO, |p| p.cost_of(usage));

        inner.model = Some(model.to_owned());
        inner.total_requests = inner.total_requests.saturating_add(1);
        inner.prompt_tokens = inner.prompt_tokens.saturating_add(usage.prompt_tokens);
        inner.cached_tokens = inner.cached_tokens.saturating_add(usage.cached_tokens);
        inner.completion_tokens = inner.completion_tokens.saturating_add(usage.completion_tokens);
        inner.total_cost = inner
            .total_cost
            .checked_add(call_cost)
            .unwrap_or(inner.total_cost);
    }

    /// Return a snapshot of the current totals.
    ///
    /// Returns a zeroed summary if the mutex is poisoned.
    pub fn summary(&self) -> CostSummary {
        let Ok(inner) = self.inner.lock() else {
            return CostSummary {
                model: String::new(),
                prompt_tokens: 0,
                cached_tokens: 0,
                completion_tokens: 0,
                total_requests: 0,
                total_cost: Decimal::ZERO,
            };
        };

        CostSummary {
            model: inner.model.clone().unwrap_or_default(),
            prompt_tokens: inner.prompt_tokens,
            cached_tokens: inner.cached_tokens,
            completion_tokens: inner.completion_tokens,
            total_requests: inner.total_requests,
            total_cost: inner.total_cost,
        }
    }
}

impl fmt::Display for CostSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM usage ({}): {} requests | {} prompt tokens, {} cached, {} completion | \
             estimated cost: ${}",
            if self.model.is_empty() { "none" } else { &self.model },
            self.total_requests,
            self.prompt_tokens,
            self.cached_tokens,
            self.completion_tokens,
            self.total_cost,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn usage(prompt: u64, cached: u64, completion: u64) -> TokenUsage {
        TokenUsage {
            prompt_tokens: prompt,
            cached_tokens: cached,
            completion_tokens: completion,
        }
    }

    #[test]
    fn price_lookup_prefers_specific_names() {
        let Some(mini) = price_for("gpt-4o-mini") else {
            panic!("gpt-4o-mini should be priced");
        };
        assert_eq!(mini.prompt, Decimal::new(15, 2));
        assert_eq!(mini.cached, Decimal::new(75, 3));
        assert_eq!(mini.completion, Decimal::new(60, 2));

        let Some(full) = price_for("gpt-4o-2024-08-06") else {
            panic!("dated gpt-4o should be priced");
        };
        assert_eq!(full.prompt, Decimal::new(250, 2));
        assert!(price_for("mystery-model").is_none());
    }

    #[test]
    fn record_single_call() {
        let tracker = CostTracker::new();
        tracker.record("gpt-4o-mini", &usage(1_000_000, 1_000_000, 1_000_000));
        let summary = tracker.summary();

        assert_eq!(summary.model, "gpt-4o-mini");
        assert_eq!(summary.total_requests, 1);
        // 0.15 + 0.075 + 0.60
        assert_eq!(summary.total_cost, Decimal::new(825, 3));
    }

    #[test]
    fn record_multiple_calls_accumulates() {
        let tracker = CostTracker::new();
        tracker.record("deepseek/deepseek-chat", &usage(1000, 0, 200));
        tracker.record("deepseek/deepseek-chat", &usage(1000, 50, 200));
        let summary = tracker.summary();

        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.prompt_tokens, 2000);
        assert_eq!(summary.cached_tokens, 50);
        assert_eq!(summary.completion_tokens, 400);
        assert!(summary.total_cost > Decimal::ZERO);
    }

    #[test]
    fn unknown_model_counts_tokens_at_zero_cost() {
        let tracker = CostTracker::new();
        tracker.record("local-llama", &usage(5000, 0, 500));
        let summary = tracker.summary();

        assert_eq!(summary.total_requests, 1);
        assert_eq!(summary.prompt_tokens, 5000);
        assert_eq!(summary.total_cost, Decimal::ZERO);
    }

    #[test]
    fn summary_serializes_for_metadata() {
        let tracker = CostTracker::new();
        tracker.record("gpt-4o-mini", &usage(10, 0, 10));
        let json = serde_json::to_value(tracker.summary()).unwrap_or_default();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["total_requests"], 1);
        assert!(json.get("total_cost_usd").is_some());
    }

    #[test]
    fn summary_display_format() {
        let tracker = CostTracker::new();
        assert!(format!("{}", tracker.summary()).contains("(none)"));

        tracker.record("gpt-4.1-nano", &usage(1000, 0, 200));
        let display = format!("{}", tracker.summary());
        assert!(display.contains("1 requests"));
        assert!(display.contains("1000 prompt tokens"));
        assert!(display.contains("200 completion"));
        assert!(display.contains("estimated cost: $"));
    }

    #[test]
    fn thread_safety_concurrent_recording() {
        use std::sync::Arc;
        use std::thread;

        let tracker = Arc::new(CostTracker::new());
        let mut handles = Vec::new();

        for _ in 0..10 {
            let t = Arc::clone(&tracker);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    t.record("gpt-4o-mini", &usage(1000, 0, 200));
                }
            }));
        }

        for handle in handles {
            handle.join().ok();
        }

        let summary = tracker.summary();
        assert_eq!(summary.total_requests, 1000);
        assert_eq!(summary.prompt_tokens, 1_000_000);
        assert_eq!(summary.completion_tokens, 200_000);
    }
}
