// =============================================================================
// Collection engine - per-symbol periodic fetch loops
// =============================================================================
//
// One tokio task per tracked symbol, spawned at startup and running for the
// process lifetime. Each tick fetches a fresh reading, appends it to the
// history store, and once enough history exists hands the current window to
// the forwarder on a detached task, so forward latency or failure can never
// delay the next fetch tick.
// =============================================================================

use std::sync::Arc;

use tokio::time::{interval, Duration};
use tracing::{info, warn};

use crate::app_state::AppState;
use crate::market_data::QuoteSource;
use crate::predictor::Forwarder;

/// Spawn one collection task per configured symbol.
pub fn spawn_collectors(
    state: &Arc<AppState>,
    source: Arc<dyn QuoteSource>,
    forwarder: Arc<dyn Forwarder>,
) {
    for symbol in state.config.symbols.clone() {
        let state = state.clone();
        let source = source.clone();
        let forwarder = forwarder.clone();
        tokio::spawn(async move {
            run_symbol_loop(state, source, forwarder, symbol).await;
        });
    }
}

/// Periodic fetch loop for one symbol. Never returns; a failed fetch only
/// skips the current cycle and the next tick is the retry.
async fn run_symbol_loop(
    state: Arc<AppState>,
    source: Arc<dyn QuoteSource>,
    forwarder: Arc<dyn Forwarder>,
    symbol: String,
) {
    let mut ticker = interval(Duration::from_secs(state.config.fetch_interval_secs));
    info!(
        symbol = %symbol,
        interval_secs = state.config.fetch_interval_secs,
        "collector started"
    );

    loop {
        // The first tick completes immediately, so the initial fetch happens
        // at task start rather than one interval in.
        ticker.tick().await;
        collect_once(&state, source.as_ref(), &forwarder, &symbol).await;
    }
}

/// One fetch-append-forward cycle. Returns whether a forward was triggered.
async fn collect_once(
    state: &Arc<AppState>,
    source: &dyn QuoteSource,
    forwarder: &Arc<dyn Forwarder>,
    symbol: &str,
) -> bool {
    match source.fetch(symbol).await {
        Ok(reading) => {
            state.history.append(reading);
            state.increment_version();

            // Every successful append at or past the threshold re-triggers
            // a forward; no forward is attempted before it.
            if state.history.len(symbol) >= state.config.forward_threshold {
                spawn_forward(state.clone(), forwarder.clone(), symbol.to_string());
                return true;
            }
            false
        }
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "fetch failed, skipping cycle");
            state.push_error(format!("fetch {symbol}: {e}"));
            false
        }
    }
}

/// Hand the current window to the forwarder on a detached task. Failures are
/// observed only through the log and the error ring, never by the fetch loop.
fn spawn_forward(state: Arc<AppState>, forwarder: Arc<dyn Forwarder>, symbol: String) {
    tokio::spawn(async move {
        let Some(window) = state.history.snapshot(&symbol) else {
            return;
        };

        match forwarder.predict(&symbol, &window).await {
            Ok(prediction) => {
                info!(
                    symbol = %prediction.symbol,
                    current = prediction.current_price,
                    predicted = prediction.predicted_price,
                    change_pct = prediction.predicted_change_percent,
                    "prediction received"
                );
                state.push_prediction(prediction);
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "forward failed");
                state.push_error(format!("forward {symbol}: {e}"));
            }
        }
    });
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::runtime_config::RuntimeConfig;
    use crate::types::{Prediction, Reading};

    /// Returns prices 100.0, 101.0, 102.0, ... on successive fetches.
    struct SequencedSource {
        next: AtomicUsize,
    }

    impl SequencedSource {
        fn new() -> Self {
            Self {
                next: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QuoteSource for SequencedSource {
        async fn fetch(&self, symbol: &str) -> Result<Reading> {
            let n = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(Reading {
                symbol: symbol.to_string(),
                price: 100.0 + n as f64,
                volume: 1_000,
                timestamp: Utc::now(),
            })
        }
    }

    struct FailingSource;

    #[async_trait]
    impl QuoteSource for FailingSource {
        async fn fetch(&self, _symbol: &str) -> Result<Reading> {
            Err(anyhow!("simulated outage"))
        }
    }

    /// Fails for one symbol, succeeds for all others.
    struct PartialSource {
        broken: &'static str,
    }

    #[async_trait]
    impl QuoteSource for PartialSource {
        async fn fetch(&self, symbol: &str) -> Result<Reading> {
            if symbol == self.broken {
                return Err(anyhow!("simulated outage"));
            }
            Ok(Reading {
                symbol: symbol.to_string(),
                price: 42.0,
                volume: 10,
                timestamp: Utc::now(),
            })
        }
    }

    struct CountingForwarder {
        calls: AtomicUsize,
    }

    impl CountingForwarder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Forwarder for CountingForwarder {
        async fn predict(&self, symbol: &str, readings: &[Reading]) -> Result<Prediction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = readings.last().map(|r| r.price).unwrap_or_default();
            Ok(Prediction {
                symbol: symbol.to_string(),
                current_price: current,
                predicted_price: current + 1.0,
                predicted_change: 1.0,
                predicted_change_percent: 100.0 / current,
                timestamp: Utc::now(),
            })
        }
    }

    fn test_state() -> Arc<AppState> {
        // Default config: threshold 5, capacity 100.
        Arc::new(AppState::new(RuntimeConfig::default()))
    }

    #[tokio::test]
    async fn forwards_only_at_threshold() {
        let state = test_state();
        let source = SequencedSource::new();
        let counting = Arc::new(CountingForwarder::new());
        let forwarder: Arc<dyn Forwarder> = counting.clone();

        for n in 0..4 {
            let triggered = collect_once(&state, &source, &forwarder, "AAPL").await;
            assert!(!triggered, "no forward expected at {} readings", n + 1);
        }
        assert_eq!(state.history.len("AAPL"), 4);

        // The 5th and 6th appends both re-trigger a forward.
        assert!(collect_once(&state, &source, &forwarder, "AAPL").await);
        assert!(collect_once(&state, &source, &forwarder, "AAPL").await);

        let snap = state.history.snapshot("AAPL").unwrap();
        let prices: Vec<f64> = snap.iter().map(|r| r.price).collect();
        assert_eq!(prices, vec![100.0, 101.0, 102.0, 103.0, 104.0, 105.0]);

        // Detached forward tasks need a moment to run.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.recent_predictions.read().len(), 2);
    }

    #[tokio::test]
    async fn failed_fetch_skips_the_cycle() {
        let state = test_state();
        let forwarder: Arc<dyn Forwarder> = Arc::new(CountingForwarder::new());

        let triggered = collect_once(&state, &FailingSource, &forwarder, "AAPL").await;

        assert!(!triggered);
        assert_eq!(state.history.len("AAPL"), 0);
        assert!(state.history.snapshot("AAPL").is_none());
        assert_eq!(state.recent_errors.read().len(), 1);
    }

    #[tokio::test]
    async fn failing_symbol_does_not_affect_others() {
        let state = test_state();
        let source = PartialSource { broken: "AAPL" };
        let forwarder: Arc<dyn Forwarder> = Arc::new(CountingForwarder::new());

        for _ in 0..3 {
            collect_once(&state, &source, &forwarder, "AAPL").await;
            collect_once(&state, &source, &forwarder, "MSFT").await;
        }

        assert_eq!(state.history.len("AAPL"), 0);
        assert_eq!(state.history.len("MSFT"), 3);
        assert_eq!(state.recent_errors.read().len(), 3);
    }

    #[tokio::test]
    async fn forward_failure_leaves_history_untouched() {
        struct RejectingForwarder;

        #[async_trait]
        impl Forwarder for RejectingForwarder {
            async fn predict(&self, symbol: &str, _readings: &[Reading]) -> Result<Prediction> {
                Err(anyhow!("prediction service rejected {symbol}"))
            }
        }

        let state = test_state();
        let source = SequencedSource::new();
        let forwarder: Arc<dyn Forwarder> = Arc::new(RejectingForwarder);

        for _ in 0..5 {
            collect_once(&state, &source, &forwarder, "AAPL").await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The forward error is recorded, the history is intact, and no
        // prediction was stored.
        assert_eq!(state.history.len("AAPL"), 5);
        assert!(state.recent_predictions.read().is_empty());
        assert!(!state.recent_errors.read().is_empty());
    }
}
