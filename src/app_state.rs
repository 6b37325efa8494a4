// =============================================================================
// Central application state - QuotePulse collector
// =============================================================================
//
// The single source of truth shared across all async tasks via
// `Arc<AppState>`.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the bounded prediction/error rings.
//   - The history store manages its own interior synchronization.
//   - The configuration is read-only after startup and needs none.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::market_data::HistoryStore;
use crate::runtime_config::RuntimeConfig;
use crate::types::{Prediction, Reading};

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Maximum number of recent predictions to retain.
const MAX_RECENT_PREDICTIONS: usize = 100;

/// A recorded error event for the dashboard error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

/// Central application state shared across all async tasks.
pub struct AppState {
    /// Monotonically increasing version counter, incremented on every
    /// meaningful state mutation.
    pub state_version: AtomicU64,

    /// Static startup configuration.
    pub config: RuntimeConfig,

    /// Bounded per-symbol reading history.
    pub history: Arc<HistoryStore>,

    /// Most recent predictions returned by the forwarder (newest last).
    pub recent_predictions: RwLock<Vec<Prediction>>,

    /// Most recent fetch/forward errors (newest last).
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    /// Instant when the service was started. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given configuration. The returned
    /// value is typically wrapped in `Arc` immediately.
    pub fn new(config: RuntimeConfig) -> Self {
        let history = Arc::new(HistoryStore::new(config.history_capacity));

        Self {
            state_version: AtomicU64::new(1),
            config,
            history,
            recent_predictions: RwLock::new(Vec::new()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version management ──────────────────────────────────────────────

    /// Atomically increment the state version.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error logging ───────────────────────────────────────────────────

    /// Record an error message. The ring is capped at [`MAX_RECENT_ERRORS`];
    /// oldest entries are evicted when the limit is reached.
    pub fn push_error(&self, message: String) {
        let record = ErrorRecord {
            message,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }

        self.increment_version();
    }

    // ── Prediction log ──────────────────────────────────────────────────

    /// Record a prediction. The ring is capped at
    /// [`MAX_RECENT_PREDICTIONS`]; oldest entries are evicted when the limit
    /// is reached.
    pub fn push_prediction(&self, prediction: Prediction) {
        let mut predictions = self.recent_predictions.write();
        predictions.push(prediction);
        while predictions.len() > MAX_RECENT_PREDICTIONS {
            predictions.remove(0);
        }

        self.increment_version();
    }

    // ── Snapshot builder ────────────────────────────────────────────────

    /// Build the serialisable snapshot served by `GET /api/v1/state`.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let mut symbols = HashMap::new();
        for symbol in &self.config.symbols {
            symbols.insert(
                symbol.clone(),
                SymbolStatus {
                    history_len: self.history.len(symbol),
                    last_reading: self.history.last(symbol),
                },
            );
        }

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            symbols,
            recent_predictions: self.recent_predictions.read().clone(),
            recent_errors: self.recent_errors.read().clone(),
            config: ConfigSummary {
                symbols: self.config.symbols.clone(),
                fetch_interval_secs: self.config.fetch_interval_secs,
                history_capacity: self.config.history_capacity,
                forward_threshold: self.config.forward_threshold,
                predictor_host: self.config.predictor_host.clone(),
                predictor_port: self.config.predictor_port,
            },
        }
    }
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

/// Full collector state snapshot sent to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub uptime_seconds: u64,
    pub symbols: HashMap<String, SymbolStatus>,
    pub recent_predictions: Vec<Prediction>,
    pub recent_errors: Vec<ErrorRecord>,
    pub config: ConfigSummary,
}

/// Collection status for one tracked symbol.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolStatus {
    pub history_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reading: Option<Reading>,
}

/// Summary of the static configuration for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub symbols: Vec<String>,
    pub fetch_interval_secs: u64,
    pub history_capacity: usize,
    pub forward_threshold: usize,
    pub predictor_host: String,
    pub predictor_port: u16,
}

// =============================================================================
// Tests
// =============================================================================
