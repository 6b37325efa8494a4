// =============================================================================
// Shared types used across the QuotePulse collector
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped price/volume observation for one symbol.
///
/// Immutable once constructed: appended to the history store and shipped to
/// the prediction service in batches, never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reading {
    pub symbol: String,
    pub price: f64,
    pub volume: i64,
    /// Serialized as an RFC 3339 string on the wire.
    pub timestamp: DateTime<Utc>,
}

/// One prediction returned by the prediction service.
///
/// Consumed transiently: logged and kept in the recent-predictions ring for
/// the dashboard, never written back into the history store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub symbol: String,
    pub current_price: f64,
    pub predicted_price: f64,
    pub predicted_change: f64,
    pub predicted_change_percent: f64,
    pub timestamp: DateTime<Utc>,
}
