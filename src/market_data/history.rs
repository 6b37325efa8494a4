// =============================================================================
// HistoryStore - bounded per-symbol reading history
// =============================================================================

use std::collections::{HashMap, VecDeque};

use parking_lot::RwLock;

use crate::types::Reading;

/// Thread-safe bounded history of readings, keyed by symbol.
///
/// A single coarse `RwLock` guards the whole map. At one append per symbol
/// per fetch interval the write critical section is a push plus a trim, so
/// cross-symbol contention is negligible at this throughput. Entries are
/// created lazily on the first successful reading for a symbol and live for
/// the process lifetime.
pub struct HistoryStore {
    series: RwLock<HashMap<String, VecDeque<Reading>>>,
    capacity: usize,
}

impl HistoryStore {
    /// Create a store that retains at most `capacity` readings per symbol.
    pub fn new(capacity: usize) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Append a reading to its symbol's series. Once the series exceeds
    /// capacity the oldest entries are evicted, so the most recent
    /// `capacity` readings remain in insertion order.
    pub fn append(&self, reading: Reading) {
        let mut map = self.series.write();
        let ring = map
            .entry(reading.symbol.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.capacity));

        ring.push_back(reading);
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    /// Cloned copy of the current series, oldest first.
    ///
    /// Returns `None` when the symbol has never produced a reading, which is
    /// distinct from an observed-but-empty series (the store never holds an
    /// empty entry since entries are only created on append).
    pub fn snapshot(&self, symbol: &str) -> Option<Vec<Reading>> {
        let map = self.series.read();
        map.get(symbol).map(|ring| ring.iter().cloned().collect())
    }

    /// Number of readings currently held for `symbol` (0 when unknown).
    /// Cheaper than a full snapshot for threshold checks.
    pub fn len(&self, symbol: &str) -> usize {
        let map = self.series.read();
        map.get(symbol).map_or(0, VecDeque::len)
    }

    /// The most recent reading for `symbol`, if any.
    pub fn last(&self, symbol: &str) -> Option<Reading> {
        let map = self.series.read();
        map.get(symbol).and_then(|ring| ring.back().cloned())
    }

    /// Symbols that have at least one recorded reading.
    pub fn symbols(&self) -> Vec<String> {
        self.series.read().keys().cloned().collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// =============================================================================
// Tests
// =============================================================================
