pub mod history;
pub mod quote_source;

// Re-export for convenient access (e.g. `use crate::market_data::HistoryStore`).
pub use history::HistoryStore;
pub use quote_source::{QuoteSource, YahooQuoteClient};
