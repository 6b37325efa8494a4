// =============================================================================
// Quote source - turns a symbol into a fresh market reading
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

use crate::types::Reading;

/// Capability that produces one fresh reading for a symbol.
///
/// Implementations may be slow or fail transiently. Callers treat every
/// failure as skip-this-cycle; the next scheduled tick is the retry.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, symbol: &str) -> Result<Reading>;
}

/// Quote client backed by the Yahoo Finance chart API.
pub struct YahooQuoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooQuoteClient {
    pub fn new() -> Self {
        Self::with_base_url("https://query1.finance.yahoo.com")
    }

    /// Override the API host (used by tests against a local stub).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0")
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client for YahooQuoteClient");

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl Default for YahooQuoteClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteClient {
    #[instrument(skip(self), name = "yahoo::fetch")]
    async fn fetch(&self, symbol: &str) -> Result<Reading> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET quote for {symbol}"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse quote response body")?;

        if !status.is_success() {
            anyhow::bail!("quote API returned {}: {}", status, body);
        }

        let (price, volume) = parse_chart_meta(symbol, &body)?;

        let reading = Reading {
            symbol: symbol.to_string(),
            price,
            volume,
            timestamp: Utc::now(),
        };
        debug!(symbol, price, volume, "quote fetched");
        Ok(reading)
    }
}

/// Extract price and volume from the chart response's meta block.
///
/// A missing, unparseable, or non-positive price fails the fetch; a
/// zero-valued reading is never fabricated from a partial response. Volume
/// must be present but may legitimately be zero outside trading hours.
fn parse_chart_meta(symbol: &str, body: &serde_json::Value) -> Result<(f64, i64)> {
    let meta = &body["chart"]["result"][0]["meta"];

    let price = meta["regularMarketPrice"]
        .as_f64()
        .with_context(|| format!("quote for {symbol} missing regularMarketPrice"))?;
    if price <= 0.0 {
        anyhow::bail!("quote for {symbol} has non-positive price {price}");
    }

    let volume = meta["regularMarketVolume"]
        .as_i64()
        .with_context(|| format!("quote for {symbol} missing regularMarketVolume"))?;

    Ok((price, volume))
}

// =============================================================================
// Tests
// =============================================================================
