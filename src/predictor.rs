// =============================================================================
// Prediction client - forwards reading batches to the prediction service
// =============================================================================
//
// Wire contract: POST http://{host}:{port}/predict with a JSON body
// `{"symbol": ..., "data": [Reading...]}`; the service answers with a JSON
// Prediction. While its model is still warming up the service answers 200
// with an `error` body instead, which is treated as a failed call.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, instrument};

use crate::types::{Prediction, Reading};

/// Capability that turns a batch of readings into a prediction.
///
/// Failures are recovered locally by the caller: reported and dropped, never
/// fed back into scheduling or the history store.
#[async_trait]
pub trait Forwarder: Send + Sync {
    async fn predict(&self, symbol: &str, readings: &[Reading]) -> Result<Prediction>;
}

/// HTTP client for the prediction service's `POST /predict` endpoint.
#[derive(Clone)]
pub struct PredictionClient {
    client: reqwest::Client,
    base_url: String,
}

impl PredictionClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_base_url(format!("http://{host}:{port}"))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client for PredictionClient");

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Forwarder for PredictionClient {
    #[instrument(skip(self, readings), name = "predictor::predict")]
    async fn predict(&self, symbol: &str, readings: &[Reading]) -> Result<Prediction> {
        let url = format!("{}/predict", self.base_url);
        let payload = json!({ "symbol": symbol, "data": readings });

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("POST /predict for {symbol}"))?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse prediction response body")?;

        let prediction = parse_prediction_body(symbol, status, body)?;

        debug!(
            symbol = %prediction.symbol,
            predicted = prediction.predicted_price,
            "prediction received"
        );
        Ok(prediction)
    }
}

/// Interpret the prediction service's response.
fn parse_prediction_body(
    symbol: &str,
    status: reqwest::StatusCode,
    body: serde_json::Value,
) -> Result<Prediction> {
    if !status.is_success() {
        anyhow::bail!("prediction service returned {}: {}", status, body);
    }

    // The service answers 200 with an error body while its model is still
    // training.
    if let Some(err) = body.get("error").and_then(|v| v.as_str()) {
        anyhow::bail!("prediction service rejected {symbol}: {err}");
    }

    serde_json::from_value(body).context("prediction response did not match expected schema")
}

// =============================================================================
// Tests
// =============================================================================
