//! Exchange rate lookup
//!
//! Read-only price query keyed by asset id. Callers must fetch a fresh
//! rate for every new submission; a rate observed for one transfer request
//! is never reused for another.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RateError {
    #[error("Rate unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for RateError {
    fn from(e: reqwest::Error) -> Self {
        RateError::Unavailable(e.to_string())
    }
}

/// Current market price of the native asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRate {
    /// Fiat (USD) price of one whole native unit.
    pub fiat_per_native: Decimal,
    pub observed_at: DateTime<Utc>,
}

/// Source of submission-time exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rate(&self) -> Result<ExchangeRate, RateError>;
}

/// Rate provider backed by a simple-price HTTP endpoint.
///
/// Reply shape: `{ "<asset-id>": { "usd": <float> } }`.
pub struct HttpRateProvider {
    http: reqwest::Client,
    endpoint: String,
    asset_id: String,
}

impl HttpRateProvider {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>, asset_id: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            asset_id: asset_id.into(),
        }
    }

    fn parse_reply(&self, body: &Value) -> Result<Decimal, RateError> {
        let usd = body
            .get(&self.asset_id)
            .and_then(|asset| asset.get("usd"))
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                RateError::Unavailable(format!("no usd price for {} in reply", self.asset_id))
            })?;

        Decimal::from_f64(usd)
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| RateError::Unavailable(format!("unusable price: {usd}")))
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_rate(&self) -> Result<ExchangeRate, RateError> {
        let url = format!(
            "{}?ids={}&vs_currencies=usd",
            self.endpoint, self.asset_id
        );
        let body: Value = self.http.get(&url).send().await?.json().await?;
        let fiat_per_native = self.parse_reply(&body)?;

        debug!(asset = %self.asset_id, price = %fiat_per_native, "Fetched exchange rate");

        Ok(ExchangeRate {
            fiat_per_native,
            observed_at: Utc::now(),
        })
    }
}

/// Fixed-rate provider for tests and offline demo runs.
pub struct FixedRateProvider {
    pub fiat_per_native: Decimal,
}

#[async_trait]
impl RateProvider for FixedRateProvider {
    async fn fetch_rate(&self) -> Result<ExchangeRate, RateError> {
        Ok(ExchangeRate {
            fiat_per_native: self.fiat_per_native,
            observed_at: Utc::now(),
        })
    }
}
