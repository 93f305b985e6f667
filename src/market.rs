//! Public market data from the exchange
//!
//! Only the last-price ticker is proxied; no auth, no caching.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const TICKER_PRICE_PATH: &str = "/api/v3/ticker/price";

#[derive(Debug, Error)]
pub enum MarketError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid symbol or exchange API error (HTTP {status})")]
    InvalidSymbol { symbol: String, status: StatusCode },
    #[error("Failed to parse ticker response: {0}")]
    Parse(String),
}

/// Raw ticker as Binance sends it (price is a decimal string)
#[derive(Debug, Deserialize)]
struct RawTicker {
    symbol: String,
    price: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: f64,
}

#[derive(Clone)]
pub struct MarketData {
    client: Client,
    base_url: String,
}

impl MarketData {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Latest traded price for `symbol` (upper-cased before the request)
    pub async fn ticker_price(&self, symbol: &str) -> Result<TickerPrice, MarketError> {
        let symbol = symbol.trim().to_ascii_uppercase();

        let response = self
            .client
            .get(format!("{}{}", self.base_url, TICKER_PRICE_PATH))
            .query(&[("symbol", symbol.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("Ticker lookup for {} failed: {} {}", symbol, status, body);
            return Err(MarketError::InvalidSymbol { symbol, status });
        }

        let raw: RawTicker = response
            .json()
            .await
            .map_err(|e| MarketError::Parse(e.to_string()))?;
        debug!("Ticker {} = {}", raw.symbol, raw.price);

        let price = raw
            .price
            .parse::<f64>()
            .map_err(|e| MarketError::Parse(format!("price {:?}: {}", raw.price, e)))?;

        Ok(TickerPrice {
            symbol: raw.symbol,
            price,
        })
    }
}
