//! Order Execution - Binance spot REST
//!
//! Builds and sends a signed `POST /api/v3/order` for one user's credentials.
//! The exchange response is returned verbatim; nothing is retried.

use crate::auth::{timestamp_ms, AuthError, BinanceAuth, API_KEY_HEADER};
use crate::types::{OrderSide, OrderType, TimeInForce};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const ORDER_PATH: &str = "/api/v3/order";

// ==========================================
// Error Types
// ==========================================

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Order rejected by exchange ({code}): {msg}")]
    Rejected { code: i64, msg: String },
    #[error("Exchange unavailable ({status}): {body}")]
    Upstream { status: u16, body: String },
    #[error("Failed to parse exchange response: {0}")]
    Parse(String),
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

/// Error body returned by Binance on 4xx/5xx
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    msg: String,
}

// ==========================================
// Order Request
// ==========================================

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub stop_price: Option<Decimal>,
}

impl OrderRequest {
    /// Exchange parameters in send order, without `recvWindow`/`timestamp`.
    ///
    /// `price` and `timeInForce` are only included for types that accept them.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", self.symbol.to_ascii_uppercase()),
            ("side", self.side.to_string()),
            ("type", self.order_type.to_string()),
        ];

        if self.order_type.takes_time_in_force() {
            params.push(("timeInForce", self.time_in_force.to_string()));
        }

        params.push(("quantity", decimal_param(self.quantity)));

        if self.order_type.takes_price() {
            if let Some(price) = self.price {
                params.push(("price", decimal_param(price)));
            }
        }

        if let Some(stop_price) = self.stop_price {
            params.push(("stopPrice", decimal_param(stop_price)));
        }

        params
    }
}

fn decimal_param(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn encode_query(params: &[(&str, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
        .finish()
}

// ==========================================
// Executor
// ==========================================

/// Sends signed orders to the exchange. Cheap to clone; holds one pooled client.
#[derive(Clone)]
pub struct OrderExecutor {
    client: Client,
    base_url: String,
    recv_window_ms: u64,
}

impl OrderExecutor {
    pub fn new(base_url: impl Into<String>, recv_window_ms: u64, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into(),
            recv_window_ms,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Place one order and return the exchange's JSON response
    pub async fn place_order(
        &self,
        auth: &BinanceAuth,
        order: &OrderRequest,
    ) -> Result<Value, ExchangeError> {
        let mut params = order.params();
        params.push(("recvWindow", self.recv_window_ms.to_string()));
        params.push(("timestamp", timestamp_ms().to_string()));

        let body = auth.signed_query(&encode_query(&params))?;

        info!(
            "Placing {} {} {} qty={} on exchange (key {})",
            order.side,
            order.order_type,
            order.symbol,
            order.quantity,
            auth.api_key_redacted()
        );

        let response = self
            .client
            .post(format!("{}{}", self.base_url, ORDER_PATH))
            .header(API_KEY_HEADER, auth.api_key())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        debug!("Order response ({}): {}", status, text);

        if !status.is_success() {
            // Only a 4xx carrying {code,msg} is the exchange refusing the order
            let api_error = serde_json::from_str::<ApiErrorBody>(&text)
                .ok()
                .filter(|_| status.is_client_error());
            let err = match api_error {
                Some(err) => ExchangeError::Rejected { code: err.code, msg: err.msg },
                None => ExchangeError::Upstream {
                    status: status.as_u16(),
                    body: if text.is_empty() { status.to_string() } else { text },
                },
            };
            warn!("Order for {} failed: {}", order.symbol, err);
            return Err(err);
        }

        serde_json::from_str(&text).map_err(|e| ExchangeError::Parse(e.to_string()))
    }
}
