//! Database models matching PostgreSQL schema

use crate::auth::redact;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use crate::types::{OrderSide, OrderType, TimeInForce};

fn serialize_redacted<S: Serializer>(key: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&redact(key))
}

// ==========================================
// Users
// ==========================================

/// Account holder with stored exchange credentials.
///
/// The password hash and API secret never leave the server; the API key is
/// only ever serialized redacted.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i32,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(serialize_with = "serialize_redacted")]
    pub api_key: String,
    #[serde(skip_serializing)]
    pub api_secret: String,
    pub initial_balance: Decimal,
    pub created_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            login: row.try_get("login")?,
            password_hash: row.try_get("password_hash")?,
            api_key: row.try_get("api_key")?,
            api_secret: row.try_get("api_secret")?,
            initial_balance: row.try_get("initial_balance")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// User creation request
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub login: String,
    pub password: String,
    #[serde(alias = "binance_api_key")]
    pub api_key: String,
    #[serde(alias = "binance_secret_key")]
    pub api_secret: String,
    #[serde(default, alias = "saldo_inicio")]
    pub initial_balance: Decimal,
}

/// User update request (all fields optional)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub login: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "binance_api_key")]
    pub api_key: Option<String>,
    #[serde(alias = "binance_secret_key")]
    pub api_secret: Option<String>,
    #[serde(alias = "saldo_inicio")]
    pub initial_balance: Option<Decimal>,
}

// ==========================================
// Orders
// ==========================================

/// Local record of an order sent to the exchange
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub symbol: String,
    pub side: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    #[serde(rename = "timeInForce")]
    pub time_in_force: String,
    pub status: String,
    pub exchange_order_id: Option<i64>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            symbol: row.try_get("symbol")?,
            side: row.try_get("side")?,
            order_type: row.try_get("order_type")?,
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
            time_in_force: row.try_get("time_in_force")?,
            status: row.try_get("status")?,
            exchange_order_id: row.try_get("exchange_order_id")?,
            stop_loss: row.try_get("stop_loss")?,
            take_profit: row.try_get("take_profit")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// New order to insert
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i32,
    pub symbol: String,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Option<Decimal>,
    pub time_in_force: TimeInForce,
    pub status: String,
    pub exchange_order_id: Option<i64>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

/// Order update request (all fields optional, unknown fields ignored)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderUpdate {
    pub symbol: Option<String>,
    pub side: Option<OrderSide>,
    #[serde(rename = "type", alias = "order_type", alias = "types")]
    pub order_type: Option<OrderType>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    #[serde(rename = "timeInForce", alias = "time_in_force")]
    pub time_in_force: Option<TimeInForce>,
    pub status: Option<String>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
}

// ==========================================
// Trade Reports
// ==========================================

#[derive(Debug, Clone, Serialize)]
pub struct TradeReport {
    pub id: i32,
    pub order_id: i32,
    pub profit_loss: Option<Decimal>,
    pub report_date: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for TradeReport {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            profit_loss: row.try_get("profit_loss")?,
            report_date: row.try_get("report_date")?,
        })
    }
}

/// Trade report creation request; `report_date` defaults to now
#[derive(Debug, Clone, Deserialize)]
pub struct NewTradeReport {
    pub order_id: i32,
    pub profit_loss: Option<Decimal>,
    pub report_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeReportUpdate {
    pub order_id: Option<i32>,
    pub profit_loss: Option<Decimal>,
    pub report_date: Option<DateTime<Utc>>,
}
