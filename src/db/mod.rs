//! Database module for PostgreSQL operations using SQLx
//! Uses runtime query checking (no compile-time DATABASE_URL needed)
//!
//! Every operation is a single statement, so a failed write never leaves a
//! partial row behind.

mod models;

pub use models::*;

use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("Record not found")]
    NotFound,
    #[error("Duplicate value: {0}")]
    Conflict(String),
    #[error("Constraint violated: {0}")]
    Constraint(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DbError::Conflict(db_err.message().to_string());
            }
            // class 22: value too long, numeric overflow and other bad data
            let data_exception = db_err.code().map_or(false, |code| code.starts_with("22"));
            if db_err.is_foreign_key_violation() || db_err.is_check_violation() || data_exception {
                return DbError::Constraint(db_err.message().to_string());
            }
        }
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            other => DbError::Sqlx(other),
        }
    }
}

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id SERIAL PRIMARY KEY,
        login VARCHAR(50) NOT NULL UNIQUE,
        password_hash VARCHAR(100) NOT NULL,
        api_key VARCHAR(100) NOT NULL,
        api_secret VARCHAR(100) NOT NULL,
        initial_balance NUMERIC(10, 2) NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id SERIAL PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        symbol VARCHAR(20) NOT NULL,
        side VARCHAR(20) NOT NULL,
        order_type VARCHAR(20) NOT NULL,
        quantity NUMERIC(18, 8) NOT NULL,
        price NUMERIC(18, 8),
        time_in_force VARCHAR(20) NOT NULL,
        status VARCHAR(30) NOT NULL DEFAULT 'NEW',
        exchange_order_id BIGINT,
        stop_loss NUMERIC(18, 8),
        take_profit NUMERIC(18, 8),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trade_reports (
        id SERIAL PRIMARY KEY,
        order_id INTEGER NOT NULL REFERENCES orders(id),
        profit_loss NUMERIC(15, 2),
        report_date TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// Database connection wrapper
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
}

impl Database {
    /// Create a new database connection pool
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, DbError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        info!("Database pool created with max {} connections", max_connections);

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables that do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(self.pool()).await?;
        }
        info!("Database schema ready (users, orders, trade_reports)");
        Ok(())
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }

    // ==========================================
    // User Operations
    // ==========================================

    pub async fn create_user(&self, user: &NewUser, password_hash: &str) -> Result<User, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (login, password_hash, api_key, api_secret, initial_balance)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, login, password_hash, api_key, api_secret, initial_balance, created_at
            "#
        )
        .bind(&user.login)
        .bind(password_hash)
        .bind(&user.api_key)
        .bind(&user.api_secret)
        .bind(user.initial_balance)
        .fetch_one(self.pool())
        .await?;

        Ok(User::from_row(&row)?)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, login, password_hash, api_key, api_secret, initial_balance, created_at
            FROM users
            ORDER BY id
            "#
        )
        .fetch_all(self.pool())
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(User::from_row(&row)?);
        }
        Ok(users)
    }

    pub async fn get_user(&self, user_id: i32) -> Result<Option<User>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT id, login, password_hash, api_key, api_secret, initial_balance, created_at
            FROM users
            WHERE id = $1
            "#
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(User::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Update only the fields that are present. `password_hash` replaces the
    /// stored hash when given.
    pub async fn update_user(
        &self,
        user_id: i32,
        updates: &UserUpdate,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, DbError> {
        let row = sqlx::query(
            r#"
            UPDATE users
            SET
                login = COALESCE($2, login),
                password_hash = COALESCE($3, password_hash),
                api_key = COALESCE($4, api_key),
                api_secret = COALESCE($5, api_secret),
                initial_balance = COALESCE($6, initial_balance)
            WHERE id = $1
            RETURNING id, login, password_hash, api_key, api_secret, initial_balance, created_at
            "#
        )
        .bind(user_id)
        .bind(&updates.login)
        .bind(password_hash)
        .bind(&updates.api_key)
        .bind(&updates.api_secret)
        .bind(updates.initial_balance)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(User::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Returns false when no such user exists
    pub async fn delete_user(&self, user_id: i32) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==========================================
    // Order Operations
    // ==========================================

    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (
                user_id, symbol, side, order_type, quantity, price,
                time_in_force, status, exchange_order_id, stop_loss, take_profit
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING
                id, user_id, symbol, side, order_type, quantity, price,
                time_in_force, status, exchange_order_id, stop_loss, take_profit,
                created_at, updated_at
            "#
        )
        .bind(order.user_id)
        .bind(&order.symbol)
        .bind(order.side.as_str())
        .bind(order.order_type.as_str())
        .bind(order.quantity)
        .bind(order.price)
        .bind(order.time_in_force.as_str())
        .bind(&order.status)
        .bind(order.exchange_order_id)
        .bind(order.stop_loss)
        .bind(order.take_profit)
        .fetch_one(self.pool())
        .await?;

        Ok(Order::from_row(&row)?)
    }

    /// All orders, optionally restricted to one user
    pub async fn list_orders(&self, user_id: Option<i32>) -> Result<Vec<Order>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id, user_id, symbol, side, order_type, quantity, price,
                time_in_force, status, exchange_order_id, stop_loss, take_profit,
                created_at, updated_at
            FROM orders
            WHERE ($1::int IS NULL OR user_id = $1)
            ORDER BY id
            "#
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(Order::from_row(&row)?);
        }
        Ok(orders)
    }

    /// Get an order; with `user_id`, only if it belongs to that user
    pub async fn get_order(&self, order_id: i32, user_id: Option<i32>) -> Result<Option<Order>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT
                id, user_id, symbol, side, order_type, quantity, price,
                time_in_force, status, exchange_order_id, stop_loss, take_profit,
                created_at, updated_at
            FROM orders
            WHERE id = $1 AND ($2::int IS NULL OR user_id = $2)
            "#
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(Order::from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn update_user_order(
        &self,
        user_id: i32,
        order_id: i32,
        updates: &OrderUpdate,
    ) -> Result<Option<Order>, DbError> {
        let row = sqlx::query(
            r#"
            UPDATE orders
            SET
                symbol = COALESCE($3, symbol),
                side = COALESCE($4, side),
                order_type = COALESCE($5, order_type),
                quantity = COALESCE($6, quantity),
                price = COALESCE($7, price),
                time_in_force = COALESCE($8, time_in_force),
                status = COALESCE($9, status),
                stop_loss = COALESCE($10, stop_loss),
                take_profit = COALESCE($11, take_profit),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1 AND user_id = $2
            RETURNING
                id, user_id, symbol, side, order_type, quantity, price,
                time_in_force, status, exchange_order_id, stop_loss, take_profit,
                created_at, updated_at
            "#
        )
        .bind(order_id)
        .bind(user_id)
        .bind(&updates.symbol)
        .bind(updates.side.map(|s| s.as_str()))
        .bind(updates.order_type.map(|t| t.as_str()))
        .bind(updates.quantity)
        .bind(updates.price)
        .bind(updates.time_in_force.map(|t| t.as_str()))
        .bind(&updates.status)
        .bind(updates.stop_loss)
        .bind(updates.take_profit)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(Order::from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn delete_user_order(&self, user_id: i32, order_id: i32) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND user_id = $2")
            .bind(order_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==========================================
    // Trade Report Operations
    // ==========================================

    pub async fn create_report(&self, report: &NewTradeReport) -> Result<TradeReport, DbError> {
        let row = sqlx::query(
            r#"
            INSERT INTO trade_reports (order_id, profit_loss, report_date)
            VALUES ($1, $2, COALESCE($3, NOW()))
            RETURNING id, order_id, profit_loss, report_date
            "#
        )
        .bind(report.order_id)
        .bind(report.profit_loss)
        .bind(report.report_date)
        .fetch_one(self.pool())
        .await?;

        Ok(TradeReport::from_row(&row)?)
    }

    /// Reports filtered by owning order or by the user owning that order
    pub async fn list_reports(
        &self,
        order_id: Option<i32>,
        user_id: Option<i32>,
    ) -> Result<Vec<TradeReport>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.order_id, r.profit_loss, r.report_date
            FROM trade_reports r
            JOIN orders o ON o.id = r.order_id
            WHERE ($1::int IS NULL OR r.order_id = $1)
              AND ($2::int IS NULL OR o.user_id = $2)
            ORDER BY r.id
            "#
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            reports.push(TradeReport::from_row(&row)?);
        }
        Ok(reports)
    }

    pub async fn get_report(&self, report_id: i32) -> Result<Option<TradeReport>, DbError> {
        let row = sqlx::query(
            r#"
            SELECT id, order_id, profit_loss, report_date
            FROM trade_reports
            WHERE id = $1
            "#
        )
        .bind(report_id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(TradeReport::from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn update_report(
        &self,
        report_id: i32,
        updates: &TradeReportUpdate,
    ) -> Result<Option<TradeReport>, DbError> {
        let row = sqlx::query(
            r#"
            UPDATE trade_reports
            SET
                order_id = COALESCE($2, order_id),
                profit_loss = COALESCE($3, profit_loss),
                report_date = COALESCE($4, report_date)
            WHERE id = $1
            RETURNING id, order_id, profit_loss, report_date
            "#
        )
        .bind(report_id)
        .bind(updates.order_id)
        .bind(updates.profit_loss)
        .bind(updates.report_date)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(TradeReport::from_row(&row)?)),
            None => Ok(None),
        }
    }

    pub async fn delete_report(&self, report_id: i32) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM trade_reports WHERE id = $1")
            .bind(report_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
