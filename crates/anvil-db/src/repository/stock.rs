//! # Stock History Repository
//!
//! The audit log of every stock movement. Rows are only ever inserted, in
//! the same transaction as the stock change they describe; the schema
//! rejects updates with a trigger.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use anvil_core::ledger::StockChange;
use anvil_core::{DateRange, StockHistory, StockMovement, StockReference};

use crate::error::DbResult;

/// A history row about to be written.
#[derive(Debug, Clone)]
pub(crate) struct StockEntry<'a> {
    pub product_id: i64,
    pub date: DateTime<Utc>,
    pub movement: StockMovement,
    pub change: StockChange,
    pub reference_id: Option<i64>,
    pub reference_type: StockReference,
    pub notes: &'a str,
}

/// Appends one history row on the caller's connection (usually a
/// transaction).
pub(crate) async fn append(conn: &mut SqliteConnection, entry: StockEntry<'_>) -> DbResult<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO stock_history
            (product_id, date, movement, quantity, previous_stock, new_stock,
             reference_id, reference_type, notes)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(entry.product_id)
    .bind(entry.date)
    .bind(entry.movement)
    .bind(entry.change.quantity())
    .bind(entry.change.previous)
    .bind(entry.change.new)
    .bind(entry.reference_id)
    .bind(entry.reference_type)
    .bind(entry.notes)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    debug!(
        product_id = entry.product_id,
        movement = ?entry.movement,
        previous = entry.change.previous,
        new = entry.change.new,
        "Stock history appended"
    );
    Ok(id)
}

#[derive(Debug, Clone)]
pub struct StockHistoryRepository {
    pool: SqlitePool,
}

impl StockHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockHistoryRepository { pool }
    }

    /// Whole log, newest first.
    pub async fn list(&self) -> DbResult<Vec<StockHistory>> {
        let rows = sqlx::query_as::<_, StockHistory>(
            "SELECT * FROM stock_history ORDER BY date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Movements of one product, newest first.
    pub async fn by_product(&self, product_id: i64) -> DbResult<Vec<StockHistory>> {
        let rows = sqlx::query_as::<_, StockHistory>(
            "SELECT * FROM stock_history WHERE product_id = ?1 ORDER BY date DESC, id DESC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn in_range(&self, range: &DateRange) -> DbResult<Vec<StockHistory>> {
        let rows = sqlx::query_as::<_, StockHistory>(
            r#"
            SELECT * FROM stock_history
            WHERE date >= ?1 AND date < ?2
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Movements caused by one sale or purchase.
    pub async fn by_reference(
        &self,
        reference_type: StockReference,
        reference_id: i64,
    ) -> DbResult<Vec<StockHistory>> {
        let rows = sqlx::query_as::<_, StockHistory>(
            r#"
            SELECT * FROM stock_history
            WHERE reference_type = ?1 AND reference_id = ?2
            ORDER BY id
            "#,
        )
        .bind(reference_type)
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
