//! # Sale Repository
//!
//! Read side of sales: lists for the sales screen, the invoice view, and
//! the sums behind the dashboard. Sales are written and paid through the
//! ledger and are never deleted.

use sqlx::SqlitePool;
use tracing::debug;

use anvil_core::validation::validate_search_query;
use anvil_core::{DateRange, Money, Sale, SaleItem, SaleWithItems};

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;

/// Repository for sale database operations.
///
/// ## Usage
/// ```rust,ignore
/// let today = db.sales().in_range(&DateRange::today()).await?;
/// let invoice = db.sales().with_items(sale_id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// All sales, newest first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>("SELECT * FROM sales ORDER BY date DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    pub async fn get(&self, id: i64) -> DbResult<Sale> {
        sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))
    }

    pub async fn by_invoice_number(&self, invoice_number: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE invoice_number = ?1 COLLATE NOCASE ORDER BY id LIMIT 1",
        )
        .bind(invoice_number.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(sale)
    }

    pub async fn items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let items =
            sqlx::query_as::<_, SaleItem>("SELECT * FROM sale_items WHERE sale_id = ?1 ORDER BY id")
                .bind(sale_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(items)
    }

    /// A sale and its lines, as printed on the invoice.
    pub async fn with_items(&self, id: i64) -> DbResult<SaleWithItems> {
        let sale = self.get(id).await?;
        let items = self.items(id).await?;
        Ok(SaleWithItems { sale, items })
    }

    pub async fn by_customer(&self, customer_id: i64) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE customer_id = ?1 ORDER BY date DESC, id DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    pub async fn in_range(&self, range: &DateRange) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE date >= ?1 AND date < ?2
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    /// Sales dated in the local calendar day.
    pub async fn today(&self) -> DbResult<Vec<Sale>> {
        self.in_range(&DateRange::today()).await
    }

    /// Credit sales still owed, oldest first.
    pub async fn pending(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE pending_amount_paise > 0 ORDER BY date, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    /// Substring search over customer name and invoice number.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Sale>> {
        let query = validate_search_query(query)?;
        if query.is_empty() {
            return self.list().await;
        }

        debug!(query = %query, "Searching sales");
        let sales = sqlx::query_as::<_, Sale>(
            r#"
            SELECT * FROM sales
            WHERE customer_name LIKE ?1 ESCAPE '\'
               OR invoice_number LIKE ?1 ESCAPE '\'
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(like_pattern(&query))
        .fetch_all(&self.pool)
        .await?;
        Ok(sales)
    }

    /// Σ total_amount over sales dated in `range`.
    pub async fn total_in_range(&self, range: &DateRange) -> DbResult<Money> {
        let paise: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount_paise), 0) FROM sales
            WHERE date >= ?1 AND date < ?2
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_paise(paise))
    }

    /// Σ pending_amount over all sales.
    pub async fn total_pending(&self) -> DbResult<Money> {
        let paise: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(pending_amount_paise), 0) FROM sales")
                .fetch_one(&self.pool)
                .await?;
        Ok(Money::from_paise(paise))
    }
}
