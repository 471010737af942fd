//! # Purchase Repository
//!
//! Read side of purchases. Purchases are written and paid through the
//! ledger; there is no delete, since that would leave stock and supplier
//! dues without a cause.

use sqlx::SqlitePool;

use anvil_core::{DateRange, Money, Purchase, PurchaseItem, PurchaseWithItems};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// All purchases, newest first.
    pub async fn list(&self) -> DbResult<Vec<Purchase>> {
        let purchases =
            sqlx::query_as::<_, Purchase>("SELECT * FROM purchases ORDER BY date DESC, id DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(purchases)
    }

    pub async fn get(&self, id: i64) -> DbResult<Purchase> {
        sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", id))
    }

    pub async fn items(&self, purchase_id: i64) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            "SELECT * FROM purchase_items WHERE purchase_id = ?1 ORDER BY id",
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn with_items(&self, id: i64) -> DbResult<PurchaseWithItems> {
        let purchase = self.get(id).await?;
        let items = self.items(id).await?;
        Ok(PurchaseWithItems { purchase, items })
    }

    pub async fn by_supplier(&self, supplier_id: i64) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE supplier_id = ?1 ORDER BY date DESC, id DESC",
        )
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    pub async fn in_range(&self, range: &DateRange) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT * FROM purchases
            WHERE date >= ?1 AND date < ?2
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    /// Purchases not yet fully paid, oldest first.
    pub async fn pending(&self) -> DbResult<Vec<Purchase>> {
        let purchases = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE pending_amount_paise > 0 ORDER BY date, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(purchases)
    }

    /// Σ total_amount over purchases dated in `range`.
    pub async fn total_in_range(&self, range: &DateRange) -> DbResult<Money> {
        let paise: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount_paise), 0) FROM purchases
            WHERE date >= ?1 AND date < ?2
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_paise(paise))
    }

    pub async fn total_pending(&self) -> DbResult<Money> {
        let paise: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(pending_amount_paise), 0) FROM purchases")
                .fetch_one(&self.pool)
                .await?;
        Ok(Money::from_paise(paise))
    }
}
