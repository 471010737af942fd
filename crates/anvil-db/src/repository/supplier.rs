//! # Supplier Repository
//!
//! Supplier records and the running amount the shop owes each one.
//! `total_due` only moves through the ledger: up by a purchase's pending
//! amount, down by a payment.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use anvil_core::validation::{validate_new_supplier, validate_search_query};
use anvil_core::{BalancePolicy, Money, NewSupplier, Supplier};

use crate::changes::{ChangeFeed, Table};
use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;

/// Adds `amount` to a supplier's due.
pub(crate) async fn add_due(conn: &mut SqliteConnection, id: i64, amount: Money) -> DbResult<()> {
    let result = sqlx::query("UPDATE suppliers SET total_due_paise = total_due_paise + ?1 WHERE id = ?2")
        .bind(amount.paise())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Supplier", id));
    }
    Ok(())
}

/// Takes a payment off a supplier's due under `policy`. A supplier deleted
/// since the purchase is skipped.
pub(crate) async fn settle_due(
    conn: &mut SqliteConnection,
    id: i64,
    amount: Money,
    policy: BalancePolicy,
) -> DbResult<Option<Money>> {
    let due: Option<i64> = sqlx::query_scalar("SELECT total_due_paise FROM suppliers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(due) = due else {
        return Ok(None);
    };

    let new_due = policy.settle_due(Money::from_paise(due), amount);
    sqlx::query("UPDATE suppliers SET total_due_paise = ?1 WHERE id = ?2")
        .bind(new_due.paise())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(Some(new_due))
}

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        SupplierRepository { pool, changes }
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(suppliers)
    }

    pub async fn get(&self, id: i64) -> DbResult<Supplier> {
        sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    /// Substring search over name and phone. Blank returns everyone.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Supplier>> {
        let query = validate_search_query(query)?;
        if query.is_empty() {
            return self.list().await;
        }

        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT * FROM suppliers
            WHERE name LIKE ?1 ESCAPE '\' OR phone LIKE ?1 ESCAPE '\'
            ORDER BY name, id
            "#,
        )
        .bind(like_pattern(&query))
        .fetch_all(&self.pool)
        .await?;
        Ok(suppliers)
    }

    /// Suppliers the shop still owes, largest due first.
    pub async fn with_dues(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE total_due_paise > 0 ORDER BY total_due_paise DESC, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(suppliers)
    }

    /// Σ total_due over all suppliers (advances count negative).
    pub async fn total_due(&self) -> DbResult<Money> {
        let paise: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(total_due_paise), 0) FROM suppliers")
            .fetch_one(&self.pool)
            .await?;
        Ok(Money::from_paise(paise))
    }

    pub async fn create(&self, new: &NewSupplier) -> DbResult<Supplier> {
        validate_new_supplier(new)?;

        let id = sqlx::query(
            r#"
            INSERT INTO suppliers (name, phone, address, total_due_paise, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
        )
        .bind(new.name.trim())
        .bind(new.phone.trim())
        .bind(new.address.trim())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        info!(supplier_id = id, name = %new.name.trim(), "Supplier created");
        self.changes.publish(&[Table::Suppliers]);
        self.get(id).await
    }

    /// Updates contact details. The due is left alone.
    pub async fn update(&self, id: i64, changes: &NewSupplier) -> DbResult<Supplier> {
        validate_new_supplier(changes)?;

        let result = sqlx::query("UPDATE suppliers SET name = ?1, phone = ?2, address = ?3 WHERE id = ?4")
            .bind(changes.name.trim())
            .bind(changes.phone.trim())
            .bind(changes.address.trim())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        self.changes.publish(&[Table::Suppliers]);
        self.get(id).await
    }

    /// Deletes a supplier. Their purchases stay on the books unlinked.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        info!(supplier_id = id, "Supplier deleted");
        self.changes.publish(&[Table::Suppliers, Table::Purchases]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use anvil_core::{CoreError, Money, NewSupplier};

    fn supplier(name: &str, phone: &str) -> NewSupplier {
        NewSupplier {
            name: name.to_string(),
            phone: phone.to_string(),
            address: "Industrial Area, Phase 2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_update_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.suppliers();

        let created = repo.create(&supplier("Sharma Traders", "98765 43210")).await.unwrap();
        assert_eq!(created.total_due(), Money::zero());

        repo.create(&supplier("Gupta Steel", "")).await.unwrap();

        assert_eq!(repo.search("sharma").await.unwrap().len(), 1);
        assert_eq!(repo.search("43210").await.unwrap()[0].id, created.id);
        assert_eq!(repo.search(" ").await.unwrap().len(), 2);

        let updated = repo
            .update(created.id, &supplier("Sharma Traders Pvt", "98765 43210"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Sharma Traders Pvt");
    }

    #[tokio::test]
    async fn test_invalid_phone_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.suppliers().create(&supplier("X", "call me")).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_supplier() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(db.suppliers().get(404).await, Err(DbError::NotFound { .. })));
        assert!(matches!(db.suppliers().delete(404).await, Err(DbError::NotFound { .. })));
    }
}
