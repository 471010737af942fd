//! # Shop Info Repository
//!
//! The single `shop_info` row (id 1): details printed on invoices, the
//! invoice prefix, the invoice counter and the biometric lock flag.
//!
//! The counter moves only through [`allocate_invoice_number`], inside the
//! transaction of the sale that uses the number.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use anvil_core::validation::validate_shop_info;
use anvil_core::{format_invoice_number, ShopInfo, SHOP_INFO_ID};

use crate::changes::{ChangeFeed, Table};
use crate::error::{DbError, DbResult};

/// Takes the next sale invoice number and advances the counter.
///
/// Rolling back the caller's transaction gives the number back.
pub(crate) async fn allocate_invoice_number(conn: &mut SqliteConnection) -> DbResult<String> {
    let row: Option<(String, i64)> = sqlx::query_as(
        "SELECT invoice_prefix, next_invoice_number FROM shop_info WHERE id = ?1",
    )
    .bind(SHOP_INFO_ID)
    .fetch_optional(&mut *conn)
    .await?;
    let (prefix, next) = row.ok_or_else(|| DbError::not_found("ShopInfo", SHOP_INFO_ID))?;

    sqlx::query("UPDATE shop_info SET next_invoice_number = ?1 WHERE id = ?2")
        .bind(next + 1)
        .bind(SHOP_INFO_ID)
        .execute(&mut *conn)
        .await?;

    Ok(format_invoice_number(&prefix, next))
}

#[derive(Debug, Clone)]
pub struct ShopRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ShopRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ShopRepository { pool, changes }
    }

    pub async fn get(&self) -> DbResult<ShopInfo> {
        sqlx::query_as::<_, ShopInfo>("SELECT * FROM shop_info WHERE id = ?1")
            .bind(SHOP_INFO_ID)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found("ShopInfo", SHOP_INFO_ID))
    }

    /// Saves the shop's details.
    ///
    /// `id` and `next_invoice_number` in `info` are ignored; the counter
    /// never moves backwards.
    pub async fn update(&self, info: &ShopInfo) -> DbResult<ShopInfo> {
        validate_shop_info(info)?;

        sqlx::query(
            r#"
            UPDATE shop_info SET
                shop_name = ?1, location = ?2, phone = ?3, email = ?4,
                gst_number = ?5, invoice_prefix = ?6, biometric_enabled = ?7
            WHERE id = ?8
            "#,
        )
        .bind(info.shop_name.trim())
        .bind(info.location.trim())
        .bind(info.phone.trim())
        .bind(info.email.trim())
        .bind(info.gst_number.trim().to_uppercase())
        .bind(info.invoice_prefix.trim())
        .bind(info.biometric_enabled)
        .bind(SHOP_INFO_ID)
        .execute(&self.pool)
        .await?;

        info!(shop = %info.shop_name.trim(), "Shop info updated");
        self.changes.publish(&[Table::ShopInfo]);
        self.get().await
    }

    pub async fn set_biometric_enabled(&self, enabled: bool) -> DbResult<()> {
        sqlx::query("UPDATE shop_info SET biometric_enabled = ?1 WHERE id = ?2")
            .bind(enabled)
            .bind(SHOP_INFO_ID)
            .execute(&self.pool)
            .await?;

        info!(enabled, "Biometric lock toggled");
        self.changes.publish(&[Table::ShopInfo]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_update_keeps_counter() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut info = db.shop().get().await.unwrap();
        info.shop_name = "Krishna Hardware".to_string();
        info.gst_number = "27aapfk1234l1z5".to_string();
        info.invoice_prefix = "KH-".to_string();
        info.next_invoice_number = 1;

        let mut conn = db.pool().acquire().await.unwrap();
        assert_eq!(allocate_invoice_number(&mut conn).await.unwrap(), "INV0001");
        drop(conn);

        let saved = db.shop().update(&info).await.unwrap();
        assert_eq!(saved.shop_name, "Krishna Hardware");
        assert_eq!(saved.gst_number, "27AAPFK1234L1Z5");
        assert_eq!(saved.next_invoice_number, 2);
        assert_eq!(saved.peek_invoice_number(), "KH-0002");
    }

    #[tokio::test]
    async fn test_biometric_toggle() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(!db.shop().get().await.unwrap().biometric_enabled);

        db.shop().set_biometric_enabled(true).await.unwrap();
        assert!(db.shop().get().await.unwrap().biometric_enabled);
    }

    #[tokio::test]
    async fn test_update_validates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut info = db.shop().get().await.unwrap();
        info.invoice_prefix = "IN V".to_string();
        assert!(db.shop().update(&info).await.is_err());
    }
}
