//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - Lookups: by id, barcode, category, brand, free-text search
//! - Low-stock list and inventory value
//! - Create (with opening stock), update, delete
//! - Stock adjustment after a physical count
//!
//! ## Stock Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  current_stock changes only here and in the ledger, always together     │
//! │  with a stock_history row in the same transaction:                      │
//! │                                                                         │
//! │    create()        0 → opening          IN / OPENING_STOCK              │
//! │    adjust_stock()  previous → counted   ADJUSTMENT / ADJUSTMENT         │
//! │    Ledger sale     previous → −qty      OUT / SALE                      │
//! │    Ledger purchase previous → +qty      IN / PURCHASE                   │
//! │                                                                         │
//! │  update() never touches stock.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use anvil_core::ledger::{StockChange, OPENING_STOCK_NOTE};
use anvil_core::validation::{validate_new_product, validate_search_query};
use anvil_core::{Money, NewProduct, Product, StockHistory, StockMovement, StockReference};

use crate::changes::{ChangeFeed, Table};
use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use crate::repository::stock::{self, StockEntry};

/// Reads a product on the caller's connection, failing when it's gone.
pub(crate) async fn fetch(conn: &mut SqliteConnection, id: i64) -> DbResult<Product> {
    sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Product", id))
}

/// Writes a new stock level. Callers append the matching history row.
pub(crate) async fn set_stock(
    conn: &mut SqliteConnection,
    id: i64,
    stock: i64,
    now: DateTime<Utc>,
) -> DbResult<()> {
    sqlx::query("UPDATE products SET current_stock = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(stock)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let hits = repo.search("pvc", 20).await?;
/// let low = repo.low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ProductRepository { pool, changes }
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// All products, by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Gets a product by id.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - No product with that id
    pub async fn get(&self, id: i64) -> DbResult<Product> {
        self.find(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    pub async fn find(&self, id: i64) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Exact barcode lookup, for the scanner at the counter.
    pub async fn by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Ok(None);
        }
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE barcode = ?1 ORDER BY id LIMIT 1",
        )
        .bind(barcode)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn by_category(&self, category_id: i64) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE category_id = ?1 ORDER BY name, id",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Products of one brand, case-insensitive.
    pub async fn by_brand(&self, brand: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE brand = ?1 COLLATE NOCASE ORDER BY name, id",
        )
        .bind(brand.trim())
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Substring search over name, brand, size, color and barcode.
    ///
    /// A blank query returns the first `limit` products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            let products = sqlx::query_as::<_, Product>(
                "SELECT * FROM products ORDER BY name, id LIMIT ?1",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
            return Ok(products);
        }

        let pattern = like_pattern(&query);
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE name LIKE ?1 ESCAPE '\'
               OR brand LIKE ?1 ESCAPE '\'
               OR size LIKE ?1 ESCAPE '\'
               OR color LIKE ?1 ESCAPE '\'
               OR barcode LIKE ?1 ESCAPE '\'
            ORDER BY name, id
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Products at or below their reorder threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE current_stock <= low_stock_alert
            ORDER BY current_stock, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Σ current_stock × purchase_price.
    pub async fn inventory_value(&self) -> DbResult<Money> {
        let paise: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(current_stock * purchase_price_paise), 0) FROM products",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_paise(paise))
    }

    /// Distinct non-empty brands, alphabetical.
    pub async fn brands(&self) -> DbResult<Vec<String>> {
        let brands: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT brand FROM products
            WHERE TRIM(brand) <> ''
            ORDER BY brand COLLATE NOCASE
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(brands)
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Creates a product with its opening stock.
    ///
    /// ## What This Does
    /// 1. Inserts the product with `current_stock = opening_stock`
    /// 2. When opening stock is positive, appends `IN / OPENING_STOCK`
    ///    history (0 → opening)
    ///
    /// Both happen in one transaction.
    pub async fn create(&self, new: &NewProduct) -> DbResult<Product> {
        validate_new_product(new)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO products
                (name, category_id, brand, size, color, unit,
                 purchase_price_paise, selling_price_paise,
                 opening_stock, current_stock, low_stock_alert, barcode,
                 created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?10, ?11, ?12, ?12)
            "#,
        )
        .bind(new.name.trim())
        .bind(new.category_id)
        .bind(new.brand.trim())
        .bind(new.size.trim())
        .bind(new.color.trim())
        .bind(new.unit.trim())
        .bind(new.purchase_price.paise())
        .bind(new.selling_price.paise())
        .bind(new.opening_stock)
        .bind(new.low_stock_alert)
        .bind(new.barcode.trim())
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        if new.opening_stock > 0 {
            stock::append(
                &mut tx,
                StockEntry {
                    product_id: id,
                    date: now,
                    movement: StockMovement::In,
                    change: StockChange {
                        previous: 0,
                        new: new.opening_stock,
                    },
                    reference_id: None,
                    reference_type: StockReference::OpeningStock,
                    notes: OPENING_STOCK_NOTE,
                },
            )
            .await?;
        }

        let product = fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(product_id = id, name = %product.name, stock = product.current_stock, "Product created");
        self.changes.publish(&[Table::Products, Table::StockHistory]);
        Ok(product)
    }

    /// Updates descriptive fields and prices.
    ///
    /// `opening_stock` in `changes` is ignored: stock only moves through
    /// the ledger and [`adjust_stock`](Self::adjust_stock).
    pub async fn update(&self, id: i64, changes: &NewProduct) -> DbResult<Product> {
        validate_new_product(changes)?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?1, category_id = ?2, brand = ?3, size = ?4, color = ?5,
                unit = ?6, purchase_price_paise = ?7, selling_price_paise = ?8,
                low_stock_alert = ?9, barcode = ?10, updated_at = ?11
            WHERE id = ?12
            "#,
        )
        .bind(changes.name.trim())
        .bind(changes.category_id)
        .bind(changes.brand.trim())
        .bind(changes.size.trim())
        .bind(changes.color.trim())
        .bind(changes.unit.trim())
        .bind(changes.purchase_price.paise())
        .bind(changes.selling_price.paise())
        .bind(changes.low_stock_alert)
        .bind(changes.barcode.trim())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(product_id = id, "Product updated");
        self.changes.publish(&[Table::Products]);
        self.get(id).await
    }

    /// Deletes a product and its stock history. Sale and purchase lines
    /// keep their amounts and lose the link.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(product_id = id, "Product deleted");
        self.changes.publish(&[
            Table::Products,
            Table::StockHistory,
            Table::SaleItems,
            Table::PurchaseItems,
        ]);
        Ok(())
    }

    /// Sets stock to a counted value and records the correction.
    ///
    /// ## Example
    /// ```rust,ignore
    /// // Shelf count found 21 where the books said 23
    /// let entry = db.products().adjust_stock(id, 21, "Two tins damaged").await?;
    /// assert_eq!((entry.previous_stock, entry.new_stock), (23, 21));
    /// ```
    pub async fn adjust_stock(&self, id: i64, counted: i64, notes: &str) -> DbResult<StockHistory> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let product = fetch(&mut tx, id).await?;
        let change = StockChange::counted(product.current_stock, counted)?;

        set_stock(&mut tx, id, change.new, now).await?;
        let history_id = stock::append(
            &mut tx,
            StockEntry {
                product_id: id,
                date: now,
                movement: StockMovement::Adjustment,
                change,
                reference_id: None,
                reference_type: StockReference::Adjustment,
                notes: notes.trim(),
            },
        )
        .await?;

        let entry = sqlx::query_as::<_, StockHistory>("SELECT * FROM stock_history WHERE id = ?1")
            .bind(history_id)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            product_id = id,
            previous = change.previous,
            new = change.new,
            "Stock adjusted"
        );
        self.changes.publish(&[Table::Products, Table::StockHistory]);
        Ok(entry)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use anvil_core::{
        CoreError, Money, NewProduct, StockMovement, StockReference, ValidationError,
    };

    use crate::error::DbError;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn pipe(stock: i64) -> NewProduct {
        NewProduct::new("PVC Pipe", Money::from_rupees(120), Money::from_rupees(150))
            .with_brand("Supreme")
            .with_size("1 inch")
            .with_unit("ft")
            .with_opening_stock(stock)
            .with_barcode("8901234000012")
    }

    #[tokio::test]
    async fn test_create_records_opening_stock() {
        let db = db().await;
        let product = db.products().create(&pipe(40)).await.unwrap();

        assert_eq!(product.opening_stock, 40);
        assert_eq!(product.current_stock, 40);

        let history = db.stock_history().by_product(product.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movement, StockMovement::In);
        assert_eq!(history[0].reference_type, StockReference::OpeningStock);
        assert_eq!((history[0].previous_stock, history[0].new_stock), (0, 40));
    }

    #[tokio::test]
    async fn test_create_without_stock_writes_no_history() {
        let db = db().await;
        let product = db.products().create(&pipe(0)).await.unwrap();
        assert!(db.stock_history().by_product(product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let db = db().await;
        let bad = NewProduct::new("  ", Money::zero(), Money::zero());
        let err = db.products().create(&bad).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_price_past_cap() {
        let db = db().await;
        let bad = NewProduct::new("Generator Set", Money::zero(), Money::from_paise(i64::MAX / 2))
            .with_opening_stock(3);
        let err = db.products().create(&bad).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

        #[tokio::test]
    async fn test_update_leaves_stock_alone() {
        let db = db().await;
        let product = db.products().create(&pipe(40)).await.unwrap();

        let mut changes = pipe(999);
        changes.selling_price = Money::from_rupees(160);
        let updated = db.products().update(product.id, &changes).await.unwrap();

        assert_eq!(updated.selling_price(), Money::from_rupees(160));
        assert_eq!(updated.current_stock, 40);
        assert_eq!(updated.opening_stock, 40);
    }

    #[tokio::test]
    async fn test_lookup_and_search() {
        let db = db().await;
        let repo = db.products();
        let created = repo.create(&pipe(10)).await.unwrap();
        repo.create(
            &NewProduct::new("Claw Hammer", Money::from_rupees(200), Money::from_rupees(260))
                .with_brand("Stanley"),
        )
        .await
        .unwrap();

        assert_eq!(repo.by_barcode("8901234000012").await.unwrap().unwrap().id, created.id);
        assert!(repo.by_barcode("").await.unwrap().is_none());

        let hits = repo.search("SUPREME", 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "PVC Pipe");

        assert_eq!(repo.search("", 20).await.unwrap().len(), 2);
        assert_eq!(repo.by_brand("stanley").await.unwrap().len(), 1);
        assert_eq!(repo.brands().await.unwrap(), vec!["Stanley", "Supreme"]);
    }

    #[tokio::test]
    async fn test_low_stock_and_inventory_value() {
        let db = db().await;
        let repo = db.products();
        repo.create(&pipe(5)).await.unwrap(); // at threshold: low
        repo.create(
            &NewProduct::new("Wall Putty", Money::from_rupees(300), Money::from_rupees(380))
                .with_opening_stock(6),
        )
        .await
        .unwrap();

        let low = repo.low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "PVC Pipe");

        // 5 × 120 + 6 × 300
        assert_eq!(repo.inventory_value().await.unwrap(), Money::from_rupees(2400));
    }

    #[tokio::test]
    async fn test_adjust_stock_appends_history() {
        let db = db().await;
        let product = db.products().create(&pipe(23)).await.unwrap();

        let entry = db.products().adjust_stock(product.id, 21, "Shelf count").await.unwrap();
        assert_eq!(entry.movement, StockMovement::Adjustment);
        assert_eq!((entry.previous_stock, entry.new_stock, entry.quantity), (23, 21, 2));
        assert_eq!(entry.notes, "Shelf count");

        assert_eq!(db.products().get(product.id).await.unwrap().current_stock, 21);
        assert_eq!(db.stock_history().by_product(product.id).await.unwrap().len(), 2);

        assert!(db.products().adjust_stock(product.id, -1, "").await.is_err());
        assert_eq!(db.products().get(product.id).await.unwrap().current_stock, 21);
    }

    #[tokio::test]
    async fn test_delete_cascades_history() {
        let db = db().await;
        let product = db.products().create(&pipe(3)).await.unwrap();
        db.products().delete(product.id).await.unwrap();

        assert!(db.products().find(product.id).await.unwrap().is_none());
        assert!(db.stock_history().list().await.unwrap().is_empty());
        assert!(matches!(
            db.products().delete(product.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_history_rows_cannot_be_edited() {
        let db = db().await;
        db.products().create(&pipe(3)).await.unwrap();

        let result = sqlx::query("UPDATE stock_history SET new_stock = 99")
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }
}
