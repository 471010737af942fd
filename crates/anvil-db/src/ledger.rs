//! # Ledger
//!
//! The four operations that change the shop's books. Each runs inside a
//! single SQLite transaction: on any error the transaction is dropped,
//! SQLite rolls it back, and no row (not even the invoice counter) moves.
//!
//! ## Record Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleDraft ──► settle() ──► BEGIN                                       │
//! │                                │                                        │
//! │                                ├─ resolve customer (phone match / new)  │
//! │                                ├─ invoice number (given, or counter++)  │
//! │                                ├─ INSERT sales                          │
//! │                                ├─ per line:                             │
//! │                                │    re-read product stock               │
//! │                                │    qty > stock? ──► InsufficientStock  │
//! │                                │    INSERT sale_items                   │
//! │                                │    stock −= qty                        │
//! │                                │    INSERT stock_history OUT/SALE       │
//! │                                ├─ customer.total_due += pending         │
//! │                                ▼                                        │
//! │                              COMMIT ──► publish change                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Purchases mirror this with IN/PURCHASE history and the supplier due.
//! Payments bump `paid`, floor `pending` at zero and take the amount off
//! the party's due under the configured [`BalancePolicy`].

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use anvil_core::cart::{PurchaseCart, SaleCart};
use anvil_core::ledger::{
    apply_payment, purchase_stock_note, sale_stock_note, PurchaseDraft, SaleDraft, StockChange,
};
use anvil_core::{
    BalancePolicy, Money, Purchase, PurchaseWithItems, Sale, SaleWithItems, StockMovement,
    StockReference,
};

use crate::changes::{ChangeFeed, Table};
use crate::error::{DbError, DbResult};
use crate::repository::purchase::PurchaseRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::stock::StockEntry;
use crate::repository::{customer, product, shop, stock, supplier};

const SALE_TABLES: &[Table] = &[
    Table::Sales,
    Table::SaleItems,
    Table::Products,
    Table::StockHistory,
    Table::Customers,
    Table::ShopInfo,
];

const PURCHASE_TABLES: &[Table] = &[
    Table::Purchases,
    Table::PurchaseItems,
    Table::Products,
    Table::StockHistory,
    Table::Suppliers,
];

/// Atomic writer for sales, purchases and payments.
///
/// ## Usage
/// ```rust,ignore
/// let recorded = db.ledger().record_sale(&draft).await?;
/// db.ledger().pay_sale(recorded.sale.id, Money::from_rupees(50)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    changes: ChangeFeed,
    policy: BalancePolicy,
}

impl Ledger {
    pub fn new(pool: SqlitePool, changes: ChangeFeed, policy: BalancePolicy) -> Self {
        Ledger {
            pool,
            changes,
            policy,
        }
    }

    // =========================================================================
    // Sales
    // =========================================================================

    /// Records a sale with its lines, stock movements and customer due.
    ///
    /// ## Errors
    /// - `Rejected(EmptyCart | InvalidPaymentAmount | Validation)` from
    ///   settling the draft
    /// - `Rejected(InsufficientStock)` when a line exceeds current stock
    /// - `NotFound` when a line's product no longer exists
    ///
    /// Nothing is written on any error.
    pub async fn record_sale(&self, draft: &SaleDraft) -> DbResult<SaleWithItems> {
        let settlement = draft.settle()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let customer = customer::resolve(&mut tx, &draft.customer, now).await?;
        let customer_id = customer.map(|(id, _)| id);

        let invoice_number = match draft.invoice_number.as_deref().map(str::trim) {
            Some(given) if !given.is_empty() => given.to_string(),
            _ => shop::allocate_invoice_number(&mut tx).await?,
        };

        let sale_id = sqlx::query(
            r#"
            INSERT INTO sales
                (customer_id, customer_name, customer_phone, date,
                 total_amount_paise, paid_amount_paise, pending_amount_paise,
                 payment_type, invoice_number, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(customer_id)
        .bind(draft.customer.name.trim())
        .bind(draft.customer.phone.trim())
        .bind(draft.date)
        .bind(settlement.total.paise())
        .bind(settlement.paid.paise())
        .bind(settlement.pending.paise())
        .bind(draft.payment_type)
        .bind(&invoice_number)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let note = sale_stock_note(&invoice_number);
        for line in &draft.lines {
            // Re-read inside the transaction: earlier lines of the same
            // product have already been taken off.
            let item = product::fetch(&mut tx, line.product_id).await?;
            let change = StockChange::outgoing(&item.name, item.current_stock, line.quantity)?;

            let product_name = if line.product_name.trim().is_empty() {
                item.name.as_str()
            } else {
                line.product_name.trim()
            };

            sqlx::query(
                r#"
                INSERT INTO sale_items
                    (sale_id, product_id, product_name, quantity,
                     selling_price_paise, total_amount_paise)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(sale_id)
            .bind(item.id)
            .bind(product_name)
            .bind(line.quantity)
            .bind(line.selling_price.paise())
            .bind(line.amount().paise())
            .execute(&mut *tx)
            .await?;

            product::set_stock(&mut tx, item.id, change.new, now).await?;
            stock::append(
                &mut tx,
                StockEntry {
                    product_id: item.id,
                    date: draft.date,
                    movement: StockMovement::Out,
                    change,
                    reference_id: Some(sale_id),
                    reference_type: StockReference::Sale,
                    notes: &note,
                },
            )
            .await?;
        }

        if settlement.pending.is_positive() {
            if let Some(id) = customer_id {
                customer::add_due(&mut tx, id, settlement.pending).await?;
            }
        }

        tx.commit().await?;

        info!(
            sale_id,
            invoice = %invoice_number,
            total = %settlement.total,
            pending = %settlement.pending,
            payment_type = %draft.payment_type,
            lines = draft.lines.len(),
            "Sale recorded"
        );
        self.changes.publish(SALE_TABLES);

        SaleRepository::new(self.pool.clone()).with_items(sale_id).await
    }

    /// Records the cart as a sale dated `date` and clears it on success.
    /// On error the cart is left as it was so the user can fix it.
    pub async fn commit_sale_cart(
        &self,
        cart: &mut SaleCart,
        date: DateTime<Utc>,
    ) -> DbResult<SaleWithItems> {
        let draft = cart.to_draft(date)?;
        let recorded = self.record_sale(&draft).await?;
        cart.clear();
        Ok(recorded)
    }

    /// Takes a later payment against a sale.
    ///
    /// ## What Changes
    /// - `paid += amount`
    /// - `pending = max(0, pending − amount)`
    /// - the customer's `total_due −= amount` (see [`BalancePolicy`])
    pub async fn pay_sale(&self, sale_id: i64, amount: Money) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let sale = sqlx::query_as::<_, Sale>("SELECT * FROM sales WHERE id = ?1")
            .bind(sale_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let applied = apply_payment(sale.paid_amount(), sale.pending_amount(), amount)?;

        sqlx::query("UPDATE sales SET paid_amount_paise = ?1, pending_amount_paise = ?2 WHERE id = ?3")
            .bind(applied.paid.paise())
            .bind(applied.pending.paise())
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        if let Some(customer_id) = sale.customer_id {
            let due = customer::settle_due(&mut tx, customer_id, amount, self.policy).await?;
            debug!(customer_id, due = ?due.map(|d| d.to_string()), "Customer due settled");
        }

        tx.commit().await?;

        info!(sale_id, amount = %amount, pending = %applied.pending, "Sale payment recorded");
        self.changes.publish(&[Table::Sales, Table::Customers]);

        SaleRepository::new(self.pool.clone()).get(sale_id).await
    }

    // =========================================================================
    // Purchases
    // =========================================================================

    /// Records a purchase with its lines, stock movements and supplier due.
    ///
    /// ## Errors
    /// - `Rejected(..)` from settling the draft
    /// - `NotFound` for a missing supplier or product
    pub async fn record_purchase(&self, draft: &PurchaseDraft) -> DbResult<PurchaseWithItems> {
        let settlement = draft.settle()?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        if let Some(supplier_id) = draft.supplier_id {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM suppliers WHERE id = ?1")
                .bind(supplier_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(DbError::not_found("Supplier", supplier_id));
            }
        }

        let invoice_number = draft.invoice_number.trim();
        let purchase_id = sqlx::query(
            r#"
            INSERT INTO purchases
                (supplier_id, date, invoice_number, total_amount_paise,
                 paid_amount_paise, pending_amount_paise, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(draft.supplier_id)
        .bind(draft.date)
        .bind(invoice_number)
        .bind(settlement.total.paise())
        .bind(settlement.paid.paise())
        .bind(settlement.pending.paise())
        .bind(draft.notes.trim())
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let note = if invoice_number.is_empty() {
            purchase_stock_note(&purchase_id.to_string())
        } else {
            purchase_stock_note(invoice_number)
        };

        for line in &draft.lines {
            let item = product::fetch(&mut tx, line.product_id).await?;
            let change = StockChange::incoming(item.current_stock, line.quantity)?;

            sqlx::query(
                r#"
                INSERT INTO purchase_items
                    (purchase_id, product_id, quantity, purchase_price_paise, total_amount_paise)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(purchase_id)
            .bind(item.id)
            .bind(line.quantity)
            .bind(line.purchase_price.paise())
            .bind(line.amount().paise())
            .execute(&mut *tx)
            .await?;

            product::set_stock(&mut tx, item.id, change.new, now).await?;
            stock::append(
                &mut tx,
                StockEntry {
                    product_id: item.id,
                    date: draft.date,
                    movement: StockMovement::In,
                    change,
                    reference_id: Some(purchase_id),
                    reference_type: StockReference::Purchase,
                    notes: &note,
                },
            )
            .await?;
        }

        if settlement.pending.is_positive() {
            if let Some(supplier_id) = draft.supplier_id {
                supplier::add_due(&mut tx, supplier_id, settlement.pending).await?;
            }
        }

        tx.commit().await?;

        info!(
            purchase_id,
            invoice = %invoice_number,
            total = %settlement.total,
            pending = %settlement.pending,
            lines = draft.lines.len(),
            "Purchase recorded"
        );
        self.changes.publish(PURCHASE_TABLES);

        PurchaseRepository::new(self.pool.clone())
            .with_items(purchase_id)
            .await
    }

    /// Records the cart as a purchase dated `date` and clears it on success.
    pub async fn commit_purchase_cart(
        &self,
        cart: &mut PurchaseCart,
        date: DateTime<Utc>,
    ) -> DbResult<PurchaseWithItems> {
        let draft = cart.to_draft(date)?;
        let recorded = self.record_purchase(&draft).await?;
        cart.clear();
        Ok(recorded)
    }

    /// Pays a supplier against a purchase. Same arithmetic as
    /// [`pay_sale`](Self::pay_sale).
    pub async fn pay_purchase(&self, purchase_id: i64, amount: Money) -> DbResult<Purchase> {
        let mut tx = self.pool.begin().await?;

        let purchase = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = ?1")
            .bind(purchase_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", purchase_id))?;

        let applied = apply_payment(purchase.paid_amount(), purchase.pending_amount(), amount)?;

        sqlx::query(
            "UPDATE purchases SET paid_amount_paise = ?1, pending_amount_paise = ?2 WHERE id = ?3",
        )
        .bind(applied.paid.paise())
        .bind(applied.pending.paise())
        .bind(purchase_id)
        .execute(&mut *tx)
        .await?;

        if let Some(supplier_id) = purchase.supplier_id {
            let due = supplier::settle_due(&mut tx, supplier_id, amount, self.policy).await?;
            debug!(supplier_id, due = ?due.map(|d| d.to_string()), "Supplier due settled");
        }

        tx.commit().await?;

        info!(purchase_id, amount = %amount, pending = %applied.pending, "Purchase payment recorded");
        self.changes.publish(&[Table::Purchases, Table::Suppliers]);

        PurchaseRepository::new(self.pool.clone()).get(purchase_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use anvil_core::ledger::{CustomerRef, PurchaseDraftLine, SaleDraftLine};
    use anvil_core::{CoreError, NewProduct, NewSupplier, PaymentType, Product};

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn db_with_policy(policy: BalancePolicy) -> Database {
        Database::new(DbConfig::in_memory().balance_policy(policy))
            .await
            .unwrap()
    }

    async fn cement(db: &Database, stock: i64) -> Product {
        db.products()
            .create(
                &NewProduct::new("Cement 50kg", Money::from_rupees(350), Money::from_rupees(400))
                    .with_opening_stock(stock)
                    .with_low_stock_alert(5),
            )
            .await
            .unwrap()
    }

    fn sale(product: &Product, qty: i64, payment_type: PaymentType, paid: Money) -> SaleDraft {
        SaleDraft {
            customer: CustomerRef::default(),
            date: Utc::now(),
            lines: vec![SaleDraftLine {
                product_id: product.id,
                product_name: String::new(),
                quantity: qty,
                selling_price: product.selling_price(),
            }],
            payment_type,
            paid,
            invoice_number: None,
        }
    }

    fn purchase(supplier_id: Option<i64>, product: &Product, paid: Money) -> PurchaseDraft {
        PurchaseDraft {
            supplier_id,
            date: Utc::now(),
            invoice_number: "B-2231".to_string(),
            lines: vec![PurchaseDraftLine {
                product_id: product.id,
                quantity: 10,
                purchase_price: Money::from_rupees(100),
            }],
            paid,
            notes: String::new(),
        }
    }

    async fn supplier(db: &Database) -> i64 {
        db.suppliers()
            .create(&NewSupplier {
                name: "Sharma Traders".to_string(),
                ..NewSupplier::default()
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_sale_moves_stock_and_writes_history() {
        let db = db().await;
        let product = cement(&db, 10).await;

        let recorded = db
            .ledger()
            .record_sale(&sale(&product, 7, PaymentType::Cash, Money::zero()))
            .await
            .unwrap();

        let after = db.products().get(product.id).await.unwrap();
        assert_eq!(after.current_stock, 3);
        assert!(after.is_low_stock());

        let history = db
            .stock_history()
            .by_reference(StockReference::Sale, recorded.sale.id)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].movement, StockMovement::Out);
        assert_eq!(history[0].quantity, 7);
        assert_eq!((history[0].previous_stock, history[0].new_stock), (10, 3));
        assert_eq!(history[0].notes, "Sale #INV0001");

        assert_eq!(recorded.items.len(), 1);
        assert_eq!(recorded.items[0].product_name, "Cement 50kg");
        assert_eq!(recorded.items[0].total_amount(), Money::from_rupees(2800));
    }

    #[tokio::test]
    async fn test_cash_sale_is_fully_paid() {
        let db = db().await;
        let product = cement(&db, 10).await;

        let recorded = db
            .ledger()
            .record_sale(&sale(&product, 2, PaymentType::Cash, Money::from_rupees(1)))
            .await
            .unwrap();

        let s = &recorded.sale;
        assert_eq!(s.paid_amount(), s.total_amount());
        assert!(s.pending_amount().is_zero());
        assert_eq!(s.pending_amount(), s.total_amount() - s.paid_amount());
    }

    #[tokio::test]
    async fn test_credit_sale_creates_customer_with_due() {
        let db = db().await;
        let product = cement(&db, 10).await;

        let mut draft = sale(&product, 1, PaymentType::Credit, Money::from_rupees(350));
        draft.customer = CustomerRef::new("Ravi Kumar", "9999999999");

        let recorded = db.ledger().record_sale(&draft).await.unwrap();
        assert_eq!(recorded.sale.pending_amount(), Money::from_rupees(50));
        assert_eq!(recorded.sale.customer_name, "Ravi Kumar");

        let customer = db.customers().by_phone("9999999999").await.unwrap().unwrap();
        assert_eq!(Some(customer.id), recorded.sale.customer_id);
        assert_eq!(customer.total_due(), Money::from_rupees(50));

        // Same phone again: reused, due accumulates
        let mut again = sale(&product, 1, PaymentType::Credit, Money::from_rupees(300));
        again.customer = CustomerRef::new("Ravi", "9999999999");
        db.ledger().record_sale(&again).await.unwrap();

        assert_eq!(db.customers().list().await.unwrap().len(), 1);
        let customer = db.customers().get(customer.id).await.unwrap();
        assert_eq!(customer.total_due(), Money::from_rupees(150));
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential() {
        let db = db().await;
        let product = cement(&db, 10).await;
        let ledger = db.ledger();

        let first = ledger
            .record_sale(&sale(&product, 1, PaymentType::Cash, Money::zero()))
            .await
            .unwrap();
        let second = ledger
            .record_sale(&sale(&product, 1, PaymentType::Cash, Money::zero()))
            .await
            .unwrap();

        assert_eq!(first.sale.invoice_number, "INV0001");
        assert_eq!(second.sale.invoice_number, "INV0002");
        assert_eq!(db.shop().get().await.unwrap().next_invoice_number, 3);

        // An explicit number leaves the counter alone
        let mut manual = sale(&product, 1, PaymentType::Cash, Money::zero());
        manual.invoice_number = Some("MANUAL-7".to_string());
        let third = ledger.record_sale(&manual).await.unwrap();
        assert_eq!(third.sale.invoice_number, "MANUAL-7");
        assert_eq!(db.shop().get().await.unwrap().next_invoice_number, 3);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_everything() {
        let db = db().await;
        let product = cement(&db, 5).await;

        let mut draft = sale(&product, 3, PaymentType::Credit, Money::zero());
        draft.customer = CustomerRef::new("Nobody", "8888888888");
        // Second line of the same product pushes past stock
        draft.lines.push(draft.lines[0].clone());

        let err = db.ledger().record_sale(&draft).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InsufficientStock { available: 2, requested: 3, .. })
        ));

        assert_eq!(db.products().get(product.id).await.unwrap().current_stock, 5);
        assert!(db.sales().list().await.unwrap().is_empty());
        assert!(db.customers().list().await.unwrap().is_empty());
        assert_eq!(db.shop().get().await.unwrap().next_invoice_number, 1);
        assert_eq!(db.stock_history().by_product(product.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_and_overpaid_sales_rejected() {
        let db = db().await;
        let product = cement(&db, 5).await;

        let mut empty = sale(&product, 1, PaymentType::Cash, Money::zero());
        empty.lines.clear();
        assert!(matches!(
            db.ledger().record_sale(&empty).await,
            Err(DbError::Rejected(CoreError::EmptyCart))
        ));

        let overpaid = sale(&product, 1, PaymentType::Credit, Money::from_rupees(401));
        assert!(matches!(
            db.ledger().record_sale(&overpaid).await,
            Err(DbError::Rejected(CoreError::InvalidPaymentAmount { .. }))
        ));
    }

    #[tokio::test]
    async fn test_sale_of_missing_product_fails() {
        let db = db().await;
        let product = cement(&db, 5).await;
        let draft = sale(&product, 1, PaymentType::Cash, Money::zero());
        db.products().delete(product.id).await.unwrap();

        assert!(matches!(
            db.ledger().record_sale(&draft).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_purchase_adds_stock_and_supplier_due() {
        let db = db().await;
        let product = cement(&db, 3).await;
        let supplier_id = supplier(&db).await;

        let recorded = db
            .ledger()
            .record_purchase(&purchase(Some(supplier_id), &product, Money::from_rupees(400)))
            .await
            .unwrap();

        assert_eq!(recorded.purchase.total_amount(), Money::from_rupees(1000));
        assert_eq!(recorded.purchase.pending_amount(), Money::from_rupees(600));
        assert_eq!(recorded.items.len(), 1);

        let supplier = db.suppliers().get(supplier_id).await.unwrap();
        assert_eq!(supplier.total_due(), Money::from_rupees(600));

        assert_eq!(db.products().get(product.id).await.unwrap().current_stock, 13);
        let history = db
            .stock_history()
            .by_reference(StockReference::Purchase, recorded.purchase.id)
            .await
            .unwrap();
        assert_eq!((history[0].previous_stock, history[0].new_stock), (3, 13));
        assert_eq!(history[0].notes, "Purchase #B-2231");
    }

    #[tokio::test]
    async fn test_purchase_with_unknown_supplier_fails() {
        let db = db().await;
        let product = cement(&db, 3).await;

        let err = db
            .ledger()
            .record_purchase(&purchase(Some(77), &product, Money::zero()))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(db.products().get(product.id).await.unwrap().current_stock, 3);
        assert!(db.purchases().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overpayment_on_purchase_allows_negative_due() {
        let db = db().await;
        let product = cement(&db, 3).await;
        let supplier_id = supplier(&db).await;

        let recorded = db
            .ledger()
            .record_purchase(&purchase(Some(supplier_id), &product, Money::from_rupees(400)))
            .await
            .unwrap();

        let paid = db
            .ledger()
            .pay_purchase(recorded.purchase.id, Money::from_rupees(1000))
            .await
            .unwrap();
        assert!(paid.pending_amount().is_zero());
        assert_eq!(paid.paid_amount(), Money::from_rupees(1400));

        let supplier = db.suppliers().get(supplier_id).await.unwrap();
        assert_eq!(supplier.total_due(), Money::from_rupees(-400));
    }

    #[tokio::test]
    async fn test_overpayment_on_sale_allows_negative_due() {
        let db = db().await;
        let product = cement(&db, 10).await;

        let mut draft = sale(&product, 2, PaymentType::Credit, Money::from_rupees(200));
        draft.customer = CustomerRef::new("Suresh", "9000000002");
        let recorded = db.ledger().record_sale(&draft).await.unwrap();
        assert_eq!(recorded.sale.pending_amount(), Money::from_rupees(600));

        let paid = db
            .ledger()
            .pay_sale(recorded.sale.id, Money::from_rupees(1000))
            .await
            .unwrap();
        assert!(paid.pending_amount().is_zero());
        assert_eq!(
            paid.paid_amount(),
            recorded.sale.paid_amount() + Money::from_rupees(1000)
        );

        let customer = db.customers().by_phone("9000000002").await.unwrap().unwrap();
        assert_eq!(customer.total_due(), Money::from_rupees(-400));
    }

    #[tokio::test]
    async fn test_huge_sale_payment_rejected_and_sale_unchanged() {
        let db = db().await;
        let product = cement(&db, 10).await;

        let mut draft = sale(&product, 2, PaymentType::Credit, Money::from_rupees(200));
        draft.customer = CustomerRef::new("Suresh", "9000000002");
        let recorded = db.ledger().record_sale(&draft).await.unwrap();

        assert!(matches!(
            db.ledger()
                .pay_sale(recorded.sale.id, Money::from_paise(i64::MAX - 10))
                .await,
            Err(DbError::Rejected(CoreError::Validation(_)))
        ));

        let sale = db.sales().get(recorded.sale.id).await.unwrap();
        assert_eq!(sale.paid_amount(), Money::from_rupees(200));
        assert_eq!(sale.pending_amount(), Money::from_rupees(600));
        let customer = db.customers().by_phone("9000000002").await.unwrap().unwrap();
        assert_eq!(customer.total_due(), Money::from_rupees(600));
    }

    #[tokio::test]
    async fn test_clamp_policy_stops_due_at_zero() {
        let db = db_with_policy(BalancePolicy::ClampAtZero).await;
        let product = cement(&db, 3).await;
        let supplier_id = supplier(&db).await;

        let recorded = db
            .ledger()
            .record_purchase(&purchase(Some(supplier_id), &product, Money::from_rupees(400)))
            .await
            .unwrap();
        db.ledger()
            .pay_purchase(recorded.purchase.id, Money::from_rupees(1000))
            .await
            .unwrap();

        let supplier = db.suppliers().get(supplier_id).await.unwrap();
        assert_eq!(supplier.total_due(), Money::zero());
    }

    #[tokio::test]
    async fn test_sale_payment_updates_customer() {
        let db = db().await;
        let product = cement(&db, 10).await;

        let mut draft = sale(&product, 2, PaymentType::Credit, Money::from_rupees(500));
        draft.customer = CustomerRef::new("Meena", "9000000001");
        let recorded = db.ledger().record_sale(&draft).await.unwrap();

        let paid = db
            .ledger()
            .pay_sale(recorded.sale.id, Money::from_rupees(200))
            .await
            .unwrap();
        assert_eq!(paid.paid_amount(), Money::from_rupees(700));
        assert_eq!(paid.pending_amount(), Money::from_rupees(100));

        let customer = db.customers().by_phone("9000000001").await.unwrap().unwrap();
        assert_eq!(customer.total_due(), Money::from_rupees(100));

        assert!(matches!(
            db.ledger().pay_sale(recorded.sale.id, Money::zero()).await,
            Err(DbError::Rejected(CoreError::Validation(_)))
        ));
        assert!(matches!(
            db.ledger().pay_sale(9999, Money::from_rupees(1)).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_commit_cart_clears_only_on_success() {
        let db = db().await;
        let product = cement(&db, 4).await;

        let mut cart = SaleCart::new();
        cart.add_product(&product, 4).unwrap();

        // Stock moves behind the cart's back
        db.products().adjust_stock(product.id, 2, "Breakage").await.unwrap();
        assert!(db.ledger().commit_sale_cart(&mut cart, Utc::now()).await.is_err());
        assert_eq!(cart.len(), 1);

        cart.clear();
        let product = db.products().get(product.id).await.unwrap();
        cart.add_product(&product, 2).unwrap();
        let recorded = db.ledger().commit_sale_cart(&mut cart, Utc::now()).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(recorded.sale.total_amount(), Money::from_rupees(800));
    }

    #[tokio::test]
    async fn test_commit_purchase_cart() {
        let db = db().await;
        let product = cement(&db, 0).await;
        let supplier_id = supplier(&db).await;

        let mut cart = PurchaseCart::new();
        cart.set_supplier(Some(supplier_id));
        cart.set_invoice_number("ST-19");
        cart.add_product(&product, 20, None).unwrap();
        cart.set_paid(Money::from_rupees(7000)).unwrap();

        let recorded = db.ledger().commit_purchase_cart(&mut cart, Utc::now()).await.unwrap();
        assert!(cart.is_empty());
        assert!(recorded.purchase.pending_amount().is_zero());
        assert_eq!(db.products().get(product.id).await.unwrap().current_stock, 20);
        assert_eq!(db.suppliers().get(supplier_id).await.unwrap().total_due(), Money::zero());
    }
}
