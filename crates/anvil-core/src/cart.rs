//! # Carts
//!
//! In-progress sales and purchases, held in memory until committed.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ┌──────────┐  add_product   ┌──────────┐  to_draft   ┌─────────────┐   │
//! │  │  Empty   │──────────────►│ Building │────────────►│  Committed  │   │
//! │  │  Cart    │               │          │  (anvil-db)  │  (cleared)  │   │
//! │  └──────────┘◄──────────────└──────────┘             └─────────────┘   │
//! │                   clear        │    ▲                                   │
//! │                                │    │ remove_line(index)               │
//! │                                │    │ set_paid / set_payment_type      │
//! │                                └────┘                                   │
//! │                                                                         │
//! │  Totals are derived from the lines on every read, so they are always   │
//! │  current after any mutation.                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Lines keep the order they were added in. Adding the same product twice
//! produces two lines, and the stock check counts both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ledger::{CustomerRef, PurchaseDraft, PurchaseDraftLine, SaleDraft, SaleDraftLine};
use crate::money::Money;
use crate::types::{PaymentType, Product};
use crate::validation::{validate_cart_size, validate_price, validate_quantity};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Running totals shown under a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub total: Money,
    pub paid: Money,
    /// `total − paid`. Negative when the typed paid amount overshoots,
    /// which the commit will reject.
    pub pending: Money,
}

fn check_line(lines: usize, quantity: i64) -> CoreResult<()> {
    validate_cart_size(lines).map_err(|_| CoreError::CartTooLarge {
        max: MAX_CART_ITEMS,
    })?;
    if quantity > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        });
    }
    validate_quantity(quantity)?;
    Ok(())
}

// =============================================================================
// Sale Cart
// =============================================================================

/// A sale line with the price frozen when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: i64,
    pub product_name: String,
    pub unit: String,
    pub quantity: i64,
    pub rate: Money,
}

impl SaleLine {
    #[inline]
    pub fn amount(&self) -> Money {
        self.rate.multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleCart {
    lines: Vec<SaleLine>,
    pub customer: CustomerRef,
    pub payment_type: PaymentType,
    paid: Money,
    pub created_at: DateTime<Utc>,
}

impl SaleCart {
    pub fn new() -> Self {
        SaleCart {
            lines: Vec::new(),
            customer: CustomerRef::default(),
            payment_type: PaymentType::Cash,
            paid: Money::zero(),
            created_at: Utc::now(),
        }
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Units of `product_id` already in the cart.
    pub fn quantity_of(&self, product_id: i64) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.product_id == product_id)
            .map(|l| l.quantity)
            .sum()
    }

    /// Adds `quantity` units of `product` at its current selling price.
    ///
    /// ## Errors
    /// - `InsufficientStock` when this line plus the product's existing
    ///   lines would exceed `current_stock`
    /// - `CartTooLarge` / `QuantityTooLarge` / validation on limits
    ///
    /// ## Example
    /// ```rust,ignore
    /// cart.add_product(&putty, 2)?;   // Ok, stock 3
    /// cart.add_product(&putty, 2)?;   // Err: 4 requested, 3 available
    /// ```
    pub fn add_product(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        check_line(self.lines.len(), quantity)?;

        let requested = self.quantity_of(product.id) + quantity;
        if !product.can_sell(requested) {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.current_stock,
                requested,
            });
        }

        self.lines.push(SaleLine {
            product_id: product.id,
            product_name: product.name.clone(),
            unit: product.unit.clone(),
            quantity,
            rate: product.selling_price(),
        });
        Ok(())
    }

    /// Removes the line at `index` (0-based, in display order).
    pub fn remove_line(&mut self, index: usize) -> CoreResult<SaleLine> {
        if index >= self.lines.len() {
            return Err(CoreError::LineOutOfRange {
                index,
                len: self.lines.len(),
            });
        }
        Ok(self.lines.remove(index))
    }

    /// Empties the cart and resets payment details.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.customer = CustomerRef::default();
        self.payment_type = PaymentType::Cash;
        self.paid = Money::zero();
        self.created_at = Utc::now();
    }

    pub fn set_customer(&mut self, name: impl Into<String>, phone: impl Into<String>) {
        self.customer = CustomerRef::new(name, phone);
    }

    pub fn set_payment_type(&mut self, payment_type: PaymentType) {
        self.payment_type = payment_type;
    }

    /// Sets the amount received. Only used for CREDIT sales.
    pub fn set_paid(&mut self, paid: Money) -> CoreResult<()> {
        validate_price("paid amount", paid)?;
        self.paid = paid;
        Ok(())
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(SaleLine::amount).sum()
    }

    /// Paid amount after the CASH rule.
    pub fn effective_paid(&self) -> Money {
        match self.payment_type {
            PaymentType::Cash => self.total(),
            PaymentType::Credit => self.paid,
        }
    }

    pub fn totals(&self) -> CartTotals {
        let total = self.total();
        let paid = self.effective_paid();
        CartTotals {
            line_count: self.lines.len(),
            total_quantity: self.lines.iter().map(|l| l.quantity).sum(),
            total,
            paid,
            pending: total - paid,
        }
    }

    /// Snapshot of the cart as a sale to record.
    pub fn to_draft(&self, date: DateTime<Utc>) -> CoreResult<SaleDraft> {
        let draft = SaleDraft {
            customer: self.customer.clone(),
            date,
            lines: self
                .lines
                .iter()
                .map(|l| SaleDraftLine {
                    product_id: l.product_id,
                    product_name: l.product_name.clone(),
                    quantity: l.quantity,
                    selling_price: l.rate,
                })
                .collect(),
            payment_type: self.payment_type,
            paid: self.paid,
            invoice_number: None,
        };
        draft.settle()?;
        Ok(draft)
    }
}

impl Default for SaleCart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Purchase Cart
// =============================================================================

/// A purchase line at the rate on the supplier's bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    pub rate: Money,
}

impl PurchaseLine {
    #[inline]
    pub fn amount(&self) -> Money {
        self.rate.multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseCart {
    lines: Vec<PurchaseLine>,
    pub supplier_id: Option<i64>,
    pub invoice_number: String,
    pub notes: String,
    paid: Money,
    pub created_at: DateTime<Utc>,
}

impl PurchaseCart {
    pub fn new() -> Self {
        PurchaseCart {
            lines: Vec::new(),
            supplier_id: None,
            invoice_number: String::new(),
            notes: String::new(),
            paid: Money::zero(),
            created_at: Utc::now(),
        }
    }

    pub fn lines(&self) -> &[PurchaseLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Adds `quantity` units of `product`. `rate` defaults to the product's
    /// purchase price when the bill does not say otherwise.
    pub fn add_product(
        &mut self,
        product: &Product,
        quantity: i64,
        rate: Option<Money>,
    ) -> CoreResult<()> {
        check_line(self.lines.len(), quantity)?;
        let rate = rate.unwrap_or_else(|| product.purchase_price());
        validate_price("purchase price", rate)?;

        self.lines.push(PurchaseLine {
            product_id: product.id,
            product_name: product.name.clone(),
            quantity,
            rate,
        });
        Ok(())
    }

    pub fn remove_line(&mut self, index: usize) -> CoreResult<PurchaseLine> {
        if index >= self.lines.len() {
            return Err(CoreError::LineOutOfRange {
                index,
                len: self.lines.len(),
            });
        }
        Ok(self.lines.remove(index))
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.supplier_id = None;
        self.invoice_number.clear();
        self.notes.clear();
        self.paid = Money::zero();
        self.created_at = Utc::now();
    }

    pub fn set_supplier(&mut self, supplier_id: Option<i64>) {
        self.supplier_id = supplier_id;
    }

    pub fn set_invoice_number(&mut self, invoice_number: impl Into<String>) {
        self.invoice_number = invoice_number.into();
    }

    pub fn set_paid(&mut self, paid: Money) -> CoreResult<()> {
        validate_price("paid amount", paid)?;
        self.paid = paid;
        Ok(())
    }

    pub fn total(&self) -> Money {
        self.lines.iter().map(PurchaseLine::amount).sum()
    }

    pub fn totals(&self) -> CartTotals {
        let total = self.total();
        CartTotals {
            line_count: self.lines.len(),
            total_quantity: self.lines.iter().map(|l| l.quantity).sum(),
            total,
            paid: self.paid,
            pending: total - self.paid,
        }
    }

    pub fn to_draft(&self, date: DateTime<Utc>) -> CoreResult<PurchaseDraft> {
        let draft = PurchaseDraft {
            supplier_id: self.supplier_id,
            date,
            invoice_number: self.invoice_number.trim().to_string(),
            lines: self
                .lines
                .iter()
                .map(|l| PurchaseDraftLine {
                    product_id: l.product_id,
                    quantity: l.quantity,
                    purchase_price: l.rate,
                })
                .collect(),
            paid: self.paid,
            notes: self.notes.clone(),
        };
        draft.settle()?;
        Ok(draft)
    }
}

impl Default for PurchaseCart {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, stock: i64, sell_rupees: i64) -> Product {
        let now = Utc::now();
        Product {
            id,
            name: format!("Item {}", id),
            category_id: None,
            brand: String::new(),
            size: String::new(),
            color: String::new(),
            unit: "pcs".to_string(),
            purchase_price_paise: sell_rupees * 80,
            selling_price_paise: sell_rupees * 100,
            opening_stock: stock,
            current_stock: stock,
            low_stock_alert: 5,
            barcode: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sale_cart_add_and_totals() {
        let mut cart = SaleCart::new();
        cart.add_product(&product(1, 10, 50), 2).unwrap();
        cart.add_product(&product(2, 10, 30), 1).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.line_count, 2);
        assert_eq!(totals.total_quantity, 3);
        assert_eq!(totals.total, Money::from_rupees(130));
        assert_eq!(totals.paid, totals.total);
        assert!(totals.pending.is_zero());
    }

    #[test]
    fn test_sale_cart_stock_check_counts_existing_lines() {
        let putty = product(1, 3, 50);
        let mut cart = SaleCart::new();
        cart.add_product(&putty, 2).unwrap();

        let err = cart.add_product(&putty, 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 3, requested: 4, .. }
        ));
        assert_eq!(cart.len(), 1);

        cart.add_product(&putty, 1).unwrap();
        assert_eq!(cart.quantity_of(1), 3);
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_sale_cart_rejects_bad_quantity() {
        let mut cart = SaleCart::new();
        assert!(cart.add_product(&product(1, 10, 5), 0).is_err());
        assert!(matches!(
            cart.add_product(&product(1, 10, 5), MAX_ITEM_QUANTITY + 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_sale_cart_remove_by_position() {
        let mut cart = SaleCart::new();
        cart.add_product(&product(1, 10, 50), 1).unwrap();
        cart.add_product(&product(2, 10, 30), 1).unwrap();
        cart.add_product(&product(3, 10, 20), 1).unwrap();

        let removed = cart.remove_line(1).unwrap();
        assert_eq!(removed.product_id, 2);
        let ids: Vec<i64> = cart.lines().iter().map(|l| l.product_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(cart.total(), Money::from_rupees(70));

        assert!(matches!(
            cart.remove_line(5),
            Err(CoreError::LineOutOfRange { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_sale_cart_credit_pending() {
        let mut cart = SaleCart::new();
        cart.add_product(&product(1, 10, 100), 3).unwrap();
        cart.set_payment_type(PaymentType::Credit);
        cart.set_paid(Money::from_rupees(250)).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.paid, Money::from_rupees(250));
        assert_eq!(totals.pending, Money::from_rupees(50));

        cart.set_payment_type(PaymentType::Cash);
        assert!(cart.totals().pending.is_zero());
        assert!(cart.set_paid(Money::from_paise(-1)).is_err());
    }

    #[test]
    fn test_sale_cart_to_draft() {
        let mut cart = SaleCart::new();
        assert!(matches!(cart.to_draft(Utc::now()), Err(CoreError::EmptyCart)));

        cart.add_product(&product(7, 10, 40), 2).unwrap();
        cart.set_customer("Ramesh", "9999999999");
        let draft = cart.to_draft(Utc::now()).unwrap();
        assert_eq!(draft.lines.len(), 1);
        assert_eq!(draft.lines[0].selling_price, Money::from_rupees(40));
        assert_eq!(draft.customer.phone, "9999999999");
        assert_eq!(draft.total(), Money::from_rupees(80));
    }

    #[test]
    fn test_sale_cart_clear() {
        let mut cart = SaleCart::new();
        cart.add_product(&product(1, 10, 50), 2).unwrap();
        cart.set_payment_type(PaymentType::Credit);
        cart.set_customer("Ramesh", "");
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.payment_type, PaymentType::Cash);
        assert!(!cart.customer.is_named());
    }

    #[test]
    fn test_purchase_cart_rates() {
        let mut cart = PurchaseCart::new();
        let pipe = product(1, 0, 100); // purchase price ₹80
        cart.add_product(&pipe, 10, None).unwrap();
        cart.add_product(&pipe, 5, Some(Money::from_rupees(75))).unwrap();

        assert_eq!(cart.lines()[0].rate, Money::from_rupees(80));
        assert_eq!(cart.total(), Money::from_rupees(800 + 375));

        cart.set_paid(Money::from_rupees(500)).unwrap();
        assert_eq!(cart.totals().pending, Money::from_rupees(675));
    }

    #[test]
    fn test_purchase_cart_overpaid_draft_rejected() {
        let mut cart = PurchaseCart::new();
        cart.add_product(&product(1, 0, 100), 1, Some(Money::from_rupees(10))).unwrap();
        cart.set_paid(Money::from_rupees(11)).unwrap();
        assert!(cart.totals().pending.is_negative());
        assert!(cart.to_draft(Utc::now()).is_err());
    }

    #[test]
    fn test_purchase_cart_clear() {
        let mut cart = PurchaseCart::new();
        cart.set_supplier(Some(3));
        cart.set_invoice_number("B-1");
        cart.add_product(&product(1, 0, 100), 1, None).unwrap();
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.supplier_id, None);
        assert!(cart.invoice_number.is_empty());
    }
}
