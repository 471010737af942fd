//! # Domain Types
//!
//! The ten record types kept by the shop, plus the input structs used to
//! create them.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Category 1──N Product 1──N StockHistory                                │
//! │                   │                                                     │
//! │         ┌─────────┴──────────┐                                          │
//! │         N                    N                                          │
//! │   PurchaseItem            SaleItem                                      │
//! │         N                    N                                          │
//! │         │ (owned)            │ (owned)                                  │
//! │      Purchase              Sale                                         │
//! │         N                    N                                          │
//! │         │                    │                                          │
//! │      Supplier             Customer          ShopInfo (singleton, id=1)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Columns
//! Amounts are stored as `*_paise: i64` so rows map straight from SQLite.
//! Every such field has a `Money` accessor; use those in business code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::{DEFAULT_LOW_STOCK_ALERT, DEFAULT_UNIT};

// =============================================================================
// Enums
// =============================================================================

/// How a sale was settled at the counter.
///
/// CASH sales are always fully paid. CREDIT sales may leave a pending
/// balance that is added to the customer's due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentType {
    #[default]
    Cash,
    Credit,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cash => "CASH",
            PaymentType::Credit => "CREDIT",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum StockMovement {
    /// Stock received (purchase, opening stock).
    In,
    /// Stock sold.
    Out,
    /// Manual correction after a physical count.
    Adjustment,
}

/// What caused a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockReference {
    Sale,
    Purchase,
    OpeningStock,
    Adjustment,
}

// =============================================================================
// Product
// =============================================================================

/// An item on the shop's shelves.
///
/// `current_stock` is only ever changed by a stock movement that also
/// writes a [`StockHistory`] row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category_id: Option<i64>,
    pub brand: String,
    pub size: String,
    pub color: String,
    /// Unit of sale ("pcs", "kg", "ltr", "ft"...).
    pub unit: String,
    pub purchase_price_paise: i64,
    pub selling_price_paise: i64,
    /// Stock entered when the product was first created.
    pub opening_stock: i64,
    pub current_stock: i64,
    /// Reorder threshold. Stock at or below this is "low".
    pub low_stock_alert: i64,
    pub barcode: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_paise(self.purchase_price_paise)
    }

    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_paise(self.selling_price_paise)
    }

    /// True when stock has fallen to the reorder threshold.
    ///
    /// ## Example
    /// A tin of enamel with `current_stock = 5` and `low_stock_alert = 5`
    /// is low. At 6 it is not.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.low_stock_alert
    }

    /// Checks if `quantity` units can be taken off the shelf.
    #[inline]
    pub fn can_sell(&self, quantity: i64) -> bool {
        quantity <= self.current_stock
    }

    /// Value of the stock on hand at purchase price.
    #[inline]
    pub fn stock_value(&self) -> Money {
        Money::from_paise(self.purchase_price_paise.saturating_mul(self.current_stock))
    }

    /// Margin over purchase price, in percent. Zero when purchase price is zero.
    pub fn profit_margin_percent(&self) -> f64 {
        if self.purchase_price_paise <= 0 {
            return 0.0;
        }
        (self.selling_price_paise - self.purchase_price_paise) as f64
            / self.purchase_price_paise as f64
            * 100.0
    }

    /// Short human label: "Asian Paints Apex 4L White".
    pub fn display_name(&self) -> String {
        [self.brand.as_str(), self.name.as_str(), self.size.as_str(), self.color.as_str()]
            .iter()
            .filter(|s| !s.trim().is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category_id: Option<i64>,
    pub brand: String,
    pub size: String,
    pub color: String,
    pub unit: String,
    pub purchase_price: Money,
    pub selling_price: Money,
    /// Becomes both `opening_stock` and the initial `current_stock`.
    pub opening_stock: i64,
    pub low_stock_alert: i64,
    pub barcode: String,
}

impl NewProduct {
    /// Starts a product with the shop defaults (`pcs`, alert at 5).
    pub fn new(name: impl Into<String>, purchase_price: Money, selling_price: Money) -> Self {
        NewProduct {
            name: name.into(),
            category_id: None,
            brand: String::new(),
            size: String::new(),
            color: String::new(),
            unit: DEFAULT_UNIT.to_string(),
            purchase_price,
            selling_price,
            opening_stock: 0,
            low_stock_alert: DEFAULT_LOW_STOCK_ALERT,
            barcode: String::new(),
        }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = brand.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_opening_stock(mut self, stock: i64) -> Self {
        self.opening_stock = stock;
        self
    }

    pub fn with_low_stock_alert(mut self, alert: i64) -> Self {
        self.low_stock_alert = alert;
        self
    }

    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = barcode.into();
        self
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    pub id: i64,
    pub name: String,
}

// =============================================================================
// Parties
// =============================================================================

/// Someone the shop buys from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub address: String,
    /// What the shop owes this supplier.
    pub total_due_paise: i64,
    pub created_at: DateTime<Utc>,
}

impl Supplier {
    #[inline]
    pub fn total_due(&self) -> Money {
        Money::from_paise(self.total_due_paise)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// Someone who buys from the shop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: i64,
    pub name: String,
    /// Used to find a returning customer at the counter.
    pub phone: String,
    /// What this customer owes the shop.
    pub total_due_paise: i64,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    #[inline]
    pub fn total_due(&self) -> Money {
        Money::from_paise(self.total_due_paise)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub phone: String,
}

// =============================================================================
// Purchase
// =============================================================================

/// Stock bought from a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Purchase {
    pub id: i64,
    pub supplier_id: Option<i64>,
    pub date: DateTime<Utc>,
    /// The supplier's bill number, as typed in.
    pub invoice_number: String,
    pub total_amount_paise: i64,
    pub paid_amount_paise: i64,
    pub pending_amount_paise: i64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_paise(self.total_amount_paise)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_paise(self.paid_amount_paise)
    }

    #[inline]
    pub fn pending_amount(&self) -> Money {
        Money::from_paise(self.pending_amount_paise)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseItem {
    pub id: i64,
    pub purchase_id: i64,
    /// None once the product has been deleted.
    pub product_id: Option<i64>,
    pub quantity: i64,
    pub purchase_price_paise: i64,
    pub total_amount_paise: i64,
}

impl PurchaseItem {
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_paise(self.purchase_price_paise)
    }

    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_paise(self.total_amount_paise)
    }
}

/// A purchase together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseWithItems {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,
}

// =============================================================================
// Sale
// =============================================================================

/// A counter sale.
///
/// `customer_name` and `customer_phone` are copied in at sale time and never
/// follow later edits to the customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub customer_phone: String,
    pub date: DateTime<Utc>,
    pub total_amount_paise: i64,
    pub paid_amount_paise: i64,
    pub pending_amount_paise: i64,
    pub payment_type: PaymentType,
    pub invoice_number: String,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_paise(self.total_amount_paise)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_paise(self.paid_amount_paise)
    }

    #[inline]
    pub fn pending_amount(&self) -> Money {
        Money::from_paise(self.pending_amount_paise)
    }

    /// Invoice number to print. Older rows without one fall back to the
    /// prefix and the row id (`INV0042`).
    pub fn display_invoice_number(&self, prefix: &str) -> String {
        if self.invoice_number.trim().is_empty() {
            format_invoice_number(prefix, self.id)
        } else {
            self.invoice_number.clone()
        }
    }

    /// Label for receipts and exports, "Walk-in" when no name was given.
    pub fn customer_label(&self) -> &str {
        if self.customer_name.trim().is_empty() {
            "Walk-in"
        } else {
            &self.customer_name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    /// None once the product has been deleted.
    pub product_id: Option<i64>,
    /// Product name at the time of sale.
    pub product_name: String,
    pub quantity: i64,
    pub selling_price_paise: i64,
    pub total_amount_paise: i64,
}

impl SaleItem {
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_paise(self.selling_price_paise)
    }

    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_paise(self.total_amount_paise)
    }
}

/// A sale together with its lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleWithItems {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Stock History
// =============================================================================

/// One row of the append-only stock audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockHistory {
    pub id: i64,
    pub product_id: i64,
    pub date: DateTime<Utc>,
    pub movement: StockMovement,
    pub quantity: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    /// Id of the sale or purchase that caused the movement.
    pub reference_id: Option<i64>,
    pub reference_type: StockReference,
    pub notes: String,
}

// =============================================================================
// Shop Info
// =============================================================================

/// The shop's own details. Exactly one row, id 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ShopInfo {
    pub id: i64,
    pub shop_name: String,
    pub location: String,
    pub phone: String,
    pub email: String,
    pub gst_number: String,
    pub invoice_prefix: String,
    /// Counter for the next generated sale invoice. Only moves forward.
    pub next_invoice_number: i64,
    /// Ask for a biometric unlock when the app opens.
    pub biometric_enabled: bool,
}

impl ShopInfo {
    /// The invoice number the next sale will get.
    pub fn peek_invoice_number(&self) -> String {
        format_invoice_number(&self.invoice_prefix, self.next_invoice_number)
    }
}

/// Formats a sale invoice number: prefix plus a zero-padded counter.
///
/// ## Example
/// ```rust
/// use anvil_core::types::format_invoice_number;
///
/// assert_eq!(format_invoice_number("INV", 1), "INV0001");
/// assert_eq!(format_invoice_number("KH-", 12345), "KH-12345");
/// ```
pub fn format_invoice_number(prefix: &str, number: i64) -> String {
    format!("{}{:04}", prefix, number)
}

// =============================================================================
// Unit Tests
// =============================================================================
