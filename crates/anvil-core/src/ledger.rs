//! # Ledger Arithmetic
//!
//! The pure half of recording sales and purchases: what gets written, and
//! the numbers that must hold afterwards. `anvil-db` performs the writes
//! inside one transaction using these helpers.
//!
//! ## Identities Kept Here
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  total    = Σ quantity × rate                                           │
//! │  pending  = total − paid          (never negative: paid ≤ total)        │
//! │  CASH     ⇒ paid = total, pending = 0                                   │
//! │                                                                         │
//! │  payment:  paid' = paid + amount                                        │
//! │            pending' = max(0, pending − amount)                          │
//! │            due' = due − amount    (BalancePolicy decides the floor)     │
//! │                                                                         │
//! │  stock:    OUT  new = previous − quantity   (fails below zero)          │
//! │            IN   new = previous + quantity                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::PaymentType;
use crate::validation::{validate_payment_amount, validate_phone, validate_price, validate_quantity};

// =============================================================================
// Balance Policy
// =============================================================================

/// What happens when a payment exceeds a party's running due.
///
/// The shop's historical books let `total_due` go below zero (an advance
/// held for the party). Some owners prefer the balance to stop at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    /// `due -= amount` with no floor.
    #[default]
    AllowNegative,
    /// `due = max(0, due - amount)`.
    ClampAtZero,
}

impl BalancePolicy {
    /// Applies a payment to a running due.
    ///
    /// ## Example
    /// ```rust
    /// use anvil_core::ledger::BalancePolicy;
    /// use anvil_core::money::Money;
    ///
    /// let due = Money::from_rupees(600);
    /// let paid = Money::from_rupees(1000);
    /// assert_eq!(BalancePolicy::AllowNegative.settle_due(due, paid), Money::from_rupees(-400));
    /// assert_eq!(BalancePolicy::ClampAtZero.settle_due(due, paid), Money::zero());
    /// ```
    pub fn settle_due(&self, due: Money, amount: Money) -> Money {
        match self {
            BalancePolicy::AllowNegative => due - amount,
            BalancePolicy::ClampAtZero => (due - amount).floor_zero(),
        }
    }
}

// =============================================================================
// Settlement
// =============================================================================

/// Totals written onto a Sale or Purchase row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub total: Money,
    pub paid: Money,
    pub pending: Money,
}

impl Settlement {
    /// Settles a purchase: the shop paid `paid` out of `total`.
    pub fn for_purchase(total: Money, paid: Money) -> CoreResult<Self> {
        Settlement::checked(total, paid)
    }

    /// Settles a sale. CASH ignores `paid` and takes the full total.
    ///
    /// ## Example
    /// ```rust
    /// use anvil_core::ledger::Settlement;
    /// use anvil_core::money::Money;
    /// use anvil_core::types::PaymentType;
    ///
    /// let s = Settlement::for_sale(Money::from_rupees(500), PaymentType::Cash, Money::zero()).unwrap();
    /// assert_eq!(s.paid, Money::from_rupees(500));
    /// assert!(s.pending.is_zero());
    /// ```
    pub fn for_sale(total: Money, payment_type: PaymentType, paid: Money) -> CoreResult<Self> {
        match payment_type {
            PaymentType::Cash => Settlement::checked(total, total),
            PaymentType::Credit => Settlement::checked(total, paid),
        }
    }

    fn checked(total: Money, paid: Money) -> CoreResult<Self> {
        if paid.is_negative() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "paid amount cannot be negative".to_string(),
            });
        }
        if paid > total {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!("paid {} is more than the total {}", paid, total),
            });
        }
        Ok(Settlement {
            total,
            paid,
            pending: total - paid,
        })
    }
}

/// Result of applying a later payment to a sale or purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentApplication {
    pub paid: Money,
    pub pending: Money,
}

/// Applies `amount` to a recorded sale or purchase.
///
/// `paid` grows by the whole amount; `pending` stops at zero.
pub fn apply_payment(paid: Money, pending: Money, amount: Money) -> CoreResult<PaymentApplication> {
    validate_payment_amount(amount)?;
    let paid = paid
        .checked_add(amount)
        .ok_or_else(|| CoreError::InvalidPaymentAmount {
            reason: format!("paying {} would overflow the paid total {}", amount, paid),
        })?;
    Ok(PaymentApplication {
        paid,
        pending: (pending - amount).floor_zero(),
    })
}

/// Sums `price × quantity` over draft lines, failing instead of overflowing.
fn checked_total(mut lines: impl Iterator<Item = (Money, i64)>) -> CoreResult<Money> {
    lines
        .try_fold(Money::zero(), |total, (price, qty)| {
            price
                .checked_multiply_quantity(qty)
                .and_then(|amount| total.checked_add(amount))
        })
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "bill total".to_string(),
                min: 0,
                max: i64::MAX / 100,
            }
            .into()
        })
}

// =============================================================================
// Stock Arithmetic
// =============================================================================

/// Before/after stock for one history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub previous: i64,
    pub new: i64,
}

impl StockChange {
    /// Stock leaving the shop. Fails rather than going negative.
    pub fn outgoing(product: &str, previous: i64, quantity: i64) -> CoreResult<Self> {
        validate_quantity(quantity)?;
        if quantity > previous {
            return Err(CoreError::InsufficientStock {
                product: product.to_string(),
                available: previous,
                requested: quantity,
            });
        }
        Ok(StockChange {
            previous,
            new: previous - quantity,
        })
    }

    /// Stock arriving.
    pub fn incoming(previous: i64, quantity: i64) -> CoreResult<Self> {
        validate_quantity(quantity)?;
        Ok(StockChange {
            previous,
            new: previous + quantity,
        })
    }

    /// Stock set to a counted value. The history row records the size of
    /// the correction.
    pub fn counted(previous: i64, counted: i64) -> CoreResult<Self> {
        if counted < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "counted stock".to_string(),
            }
            .into());
        }
        Ok(StockChange {
            previous,
            new: counted,
        })
    }

    /// Absolute size of the movement.
    #[inline]
    pub fn quantity(&self) -> i64 {
        (self.new - self.previous).abs()
    }
}

/// History note for a sale line: `Sale #INV0001`.
pub fn sale_stock_note(invoice_number: &str) -> String {
    format!("Sale #{}", invoice_number)
}

/// History note for a purchase line: `Purchase #B-2231`.
pub fn purchase_stock_note(invoice_number: &str) -> String {
    format!("Purchase #{}", invoice_number)
}

pub const OPENING_STOCK_NOTE: &str = "Opening stock";

// =============================================================================
// Drafts
// =============================================================================

/// Who bought, as typed at the counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRef {
    pub name: String,
    pub phone: String,
}

impl CustomerRef {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        CustomerRef {
            name: name.into(),
            phone: phone.into(),
        }
    }

    /// A customer record is only resolved when a name was given.
    #[inline]
    pub fn is_named(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDraftLine {
    pub product_id: i64,
    /// Name copied onto the sale item. Filled from the product when blank.
    pub product_name: String,
    pub quantity: i64,
    pub selling_price: Money,
}

impl SaleDraftLine {
    #[inline]
    pub fn amount(&self) -> Money {
        self.selling_price.multiply_quantity(self.quantity)
    }
}

/// Everything needed to record a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDraft {
    pub customer: CustomerRef,
    pub date: DateTime<Utc>,
    pub lines: Vec<SaleDraftLine>,
    pub payment_type: PaymentType,
    /// Ignored for CASH.
    pub paid: Money,
    /// Taken from the shop counter when None.
    pub invoice_number: Option<String>,
}

impl SaleDraft {
    pub fn total(&self) -> Money {
        self.lines.iter().map(SaleDraftLine::amount).sum()
    }

    /// Checks the draft and works out the totals to persist.
    pub fn settle(&self) -> CoreResult<Settlement> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        for line in &self.lines {
            validate_quantity(line.quantity)?;
            validate_price("selling price", line.selling_price)?;
        }
        validate_phone(&self.customer.phone)?;
        let total = checked_total(self.lines.iter().map(|l| (l.selling_price, l.quantity)))?;
        Settlement::for_sale(total, self.payment_type, self.paid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDraftLine {
    pub product_id: i64,
    pub quantity: i64,
    pub purchase_price: Money,
}

impl PurchaseDraftLine {
    #[inline]
    pub fn amount(&self) -> Money {
        self.purchase_price.multiply_quantity(self.quantity)
    }
}

/// Everything needed to record a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseDraft {
    pub supplier_id: Option<i64>,
    pub date: DateTime<Utc>,
    pub invoice_number: String,
    pub lines: Vec<PurchaseDraftLine>,
    pub paid: Money,
    pub notes: String,
}

impl PurchaseDraft {
    pub fn total(&self) -> Money {
        self.lines.iter().map(PurchaseDraftLine::amount).sum()
    }

    pub fn settle(&self) -> CoreResult<Settlement> {
        if self.lines.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        for line in &self.lines {
            validate_quantity(line.quantity)?;
            validate_price("purchase price", line.purchase_price)?;
        }
        let total = checked_total(self.lines.iter().map(|l| (l.purchase_price, l.quantity)))?;
        Settlement::for_purchase(total, self.paid)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
