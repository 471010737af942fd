//! # anvil-core: Pure Business Logic for Anvil
//!
//! Everything the shop's books depend on that can be computed without
//! touching a disk: money, entities, validation, cart building and the
//! arithmetic of recording sales, purchases and payments.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Anvil Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      anvil-cli                                  │   │
//! │  │   sell / purchase / pay / report / export / invoice             │   │
//! │  └──────────────┬───────────────────────────────┬──────────────────┘   │
//! │                 │                               │                       │
//! │  ┌──────────────▼──────────────┐  ┌─────────────▼──────────────────┐   │
//! │  │   anvil-db                  │  │   anvil-export                 │   │
//! │  │   SQLite, ledger commits,   │  │   xlsx workbooks, PDF invoice  │   │
//! │  │   reports, live queries     │  │   and report, share payload    │   │
//! │  └──────────────┬──────────────┘  └─────────────┬──────────────────┘   │
//! │                 │                               │                       │
//! │  ┌──────────────▼───────────────────────────────▼──────────────────┐   │
//! │  │               ★ anvil-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   types   money   cart   ledger   validation   dates            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • PURE FUNCTIONS                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Product, Sale, Purchase, StockHistory, ShopInfo...
//! - [`money`] - Integer paise with `₹` formatting
//! - [`cart`] - Sale and purchase carts
//! - [`ledger`] - Settlement, payments, stock arithmetic, drafts
//! - [`validation`] - Input checks
//! - [`dates`] - Report periods and receipt date formats
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use anvil_core::ledger::Settlement;
//! use anvil_core::money::Money;
//! use anvil_core::types::PaymentType;
//!
//! let total = Money::from_rupees(1000);
//! let credit = Settlement::for_sale(total, PaymentType::Credit, Money::from_rupees(400)).unwrap();
//! assert_eq!(credit.pending, Money::from_rupees(600));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod dates;
pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{CartTotals, PurchaseCart, SaleCart};
pub use dates::DateRange;
pub use error::{CoreError, CoreResult, ValidationError};
pub use ledger::{BalancePolicy, CustomerRef, PurchaseDraft, SaleDraft, Settlement};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// The ShopInfo row always has this id.
pub const SHOP_INFO_ID: i64 = 1;

/// Prefix used for sale invoices until the owner changes it.
pub const DEFAULT_INVOICE_PREFIX: &str = "INV";

/// Reorder threshold given to new products.
pub const DEFAULT_LOW_STOCK_ALERT: i64 = 5;

/// Unit given to new products.
pub const DEFAULT_UNIT: &str = "pcs";

/// Categories created with a fresh database.
pub const DEFAULT_CATEGORIES: [&str; 6] = ["Paint", "Plumbing", "Steel", "Iron", "Tools", "Others"];

/// Largest price or payment accepted, in paise (₹100 crore).
///
/// With the line and quantity limits below, totals stay far inside `i64`.
pub const MAX_AMOUNT_PAISE: i64 = 100_000_000_000;

/// Maximum lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on one cart line.
///
/// Hardware sells screws and washers by the thousand, so this is only a
/// guard against a stuck key.
pub const MAX_ITEM_QUANTITY: i64 = 99_999;
