//! # anvil-db: Storage Layer for Anvil
//!
//! SQLite storage for the shop's books, through sqlx. Holds the master
//! data, the ledger that moves stock and money, and the read models the
//! screens are built from.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Anvil Data Flow                                │
//! │                                                                         │
//! │  anvil-cli (sell / purchase / report ...)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     anvil-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐   │   │
//! │  │   │   Database    │    │    Ledger     │    │ Repositories │   │   │
//! │  │   │   (pool.rs)   │◄───│  record_sale  │───►│ product, ... │   │   │
//! │  │   │  SqlitePool   │    │  pay_purchase │    │ reports      │   │   │
//! │  │   │  ChangeFeed   │    │  ...          │    │ search       │   │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘   │   │
//! │  │           │ publish after COMMIT                                │   │
//! │  │           ▼                                                     │   │
//! │  │      LiveQuery<T> (dashboard, low stock, lists)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │   SQLite (WAL)  ~/.local/share/anvil/anvil.db                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool, configuration, repository accessors
//! - [`migrations`] - Embedded schema migrations
//! - [`error`] - Database error types
//! - [`changes`] - Table change feed and live queries
//! - [`ledger`] - Sales, purchases and payments as single transactions
//! - [`repository`] - Per-table reads and master-data edits
//! - [`reports`] - Dashboard and reports
//! - [`search`] - Global search
//!
//! ## Usage
//!
//! ```rust,ignore
//! use anvil_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("anvil.db")).await?;
//!
//! let hits = db.products().search("pipe", 20).await?;
//! let sale = db.ledger().record_sale(&draft).await?;
//! let dashboard = db.reports().dashboard().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod changes;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod reports;
pub mod repository;
pub mod search;

// =============================================================================
// Re-exports
// =============================================================================

pub use changes::{Change, ChangeFeed, LiveQuery, Table};
pub use error::{DbError, DbResult};
pub use ledger::Ledger;
pub use pool::{Database, DbConfig};
pub use reports::{DashboardSummary, Report, ReportKind, ReportLine, ReportRepository, ReportsOverview};
pub use search::{SearchRepository, SearchResults};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::SaleRepository;
pub use repository::shop::ShopRepository;
pub use repository::stock::StockHistoryRepository;
pub use repository::supplier::SupplierRepository;
