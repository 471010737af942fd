//! # anvil-cli: The Shop From a Terminal
//!
//! Counter sales, supplier bills, payments, reports and exports over the
//! shop database.
//!
//! ## Application Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            anvil (binary)                               │
//! │                                                                         │
//! │  main.rs ─────► parse args, print errors, exit status                   │
//! │                                                                         │
//! │  lib.rs ──────► tracing, AppConfig, Database, app-open lock             │
//! │                                                                         │
//! │  commands/ ───► product, party, sale, purchase, report, export, shop    │
//! │                                                                         │
//! │                                 │                                       │
//! │                                 ▼                                       │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  SQLite  (AppConfig.database_path, WAL)                          │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod gate;

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use anvil_db::{Database, DbConfig};

use crate::commands::Output;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::gate::{ConsoleAuthenticator, GateDecision};

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "anvil", version, about = "Hardware shop inventory, purchasing and billing")]
pub struct Cli {
    /// Database file (overrides the config file).
    #[arg(long, global = true, env = "ANVIL_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Config file (default: platform config dir / anvil.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Today's sales, money owed and low stock.
    Dashboard,

    /// Search products, customers, suppliers and sales at once.
    Search { query: String },

    #[command(subcommand)]
    Product(commands::product::ProductCommand),

    #[command(subcommand)]
    Category(commands::product::CategoryCommand),

    #[command(subcommand)]
    Supplier(commands::party::SupplierCommand),

    #[command(subcommand)]
    Customer(commands::party::CustomerCommand),

    /// Ring up a sale.
    Sell(commands::sale::SellArgs),

    #[command(subcommand)]
    Sale(commands::sale::SaleCommand),

    /// Record a supplier bill.
    Purchase(commands::purchase::PurchaseArgs),

    #[command(subcommand)]
    Purchases(commands::purchase::PurchasesCommand),

    /// Build a report, optionally as a PDF.
    Report(commands::report::ReportArgs),

    /// Write an .xlsx export.
    Export(commands::export::ExportArgs),

    #[command(subcommand)]
    Shop(commands::shop::ShopCommand),

    #[command(subcommand)]
    Config(commands::shop::ConfigCommand),
}

// =============================================================================
// Application Context
// =============================================================================

/// What every command gets: the database, the settings and the printer.
pub struct App {
    pub db: Database,
    pub config: AppConfig,
    pub out: Output,
    pub config_path: Option<PathBuf>,
}

/// Runs one command to completion.
pub async fn run(cli: Cli) -> AppResult<()> {
    init_tracing();

    let mut config = AppConfig::load(cli.config.clone())?;
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    let out = Output::new(cli.json);

    // Config commands work without a database
    if let Command::Config(cmd) = &cli.command {
        return commands::shop::config(cmd, &config, cli.config.clone(), &out);
    }

    let db = open_database(&config).await?;

    let shop = db.shop().get().await?;
    let decision = {
        let auth = ConsoleAuthenticator::new(io::stdin().lock(), io::stderr());
        gate::check(shop.biometric_enabled, &auth, config.biometric_fail_open)
    };
    if decision == GateDecision::Terminate {
        db.close().await;
        return Err(AppError::locked());
    }

    let app = App {
        db,
        config,
        out,
        config_path: cli.config,
    };
    let result = commands::dispatch(&app, cli.command).await;
    app.db.close().await;
    result
}

async fn open_database(config: &AppConfig) -> AppResult<Database> {
    if let Some(parent) = config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::new(
                    error::ErrorCode::ConfigError,
                    format!("Cannot create {}: {}", parent.display(), e),
                )
            })?;
        }
    }

    debug!(path = %config.database_path.display(), "Opening database");
    let db_config = DbConfig::new(&config.database_path).balance_policy(config.balance_policy);
    let db = Database::new(db_config).await?;
    info!(path = %config.database_path.display(), "Database ready");
    Ok(db)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,anvil=debug,sqlx=warn"));

    // Logs go to stderr so `--json` output stays clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}
