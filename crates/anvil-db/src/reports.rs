//! # Reports and Dashboard
//!
//! Read-only aggregates over the books.
//!
//! ## Reports
//! ```text
//! ┌──────────────────────┬───────────┬──────────────────────────────────────┐
//! │ Report               │ Range     │ Lines / totals                       │
//! ├──────────────────────┼───────────┼──────────────────────────────────────┤
//! │ Sales                │ yes       │ invoice → total;  Σ total, profit    │
//! │ Purchases            │ yes       │ bill → total;     Σ total            │
//! │ Profit               │ yes       │ product → profit; Σ total, profit    │
//! │ Stock                │ no        │ low-stock rows;   inventory value    │
//! │ Supplier Pending     │ no        │ bill → pending;   Σ pending          │
//! │ Customer Pending     │ no        │ invoice → pending; Σ pending         │
//! └──────────────────────┴───────────┴──────────────────────────────────────┘
//! ```
//!
//! ## Profit
//! Profit is `(selling price − the product's *current* purchase price) ×
//! quantity`. Purchase prices are not kept per sale, so a price change
//! re-prices past profit. Lines whose product was deleted are left out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use anvil_core::{DateRange, Money, Product, Purchase, Sale, SHOP_INFO_ID};

use crate::changes::{LiveQuery, Table};
use crate::error::DbResult;
use crate::pool::Database;

/// Tables the dashboard reads from.
pub const DASHBOARD_TABLES: &[Table] = &[
    Table::Products,
    Table::Sales,
    Table::Suppliers,
    Table::Purchases,
];

// =============================================================================
// Types
// =============================================================================

/// Home screen numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub product_count: i64,
    /// Σ sale totals dated in the local calendar day.
    pub today_sales: Money,
    /// Σ supplier.total_due + Σ sale.pending_amount.
    pub total_pending: Money,
    pub low_stock: Vec<Product>,
}

/// The reports screen before a report is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportsOverview {
    pub today_sales: Money,
    pub today_purchases: Money,
    pub low_stock: Vec<Product>,
    pub pending_purchases: Vec<Purchase>,
    pub pending_sales: Vec<Sale>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Sales,
    Purchases,
    Profit,
    Stock,
    SupplierPending,
    CustomerPending,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::Sales,
        ReportKind::Purchases,
        ReportKind::Profit,
        ReportKind::Stock,
        ReportKind::SupplierPending,
        ReportKind::CustomerPending,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Sales => "Sales Report",
            ReportKind::Purchases => "Purchase Report",
            ReportKind::Profit => "Profit Report",
            ReportKind::Stock => "Stock Report",
            ReportKind::SupplierPending => "Supplier Pending Payments",
            ReportKind::CustomerPending => "Customer Pending Payments",
        }
    }

    /// Whether the report covers a date range.
    pub fn is_dated(&self) -> bool {
        matches!(
            self,
            ReportKind::Sales | ReportKind::Purchases | ReportKind::Profit
        )
    }
}

/// One row of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    pub label: String,
    /// Display text ("₹1,200.00", "Stock: 3 (Alert: 5)").
    pub value: String,
    pub date: Option<DateTime<Utc>>,
}

impl ReportLine {
    fn money(label: impl Into<String>, amount: Money, date: Option<DateTime<Utc>>) -> Self {
        ReportLine {
            label: label.into(),
            value: amount.to_string(),
            date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub kind: ReportKind,
    pub title: String,
    pub range: Option<DateRange>,
    pub total_amount: Money,
    pub total_profit: Option<Money>,
    pub lines: Vec<ReportLine>,
}

impl Report {
    /// "dd/mm/yyyy - dd/mm/yyyy", or empty for undated reports.
    pub fn period_label(&self) -> String {
        self.range.map(|r| r.label()).unwrap_or_default()
    }

    /// Key/value pairs for the report footer.
    pub fn totals(&self) -> Vec<(String, String)> {
        let amount_label = match self.kind {
            ReportKind::Stock => "Inventory Value",
            ReportKind::SupplierPending | ReportKind::CustomerPending => "Total Pending",
            _ => "Total Amount",
        };
        let mut totals = vec![(amount_label.to_string(), self.total_amount.to_string())];
        if let Some(profit) = self.total_profit {
            totals.push(("Total Profit".to_string(), profit.to_string()));
        }
        totals
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Dashboard numbers for the local day.
    pub async fn dashboard(&self) -> DbResult<DashboardSummary> {
        let today = DateRange::today();

        let (product_count, today_sales, supplier_due, sales_pending): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM products),
                    (SELECT COALESCE(SUM(total_amount_paise), 0) FROM sales
                        WHERE date >= ?1 AND date < ?2),
                    (SELECT COALESCE(SUM(total_due_paise), 0) FROM suppliers),
                    (SELECT COALESCE(SUM(pending_amount_paise), 0) FROM sales)
                "#,
            )
            .bind(today.start)
            .bind(today.end)
            .fetch_one(&self.pool)
            .await?;

        let low_stock = self.low_stock().await?;

        Ok(DashboardSummary {
            product_count,
            today_sales: Money::from_paise(today_sales),
            total_pending: Money::from_paise(supplier_due + sales_pending),
            low_stock,
        })
    }

    pub async fn overview(&self) -> DbResult<ReportsOverview> {
        let today = DateRange::today();

        let (today_sales, today_purchases): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COALESCE(SUM(total_amount_paise), 0) FROM sales
                    WHERE date >= ?1 AND date < ?2),
                (SELECT COALESCE(SUM(total_amount_paise), 0) FROM purchases
                    WHERE date >= ?1 AND date < ?2)
            "#,
        )
        .bind(today.start)
        .bind(today.end)
        .fetch_one(&self.pool)
        .await?;

        let pending_purchases = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE pending_amount_paise > 0 ORDER BY date, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let pending_sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE pending_amount_paise > 0 ORDER BY date, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ReportsOverview {
            today_sales: Money::from_paise(today_sales),
            today_purchases: Money::from_paise(today_purchases),
            low_stock: self.low_stock().await?,
            pending_purchases,
            pending_sales,
        })
    }

    /// Builds a report. `range` is ignored by undated reports and
    /// defaults to today for dated ones.
    pub async fn generate(&self, kind: ReportKind, range: Option<DateRange>) -> DbResult<Report> {
        let range = range.unwrap_or_else(DateRange::today);
        debug!(?kind, period = %range.label(), "Generating report");

        match kind {
            ReportKind::Sales => self.sales(range).await,
            ReportKind::Purchases => self.purchases(range).await,
            ReportKind::Profit => self.profit(range).await,
            ReportKind::Stock => self.stock().await,
            ReportKind::SupplierPending => self.supplier_pending().await,
            ReportKind::CustomerPending => self.customer_pending().await,
        }
    }

    /// Sales in `range`: one line per invoice, with total and profit.
    pub async fn sales(&self, range: DateRange) -> DbResult<Report> {
        let prefix = self.invoice_prefix().await?;
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE date >= ?1 AND date < ?2 ORDER BY date, id",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        let total: Money = sales.iter().map(Sale::total_amount).sum();
        let lines = sales
            .iter()
            .map(|s| ReportLine::money(s.display_invoice_number(&prefix), s.total_amount(), Some(s.date)))
            .collect();
        let profit = self.profit_total(&range).await?;

        Ok(Report {
            kind: ReportKind::Sales,
            title: ReportKind::Sales.title().to_string(),
            range: Some(range),
            total_amount: total,
            total_profit: Some(profit),
            lines,
        })
    }

    /// Purchases in `range`: one line per supplier bill.
    pub async fn purchases(&self, range: DateRange) -> DbResult<Report> {
        let rows: Vec<(i64, String, DateTime<Utc>, i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT p.id, p.invoice_number, p.date, p.total_amount_paise, s.name
            FROM purchases p
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            WHERE p.date >= ?1 AND p.date < ?2
            ORDER BY p.date, p.id
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        let mut total = Money::zero();
        let lines = rows
            .into_iter()
            .map(|(id, invoice, date, paise, supplier)| {
                let amount = Money::from_paise(paise);
                total += amount;
                ReportLine::money(purchase_label(id, &invoice, supplier.as_deref()), amount, Some(date))
            })
            .collect();

        Ok(Report {
            kind: ReportKind::Purchases,
            title: ReportKind::Purchases.title().to_string(),
            range: Some(range),
            total_amount: total,
            total_profit: None,
            lines,
        })
    }

    /// Profit in `range`, one line per product sold.
    pub async fn profit(&self, range: DateRange) -> DbResult<Report> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT si.product_name,
                   SUM((si.selling_price_paise - p.purchase_price_paise) * si.quantity) AS profit
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE s.date >= ?1 AND s.date < ?2
            GROUP BY si.product_name
            ORDER BY profit DESC, si.product_name
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        let sales_total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_amount_paise), 0) FROM sales WHERE date >= ?1 AND date < ?2",
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;

        let profit: Money = rows.iter().map(|(_, p)| Money::from_paise(*p)).sum();
        let lines = rows
            .into_iter()
            .map(|(name, p)| ReportLine::money(name, Money::from_paise(p), None))
            .collect();

        Ok(Report {
            kind: ReportKind::Profit,
            title: ReportKind::Profit.title().to_string(),
            range: Some(range),
            total_amount: Money::from_paise(sales_total),
            total_profit: Some(profit),
            lines,
        })
    }

    /// Σ (selling − current purchase price) × quantity over sales in `range`.
    pub async fn profit_total(&self, range: &DateRange) -> DbResult<Money> {
        let paise: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM((si.selling_price_paise - p.purchase_price_paise) * si.quantity), 0)
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE s.date >= ?1 AND s.date < ?2
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_paise(paise))
    }

    /// Low-stock products and the value of everything on the shelves.
    pub async fn stock(&self) -> DbResult<Report> {
        let low = self.low_stock().await?;
        let value: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(current_stock * purchase_price_paise), 0) FROM products",
        )
        .fetch_one(&self.pool)
        .await?;

        let lines = low
            .iter()
            .map(|p| ReportLine {
                label: p.name.clone(),
                value: format!("Stock: {} (Alert: {})", p.current_stock, p.low_stock_alert),
                date: None,
            })
            .collect();

        Ok(Report {
            kind: ReportKind::Stock,
            title: ReportKind::Stock.title().to_string(),
            range: None,
            total_amount: Money::from_paise(value),
            total_profit: None,
            lines,
        })
    }

    /// Unpaid supplier bills.
    pub async fn supplier_pending(&self) -> DbResult<Report> {
        let rows: Vec<(i64, String, DateTime<Utc>, i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT p.id, p.invoice_number, p.date, p.pending_amount_paise, s.name
            FROM purchases p
            LEFT JOIN suppliers s ON s.id = p.supplier_id
            WHERE p.pending_amount_paise > 0
            ORDER BY p.date, p.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut total = Money::zero();
        let lines = rows
            .into_iter()
            .map(|(id, invoice, date, paise, supplier)| {
                let amount = Money::from_paise(paise);
                total += amount;
                ReportLine::money(purchase_label(id, &invoice, supplier.as_deref()), amount, Some(date))
            })
            .collect();

        Ok(Report {
            kind: ReportKind::SupplierPending,
            title: ReportKind::SupplierPending.title().to_string(),
            range: None,
            total_amount: total,
            total_profit: None,
            lines,
        })
    }

    /// Credit sales still owed.
    pub async fn customer_pending(&self) -> DbResult<Report> {
        let prefix = self.invoice_prefix().await?;
        let sales = sqlx::query_as::<_, Sale>(
            "SELECT * FROM sales WHERE pending_amount_paise > 0 ORDER BY date, id",
        )
        .fetch_all(&self.pool)
        .await?;

        let total: Money = sales.iter().map(Sale::pending_amount).sum();
        let lines = sales
            .iter()
            .map(|s| {
                let label = format!("{} ({})", s.display_invoice_number(&prefix), s.customer_label());
                ReportLine::money(label, s.pending_amount(), Some(s.date))
            })
            .collect();

        Ok(Report {
            kind: ReportKind::CustomerPending,
            title: ReportKind::CustomerPending.title().to_string(),
            range: None,
            total_amount: total,
            total_profit: None,
            lines,
        })
    }

    async fn low_stock(&self) -> DbResult<Vec<Product>> {
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

    async fn invoice_prefix(&self) -> DbResult<String> {
        let prefix: Option<String> =
            sqlx::query_scalar("SELECT invoice_prefix FROM shop_info WHERE id = ?1")
                .bind(SHOP_INFO_ID)
                .fetch_optional(&self.pool)
                .await?;
        Ok(prefix.unwrap_or_else(|| anvil_core::DEFAULT_INVOICE_PREFIX.to_string()))
    }
}

fn purchase_label(id: i64, invoice: &str, supplier: Option<&str>) -> String {
    let bill = if invoice.trim().is_empty() {
        format!("#{}", id)
    } else {
        invoice.trim().to_string()
    };
    match supplier {
        Some(name) => format!("{} ({})", bill, name),
        None => bill,
    }
}

// =============================================================================
// Live Dashboard
// =============================================================================

impl Database {
    /// The dashboard, kept current as sales, purchases and stock change.
    pub async fn watch_dashboard(&self) -> DbResult<LiveQuery<DashboardSummary>> {
        self.watch(DASHBOARD_TABLES, |db| async move { db.reports().dashboard().await })
            .await
    }
}

/// One-line summary for logs and the CLI footer.
pub fn describe_dashboard(summary: &DashboardSummary) -> String {
    format!(
        "{} products, today's sales {}, pending {}, {} low on stock",
        summary.product_count,
        summary.today_sales,
        summary.total_pending,
        summary.low_stock.len(),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================
