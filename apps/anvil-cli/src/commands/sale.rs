//! # Sales
//!
//! ```text
//! anvil sell --item 3:2 --item 5:1 [--credit --paid 500] [--invoice]
//!      │
//!      ▼
//!   SaleCart ──► Ledger::commit_sale_cart ──► invoice PDF ──► share
//! ```
//!
//! Lines are checked against stock as they are added, and again inside
//! the transaction that records the sale.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Args, Subcommand};
use tracing::{debug, info};

use anvil_core::dates::format_date_time;
use anvil_core::{Money, PaymentType, Sale, SaleCart, SaleWithItems};
use anvil_export::share::LogShareTarget;
use anvil_export::{write_invoice, SharePayload, ShareTarget};

use super::{parse_money, table, ItemArg, Period, RangeArgs};
use crate::error::{AppError, AppResult};
use crate::App;

#[derive(Debug, Args)]
pub struct SellArgs {
    /// A line as PRODUCT_ID:QTY. Repeat for more lines.
    #[arg(long = "item", required = true)]
    pub items: Vec<ItemArg>,

    #[arg(long, default_value = "")]
    pub customer: String,

    /// Links the sale to the customer with this phone (created if new).
    #[arg(long, default_value = "")]
    pub phone: String,

    /// Let the customer pay part now and owe the rest.
    #[arg(long)]
    pub credit: bool,

    /// Amount received now (credit sales only).
    #[arg(long, value_parser = parse_money, requires = "credit")]
    pub paid: Option<Money>,

    /// Write the invoice PDF after recording.
    #[arg(long)]
    pub invoice: bool,

    /// Hand the invoice to the share target (implies --invoice).
    #[arg(long)]
    pub share: bool,
}

#[derive(Debug, Subcommand)]
pub enum SaleCommand {
    /// Sales in a period (default today), newest first.
    List {
        #[command(flatten)]
        range: RangeArgs,
        /// Only sales with money still owed.
        #[arg(long)]
        pending: bool,
    },
    /// Invoice number, customer name or phone.
    Search { query: String },
    /// One sale with its lines.
    Show { id: i64 },
    /// Take a later payment against a sale.
    Pay {
        id: i64,
        #[arg(value_parser = parse_money)]
        amount: Money,
    },
    /// Write the invoice PDF for a sale.
    Invoice {
        id: i64,
        #[arg(long)]
        share: bool,
    },
}

pub async fn sell(app: &App, args: SellArgs) -> AppResult<()> {
    let products = app.db.products();
    let mut cart = SaleCart::new();

    for item in &args.items {
        if item.rate.is_some() {
            return Err(AppError::validation(
                "Sales use the product's selling price; drop the @RATE",
            ));
        }
        let product = products.get(item.product_id).await?;
        cart.add_product(&product, item.quantity)?;
    }

    cart.set_customer(args.customer.trim(), args.phone.trim());
    if args.credit {
        cart.set_payment_type(PaymentType::Credit);
        cart.set_paid(args.paid.unwrap_or_else(Money::zero))?;
    }

    let totals = cart.totals();
    debug!(
        lines = totals.line_count,
        total = %totals.total,
        paid = %totals.paid,
        "Committing sale"
    );

    let recorded = app.db.ledger().commit_sale_cart(&mut cart, Utc::now()).await?;
    let shop = app.db.shop().get().await?;
    let invoice = recorded.sale.display_invoice_number(&shop.invoice_prefix);
    info!(sale_id = recorded.sale.id, invoice = %invoice, total = %recorded.sale.total_amount(), "Sale complete");

    let pdf = if args.invoice || args.share {
        Some(invoice_file(app, &recorded, args.share).await?)
    } else {
        None
    };

    app.out.emit(&recorded, || {
        let mut text = describe_sale(&recorded, &shop.invoice_prefix);
        if let Some(path) = &pdf {
            text.push_str(&format!("\n\nInvoice: {}", path.display()));
        }
        text
    })
}

pub async fn sale(app: &App, cmd: SaleCommand) -> AppResult<()> {
    let sales = app.db.sales();
    let prefix = app.db.shop().get().await?.invoice_prefix;
    match cmd {
        SaleCommand::List { range, pending } => {
            let list = if pending {
                sales.pending().await?
            } else {
                sales.in_range(&range.resolve(Period::Today)?).await?
            };
            app.out.emit(&list, || sale_table(&list, &prefix))
        }
        SaleCommand::Search { query } => {
            let list = sales.search(&query).await?;
            app.out.emit(&list, || sale_table(&list, &prefix))
        }
        SaleCommand::Show { id } => {
            let sale = sales.with_items(id).await?;
            app.out.emit(&sale, || describe_sale(&sale, &prefix))
        }
        SaleCommand::Pay { id, amount } => {
            let sale = app.db.ledger().pay_sale(id, amount).await?;
            app.out.emit(&sale, || {
                format!(
                    "Received {} on {}. Still pending: {}",
                    amount,
                    sale.display_invoice_number(&prefix),
                    sale.pending_amount()
                )
            })
        }
        SaleCommand::Invoice { id, share } => {
            let sale = sales.with_items(id).await?;
            let path = invoice_file(app, &sale, share).await?;
            app.out.emit(&path, || format!("Invoice written to {}", path.display()))
        }
    }
}

/// Writes the invoice PDF into the export folder and optionally shares it.
async fn invoice_file(app: &App, sale: &SaleWithItems, share: bool) -> AppResult<PathBuf> {
    let shop = app.db.shop().get().await?;
    let path = write_invoice(&app.config.export_dir, &shop, sale)?;
    if share {
        let subject = format!("Invoice {}", sale.sale.display_invoice_number(&shop.invoice_prefix));
        LogShareTarget.share(&SharePayload::pdf(&path, subject))?;
    }
    Ok(path)
}

pub(crate) fn sale_table(sales: &[Sale], prefix: &str) -> String {
    let rows = sales
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.display_invoice_number(prefix),
                format_date_time(s.date),
                s.customer_label().to_string(),
                s.payment_type.to_string(),
                s.total_amount().to_string(),
                s.pending_amount().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table(
        &["ID", "Invoice", "Date", "Customer", "Type", "Total", "Pending"],
        &rows,
    )
}

fn describe_sale(sale: &SaleWithItems, prefix: &str) -> String {
    let s = &sale.sale;
    let mut out = vec![
        format!(
            "{}  {}  {}",
            s.display_invoice_number(prefix),
            format_date_time(s.date),
            s.payment_type
        ),
        format!(
            "Customer: {}{}",
            s.customer_label(),
            if s.customer_phone.is_empty() {
                String::new()
            } else {
                format!(" ({})", s.customer_phone)
            }
        ),
        String::new(),
    ];

    let rows = sale
        .items
        .iter()
        .map(|i| {
            vec![
                i.product_name.clone(),
                i.quantity.to_string(),
                i.selling_price().to_string(),
                i.total_amount().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    out.push(table(&["Item", "Qty", "Rate", "Amount"], &rows));
    out.push(String::new());
    out.push(format!("Total:   {}", s.total_amount()));
    out.push(format!("Paid:    {}", s.paid_amount()));
    if s.pending_amount().is_positive() {
        out.push(format!("Pending: {}", s.pending_amount()));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_paid_requires_credit() {
        assert!(Cli::try_parse_from(["anvil", "sell", "--item", "1:1", "--paid", "50"]).is_err());
    }

    #[test]
    fn test_sell_needs_items() {
        assert!(Cli::try_parse_from(["anvil", "sell", "--customer", "Ravi"]).is_err());
    }

    #[test]
    fn test_parse_pay() {
        let cli = Cli::try_parse_from(["anvil", "sale", "pay", "7", "250.75"]).unwrap();
        match cli.command {
            Command::Sale(SaleCommand::Pay { id, amount }) => {
                assert_eq!(id, 7);
                assert_eq!(amount, Money::from_rupees_paise(250, 75));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_range() {
        let cli = Cli::try_parse_from([
            "anvil", "sale", "list", "--from", "01/03/2024", "--to", "31/03/2024",
        ])
        .unwrap();
        match cli.command {
            Command::Sale(SaleCommand::List { range, pending }) => {
                assert!(!pending);
                assert!(range.resolve(Period::Today).is_ok());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
