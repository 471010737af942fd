//! Supplier bills: recording, listing and paying them.

use chrono::Utc;
use clap::{Args, Subcommand};
use tracing::info;

use anvil_core::dates::format_date;
use anvil_core::{Money, PurchaseCart, PurchaseWithItems};

use super::party::purchase_table;
use super::{parse_money, table, ItemArg, Period, RangeArgs};
use crate::error::AppResult;
use crate::App;

#[derive(Debug, Args)]
pub struct PurchaseArgs {
    /// A line as PRODUCT_ID:QTY or PRODUCT_ID:QTY@RATE. Without a rate the
    /// product's purchase price is used.
    #[arg(long = "item", required = true)]
    pub items: Vec<ItemArg>,

    /// Supplier id. Leave out for a cash purchase from nobody in particular.
    #[arg(long)]
    pub supplier: Option<i64>,

    /// The supplier's bill number.
    #[arg(long, default_value = "")]
    pub bill: String,

    /// Amount paid now. Defaults to nothing.
    #[arg(long, value_parser = parse_money)]
    pub paid: Option<Money>,

    #[arg(long, default_value = "")]
    pub notes: String,
}

#[derive(Debug, Subcommand)]
pub enum PurchasesCommand {
    /// Purchases in a period (default this month), newest first.
    List {
        #[command(flatten)]
        range: RangeArgs,
        /// Only bills with money still owed.
        #[arg(long)]
        pending: bool,
    },
    Show {
        id: i64,
    },
    /// Pay a supplier against a bill.
    Pay {
        id: i64,
        #[arg(value_parser = parse_money)]
        amount: Money,
    },
}

pub async fn purchase(app: &App, args: PurchaseArgs) -> AppResult<()> {
    if let Some(id) = args.supplier {
        app.db.suppliers().get(id).await?;
    }

    let products = app.db.products();
    let mut cart = PurchaseCart::new();
    for item in &args.items {
        let product = products.get(item.product_id).await?;
        cart.add_product(&product, item.quantity, item.rate)?;
    }
    cart.set_supplier(args.supplier);
    cart.set_invoice_number(args.bill.trim());
    cart.notes = args.notes;
    if let Some(paid) = args.paid {
        cart.set_paid(paid)?;
    }

    let recorded = app
        .db
        .ledger()
        .commit_purchase_cart(&mut cart, Utc::now())
        .await?;
    info!(
        purchase_id = recorded.purchase.id,
        total = %recorded.purchase.total_amount(),
        pending = %recorded.purchase.pending_amount(),
        "Purchase complete"
    );

    let names = product_names(app, &recorded).await?;
    app.out.emit(&recorded, || describe_purchase(&recorded, &names))
}

pub async fn purchases(app: &App, cmd: PurchasesCommand) -> AppResult<()> {
    let purchases = app.db.purchases();
    match cmd {
        PurchasesCommand::List { range, pending } => {
            let list = if pending {
                purchases.pending().await?
            } else {
                purchases.in_range(&range.resolve(Period::Month)?).await?
            };
            app.out.emit(&list, || purchase_table(&list))
        }
        PurchasesCommand::Show { id } => {
            let purchase = purchases.with_items(id).await?;
            let names = product_names(app, &purchase).await?;
            app.out.emit(&purchase, || describe_purchase(&purchase, &names))
        }
        PurchasesCommand::Pay { id, amount } => {
            let purchase = app.db.ledger().pay_purchase(id, amount).await?;
            app.out.emit(&purchase, || {
                format!(
                    "Paid {} on purchase #{}. Still pending: {}",
                    amount,
                    purchase.id,
                    purchase.pending_amount()
                )
            })
        }
    }
}

/// Names for each line; deleted products show as "(deleted)".
async fn product_names(app: &App, purchase: &PurchaseWithItems) -> AppResult<Vec<String>> {
    let products = app.db.products();
    let mut names = Vec::with_capacity(purchase.items.len());
    for item in &purchase.items {
        let name = match item.product_id {
            Some(id) => products.find(id).await?.map(|p| p.name),
            None => None,
        };
        names.push(name.unwrap_or_else(|| "(deleted)".to_string()));
    }
    Ok(names)
}

fn describe_purchase(purchase: &PurchaseWithItems, names: &[String]) -> String {
    let p = &purchase.purchase;
    let mut out = vec![format!(
        "Purchase #{}  {}{}",
        p.id,
        format_date(p.date),
        if p.invoice_number.is_empty() {
            String::new()
        } else {
            format!("  bill {}", p.invoice_number)
        }
    )];
    if !p.notes.is_empty() {
        out.push(p.notes.clone());
    }
    out.push(String::new());

    let rows = purchase
        .items
        .iter()
        .zip(names)
        .map(|(i, name)| {
            vec![
                name.clone(),
                i.quantity.to_string(),
                i.purchase_price().to_string(),
                i.total_amount().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    out.push(table(&["Item", "Qty", "Rate", "Amount"], &rows));
    out.push(String::new());
    out.push(format!("Total:   {}", p.total_amount()));
    out.push(format!("Paid:    {}", p.paid_amount()));
    out.push(format!("Pending: {}", p.pending_amount()));
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_parse_purchase_with_rates() {
        let cli = Cli::try_parse_from([
            "anvil", "purchase", "--supplier", "2", "--bill", "AST-2041", "--item", "1:10@182.50",
            "--item", "4:3", "--paid", "1000",
        ])
        .unwrap();
        match cli.command {
            Command::Purchase(args) => {
                assert_eq!(args.supplier, Some(2));
                assert_eq!(args.items[0].rate, Some(Money::from_rupees_paise(182, 50)));
                assert_eq!(args.items[1].rate, None);
                assert_eq!(args.paid, Some(Money::from_rupees(1000)));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_pay_purchase() {
        let cli = Cli::try_parse_from(["anvil", "purchases", "pay", "3", "500"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Purchases(PurchasesCommand::Pay { id: 3, .. })
        ));
    }
}
