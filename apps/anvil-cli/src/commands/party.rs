//! Suppliers and customers.

use clap::Subcommand;
use serde::Serialize;

use anvil_core::dates::format_date;
use anvil_core::{Customer, Money, NewCustomer, NewSupplier, Purchase, Supplier};

use super::table;
use crate::error::AppResult;
use crate::App;

#[derive(Debug, Subcommand)]
pub enum SupplierCommand {
    List {
        /// Name or phone.
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
    },
    /// Their purchases stay on record without a supplier.
    Delete { id: i64 },
    /// Suppliers we still owe, largest first.
    Dues,
    /// Purchases from one supplier.
    History { id: i64 },
}

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    List {
        /// Name or phone.
        #[arg(long)]
        search: Option<String>,
    },
    Add {
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
    },
    Delete { id: i64 },
    /// Customers who owe us, largest first.
    Dues,
    /// Sales to one customer.
    History { id: i64 },
}

#[derive(Debug, Serialize)]
struct Dues<T> {
    total: Money,
    parties: Vec<T>,
}

pub async fn supplier(app: &App, cmd: SupplierCommand) -> AppResult<()> {
    let suppliers = app.db.suppliers();
    match cmd {
        SupplierCommand::List { search } => {
            let list = match search {
                Some(q) => suppliers.search(&q).await?,
                None => suppliers.list().await?,
            };
            app.out.emit(&list, || supplier_table(&list))
        }
        SupplierCommand::Add { name, phone, address } => {
            let supplier = suppliers.create(&NewSupplier { name, phone, address }).await?;
            app.out
                .emit(&supplier, || format!("Added supplier #{} {}", supplier.id, supplier.name))
        }
        SupplierCommand::Update { id, name, phone, address } => {
            let supplier = suppliers
                .update(id, &NewSupplier { name, phone, address })
                .await?;
            app.out.emit(&supplier, || format!("Updated supplier #{}", supplier.id))
        }
        SupplierCommand::Delete { id } => {
            suppliers.delete(id).await?;
            app.out.emit(&id, || format!("Deleted supplier #{}", id))
        }
        SupplierCommand::Dues => {
            let dues = Dues {
                total: suppliers.total_due().await?,
                parties: suppliers.with_dues().await?,
            };
            app.out.emit(&dues, || {
                format!("{}\n\nTotal owed: {}", supplier_table(&dues.parties), dues.total)
            })
        }
        SupplierCommand::History { id } => {
            let supplier = suppliers.get(id).await?;
            let purchases = app.db.purchases().by_supplier(id).await?;
            app.out.emit(&purchases, || {
                format!(
                    "{} (due {})\n\n{}",
                    supplier.name,
                    supplier.total_due(),
                    purchase_table(&purchases)
                )
            })
        }
    }
}

pub async fn customer(app: &App, cmd: CustomerCommand) -> AppResult<()> {
    let customers = app.db.customers();
    match cmd {
        CustomerCommand::List { search } => {
            let list = match search {
                Some(q) => customers.search(&q).await?,
                None => customers.list().await?,
            };
            app.out.emit(&list, || customer_table(&list))
        }
        CustomerCommand::Add { name, phone } => {
            let customer = customers.create(&NewCustomer { name, phone }).await?;
            app.out
                .emit(&customer, || format!("Added customer #{} {}", customer.id, customer.name))
        }
        CustomerCommand::Update { id, name, phone } => {
            let customer = customers.update(id, &NewCustomer { name, phone }).await?;
            app.out.emit(&customer, || format!("Updated customer #{}", customer.id))
        }
        CustomerCommand::Delete { id } => {
            customers.delete(id).await?;
            app.out.emit(&id, || format!("Deleted customer #{}", id))
        }
        CustomerCommand::Dues => {
            let dues = Dues {
                total: customers.total_due().await?,
                parties: customers.with_dues().await?,
            };
            app.out.emit(&dues, || {
                format!("{}\n\nTotal receivable: {}", customer_table(&dues.parties), dues.total)
            })
        }
        CustomerCommand::History { id } => {
            let customer = customers.get(id).await?;
            let sales = app.db.sales().by_customer(id).await?;
            let prefix = app.db.shop().get().await?.invoice_prefix;
            app.out.emit(&sales, || {
                format!(
                    "{} (due {})\n\n{}",
                    customer.name,
                    customer.total_due(),
                    super::sale::sale_table(&sales, &prefix)
                )
            })
        }
    }
}

fn supplier_table(suppliers: &[Supplier]) -> String {
    let rows = suppliers
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                s.name.clone(),
                s.phone.clone(),
                s.address.clone(),
                s.total_due().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table(&["ID", "Name", "Phone", "Address", "Due"], &rows)
}

fn customer_table(customers: &[Customer]) -> String {
    let rows = customers
        .iter()
        .map(|c| {
            vec![
                c.id.to_string(),
                c.name.clone(),
                c.phone.clone(),
                c.total_due().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table(&["ID", "Name", "Phone", "Due"], &rows)
}

pub(crate) fn purchase_table(purchases: &[Purchase]) -> String {
    let rows = purchases
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                format_date(p.date),
                p.invoice_number.clone(),
                p.total_amount().to_string(),
                p.paid_amount().to_string(),
                p.pending_amount().to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table(&["ID", "Date", "Bill", "Total", "Paid", "Pending"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_parse_add_supplier() {
        let cli = Cli::try_parse_from([
            "anvil", "supplier", "add", "Asian Traders", "--phone", "9800011122",
        ])
        .unwrap();
        match cli.command {
            Command::Supplier(SupplierCommand::Add { name, phone, address }) => {
                assert_eq!(name, "Asian Traders");
                assert_eq!(phone, "9800011122");
                assert!(address.is_empty());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_customer_update_needs_name() {
        assert!(Cli::try_parse_from(["anvil", "customer", "update", "4", "--phone", "1"]).is_err());
    }

    #[test]
    fn test_purchase_table_columns() {
        let text = purchase_table(&[]);
        assert!(text.starts_with("ID  Date  Bill  Total  Paid  Pending"));
    }
}
