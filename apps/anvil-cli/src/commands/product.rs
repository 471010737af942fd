//! Products, categories and stock counts.

use std::collections::HashMap;

use clap::{Args, Subcommand};
use tracing::info;

use anvil_core::dates::format_date_time;
use anvil_core::{Money, NewProduct, Product, StockHistory, DEFAULT_LOW_STOCK_ALERT, DEFAULT_UNIT};
use anvil_db::search::DEFAULT_PRODUCT_LIMIT;

use super::{parse_money, table};
use crate::error::{AppError, AppResult};
use crate::App;

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    /// All products, by name.
    List {
        /// Only this category (name).
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        brand: Option<String>,
    },
    /// Name, brand, size, color or barcode.
    Search {
        query: String,
        #[arg(long, default_value_t = DEFAULT_PRODUCT_LIMIT)]
        limit: u32,
    },
    /// Products at or under their alert level.
    LowStock,
    Show {
        id: i64,
    },
    Add(ProductFields),
    /// Replaces every field of a product. Stock is not touched.
    Update {
        id: i64,
        #[command(flatten)]
        fields: ProductFields,
    },
    Delete {
        id: i64,
    },
    /// Sets stock to a counted quantity.
    Adjust {
        id: i64,
        counted: i64,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Stock movements for a product, newest first.
    History {
        id: i64,
    },
}

#[derive(Debug, Args)]
pub struct ProductFields {
    #[arg(long)]
    pub name: String,
    /// Purchase price in rupees.
    #[arg(long, value_parser = parse_money)]
    pub buy: Money,
    /// Selling price in rupees.
    #[arg(long, value_parser = parse_money)]
    pub sell: Money,
    /// Category name. Created if it does not exist.
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long, default_value = "")]
    pub brand: String,
    #[arg(long, default_value = "")]
    pub size: String,
    #[arg(long, default_value = "")]
    pub color: String,
    #[arg(long, default_value = DEFAULT_UNIT)]
    pub unit: String,
    /// Opening stock (only used when adding).
    #[arg(long, default_value_t = 0)]
    pub stock: i64,
    #[arg(long, default_value_t = DEFAULT_LOW_STOCK_ALERT)]
    pub alert: i64,
    #[arg(long, default_value = "")]
    pub barcode: String,
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    List,
    Add { name: String },
    Rename { id: i64, name: String },
    /// Products in the category are kept, without a category.
    Delete { id: i64 },
}

pub async fn product(app: &App, cmd: ProductCommand) -> AppResult<()> {
    let products = app.db.products();
    match cmd {
        ProductCommand::List { category, brand } => {
            let list = match (category, brand) {
                (Some(name), _) => {
                    let category = app
                        .db
                        .categories()
                        .by_name(&name)
                        .await?
                        .ok_or_else(|| AppError::not_found("Category", &name))?;
                    products.by_category(category.id).await?
                }
                (None, Some(brand)) => products.by_brand(&brand).await?,
                (None, None) => products.list().await?,
            };
            print_products(app, &list).await
        }
        ProductCommand::Search { query, limit } => {
            let list = products.search(&query, limit).await?;
            print_products(app, &list).await
        }
        ProductCommand::LowStock => {
            let list = products.low_stock().await?;
            print_products(app, &list).await
        }
        ProductCommand::Show { id } => {
            let product = products.get(id).await?;
            let categories = category_names(app).await?;
            app.out.emit(&product, || describe_product(&product, &categories))
        }
        ProductCommand::Add(fields) => {
            let new = fields.into_new_product(app).await?;
            let product = products.create(&new).await?;
            info!(id = product.id, name = %product.name, "Product added");
            app.out
                .emit(&product, || format!("Added product #{} {}", product.id, product.name))
        }
        ProductCommand::Update { id, fields } => {
            let new = fields.into_new_product(app).await?;
            let product = products.update(id, &new).await?;
            app.out
                .emit(&product, || format!("Updated product #{} {}", product.id, product.name))
        }
        ProductCommand::Delete { id } => {
            products.delete(id).await?;
            app.out.emit(&id, || format!("Deleted product #{}", id))
        }
        ProductCommand::Adjust { id, counted, notes } => {
            let entry = products.adjust_stock(id, counted, &notes).await?;
            app.out.emit(&entry, || {
                format!(
                    "Stock for #{} set to {} (was {})",
                    id, entry.new_stock, entry.previous_stock
                )
            })
        }
        ProductCommand::History { id } => {
            // Fails early on an unknown id instead of printing an empty list
            products.get(id).await?;
            let entries = app.db.stock_history().by_product(id).await?;
            app.out.emit(&entries, || history_table(&entries))
        }
    }
}

pub async fn category(app: &App, cmd: CategoryCommand) -> AppResult<()> {
    let categories = app.db.categories();
    match cmd {
        CategoryCommand::List => {
            let list = categories.list().await?;
            app.out.emit(&list, || {
                let rows = list
                    .iter()
                    .map(|c| vec![c.id.to_string(), c.name.clone()])
                    .collect::<Vec<_>>();
                table(&["ID", "Name"], &rows)
            })
        }
        CategoryCommand::Add { name } => {
            let category = categories.create(&name).await?;
            app.out
                .emit(&category, || format!("Added category #{} {}", category.id, category.name))
        }
        CategoryCommand::Rename { id, name } => {
            let category = categories.rename(id, &name).await?;
            app.out.emit(&category, || format!("Category #{} is now {}", id, category.name))
        }
        CategoryCommand::Delete { id } => {
            categories.delete(id).await?;
            app.out.emit(&id, || format!("Deleted category #{}", id))
        }
    }
}

impl ProductFields {
    async fn into_new_product(self, app: &App) -> AppResult<NewProduct> {
        let mut new = NewProduct::new(self.name, self.buy, self.sell)
            .with_brand(self.brand)
            .with_size(self.size)
            .with_color(self.color)
            .with_unit(self.unit)
            .with_opening_stock(self.stock)
            .with_low_stock_alert(self.alert)
            .with_barcode(self.barcode);

        if let Some(name) = self.category {
            let categories = app.db.categories();
            let category = match categories.by_name(&name).await? {
                Some(category) => category,
                None => categories.create(&name).await?,
            };
            new = new.with_category(category.id);
        }
        Ok(new)
    }
}

pub(crate) async fn category_names(app: &App) -> AppResult<HashMap<i64, String>> {
    Ok(app
        .db
        .categories()
        .list()
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

async fn print_products(app: &App, products: &[Product]) -> AppResult<()> {
    let categories = category_names(app).await?;
    app.out.emit(&products, || product_table(products, &categories))
}

fn product_table(products: &[Product], categories: &HashMap<i64, String>) -> String {
    let rows = products
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.display_name(),
                category_of(categories, p.category_id).to_string(),
                p.selling_price().to_string(),
                format!("{} {}", p.current_stock, p.unit),
                if p.is_low_stock() { "LOW".to_string() } else { String::new() },
            ]
        })
        .collect::<Vec<_>>();
    table(&["ID", "Product", "Category", "Price", "Stock", ""], &rows)
}

fn describe_product(p: &Product, categories: &HashMap<i64, String>) -> String {
    let mut lines = vec![
        format!("#{} {}", p.id, p.name),
        format!("Category:       {}", category_of(categories, p.category_id)),
    ];
    for (label, value) in [("Brand", &p.brand), ("Size", &p.size), ("Color", &p.color), ("Barcode", &p.barcode)] {
        if !value.is_empty() {
            lines.push(format!("{:<16}{}", format!("{}:", label), value));
        }
    }
    lines.push(format!("Purchase price: {}", p.purchase_price()));
    lines.push(format!(
        "Selling price:  {} ({:.1}% margin)",
        p.selling_price(),
        p.profit_margin_percent()
    ));
    lines.push(format!(
        "Stock:          {} {} (alert at {})",
        p.current_stock, p.unit, p.low_stock_alert
    ));
    lines.push(format!("Stock value:    {}", p.stock_value()));
    lines.join("\n")
}

fn category_of(categories: &HashMap<i64, String>, id: Option<i64>) -> &str {
    id.and_then(|id| categories.get(&id))
        .map(String::as_str)
        .unwrap_or("-")
}

fn history_table(entries: &[StockHistory]) -> String {
    let rows = entries
        .iter()
        .map(|h| {
            vec![
                format_date_time(h.date),
                format!("{:?}", h.movement).to_uppercase(),
                h.quantity.to_string(),
                format!("{} -> {}", h.previous_stock, h.new_stock),
                h.notes.clone(),
            ]
        })
        .collect::<Vec<_>>();
    table(&["Date", "Type", "Qty", "Stock", "Notes"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Command};
    use clap::Parser;

    #[test]
    fn test_parse_add_product() {
        let cli = Cli::try_parse_from([
            "anvil", "product", "add", "--name", "Claw Hammer", "--buy", "180", "--sell", "250.50",
            "--category", "Tools", "--stock", "12",
        ])
        .unwrap();
        match cli.command {
            Command::Product(ProductCommand::Add(fields)) => {
                assert_eq!(fields.buy, Money::from_rupees(180));
                assert_eq!(fields.sell, Money::from_rupees_paise(250, 50));
                assert_eq!(fields.unit, DEFAULT_UNIT);
                assert_eq!(fields.alert, DEFAULT_LOW_STOCK_ALERT);
                assert_eq!(fields.category.as_deref(), Some("Tools"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_price() {
        assert!(Cli::try_parse_from([
            "anvil", "product", "add", "--name", "Hammer", "--buy", "abc", "--sell", "1",
        ])
        .is_err());
    }

    #[test]
    fn test_category_fallback() {
        let categories = HashMap::from([(1, "Tools".to_string())]);
        assert_eq!(category_of(&categories, Some(1)), "Tools");
        assert_eq!(category_of(&categories, Some(9)), "-");
        assert_eq!(category_of(&categories, None), "-");
    }
}
