//! # Workbook Exports
//!
//! One `.xlsx` file per export, written into the export directory.
//!
//! ```text
//! ┌───────────────────┬─────────────────────────────┬──────────────────────┐
//! │ Export            │ Sheets                      │ File name            │
//! ├───────────────────┼─────────────────────────────┼──────────────────────┤
//! │ export_products   │ Products                    │ Products_Export_*    │
//! │ export_sales      │ Sales, Sale Items           │ Sales_Export_*       │
//! │ export_purchases  │ Purchases                   │ Purchases_Export_*   │
//! │ export_stock_...  │ Stock Report                │ Stock_Report_*       │
//! └───────────────────┴─────────────────────────────┴──────────────────────┘
//! ```
//!
//! Amounts are numeric cells in rupees so the sheet can sum them; dates are
//! `dd/mm/yyyy` text.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use tracing::info;

use anvil_core::dates::format_date;
use anvil_core::{Money, Product, Purchase, SaleWithItems};

use crate::error::ExportResult;
use crate::{timestamped_name, write_atomically};

pub const PRODUCT_HEADERS: [&str; 12] = [
    "ID",
    "Name",
    "Category",
    "Brand",
    "Size",
    "Color",
    "Unit",
    "Purchase Price",
    "Selling Price",
    "Opening Stock",
    "Current Stock",
    "Low Stock Alert",
];

pub const SALE_HEADERS: [&str; 8] = [
    "Invoice No",
    "Date",
    "Customer",
    "Phone",
    "Total Amount",
    "Paid Amount",
    "Pending Amount",
    "Payment Type",
];

pub const SALE_ITEM_HEADERS: [&str; 5] = ["Invoice No", "Product", "Quantity", "Rate", "Amount"];

pub const PURCHASE_HEADERS: [&str; 7] = [
    "ID",
    "Date",
    "Invoice No",
    "Supplier",
    "Total Amount",
    "Paid Amount",
    "Pending Amount",
];

pub const STOCK_HEADERS: [&str; 5] = [
    "Product",
    "Category",
    "Current Stock",
    "Low Stock Alert",
    "Status",
];

// =============================================================================
// Exports
// =============================================================================

/// Every product with its category name.
///
/// ## Example
/// ```rust,ignore
/// let categories = db.categories().list().await?
///     .into_iter().map(|c| (c.id, c.name)).collect();
/// let path = export_products(&dir, &db.products().list().await?, &categories)?;
/// ```
pub fn export_products(
    dir: &Path,
    products: &[Product],
    categories: &HashMap<i64, String>,
) -> ExportResult<PathBuf> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Products")?;
    write_header(sheet, &PRODUCT_HEADERS, &bold)?;

    for (i, p) in products.iter().enumerate() {
        write_row(
            sheet,
            row_index(i),
            &[
                Cell::Int(p.id),
                Cell::Text(&p.name),
                Cell::Text(name_of(categories, p.category_id)),
                Cell::Text(&p.brand),
                Cell::Text(&p.size),
                Cell::Text(&p.color),
                Cell::Text(&p.unit),
                Cell::Money(p.purchase_price()),
                Cell::Money(p.selling_price()),
                Cell::Int(p.opening_stock),
                Cell::Int(p.current_stock),
                Cell::Int(p.low_stock_alert),
            ],
        )?;
    }
    sheet.autofit();

    save(&mut workbook, dir, "Products_Export", products.len())
}

/// Sales on one sheet and their lines on "Sale Items".
///
/// `invoice_prefix` numbers older sales that were stored without an
/// invoice number.
pub fn export_sales(
    dir: &Path,
    sales: &[SaleWithItems],
    invoice_prefix: &str,
) -> ExportResult<PathBuf> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Sales")?;
    write_header(sheet, &SALE_HEADERS, &bold)?;
    for (i, entry) in sales.iter().enumerate() {
        let sale = &entry.sale;
        let invoice = sale.display_invoice_number(invoice_prefix);
        let date = format_date(sale.date);
        write_row(
            sheet,
            row_index(i),
            &[
                Cell::Text(&invoice),
                Cell::Text(&date),
                Cell::Text(&sale.customer_name),
                Cell::Text(&sale.customer_phone),
                Cell::Money(sale.total_amount()),
                Cell::Money(sale.paid_amount()),
                Cell::Money(sale.pending_amount()),
                Cell::Text(sale.payment_type.as_str()),
            ],
        )?;
    }
    sheet.autofit();

    let items = workbook.add_worksheet();
    items.set_name("Sale Items")?;
    write_header(items, &SALE_ITEM_HEADERS, &bold)?;
    let mut row = 1;
    for entry in sales {
        let invoice = entry.sale.display_invoice_number(invoice_prefix);
        for item in &entry.items {
            write_row(
                items,
                row,
                &[
                    Cell::Text(&invoice),
                    Cell::Text(&item.product_name),
                    Cell::Int(item.quantity),
                    Cell::Money(item.selling_price()),
                    Cell::Money(item.total_amount()),
                ],
            )?;
            row += 1;
        }
    }
    items.autofit();

    save(&mut workbook, dir, "Sales_Export", sales.len())
}

/// Purchases with the supplier's name (blank when none or deleted).
pub fn export_purchases(
    dir: &Path,
    purchases: &[Purchase],
    suppliers: &HashMap<i64, String>,
) -> ExportResult<PathBuf> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Purchases")?;
    write_header(sheet, &PURCHASE_HEADERS, &bold)?;
    for (i, p) in purchases.iter().enumerate() {
        let date = format_date(p.date);
        write_row(
            sheet,
            row_index(i),
            &[
                Cell::Int(p.id),
                Cell::Text(&date),
                Cell::Text(&p.invoice_number),
                Cell::Text(name_of(suppliers, p.supplier_id)),
                Cell::Money(p.total_amount()),
                Cell::Money(p.paid_amount()),
                Cell::Money(p.pending_amount()),
            ],
        )?;
    }
    sheet.autofit();

    save(&mut workbook, dir, "Purchases_Export", purchases.len())
}

/// Stock levels with a `LOW STOCK` / `OK` status column.
pub fn export_stock_report(
    dir: &Path,
    products: &[Product],
    categories: &HashMap<i64, String>,
) -> ExportResult<PathBuf> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name("Stock Report")?;
    write_header(sheet, &STOCK_HEADERS, &bold)?;
    for (i, p) in products.iter().enumerate() {
        write_row(
            sheet,
            row_index(i),
            &[
                Cell::Text(&p.name),
                Cell::Text(name_of(categories, p.category_id)),
                Cell::Int(p.current_stock),
                Cell::Int(p.low_stock_alert),
                Cell::Text(stock_status(p)),
            ],
        )?;
    }
    sheet.autofit();

    save(&mut workbook, dir, "Stock_Report", products.len())
}

pub fn stock_status(product: &Product) -> &'static str {
    if product.is_low_stock() {
        "LOW STOCK"
    } else {
        "OK"
    }
}

// =============================================================================
// Helpers
// =============================================================================

enum Cell<'a> {
    Text(&'a str),
    Int(i64),
    Money(Money),
}

fn write_header(sheet: &mut Worksheet, headers: &[&str], bold: &Format) -> ExportResult<()> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, bold)?;
    }
    Ok(())
}

fn write_row(sheet: &mut Worksheet, row: u32, cells: &[Cell<'_>]) -> ExportResult<()> {
    for (col, cell) in cells.iter().enumerate() {
        let col = col as u16;
        match cell {
            Cell::Text(text) => {
                sheet.write_string(row, col, *text)?;
            }
            Cell::Int(n) => {
                sheet.write_number(row, col, *n as f64)?;
            }
            Cell::Money(m) => {
                sheet.write_number(row, col, m.as_rupees_f64())?;
            }
        }
    }
    Ok(())
}

/// Data rows start below the header.
fn row_index(i: usize) -> u32 {
    (i + 1) as u32
}

fn name_of(names: &HashMap<i64, String>, id: Option<i64>) -> &str {
    id.and_then(|id| names.get(&id)).map(String::as_str).unwrap_or("")
}

fn save(workbook: &mut Workbook, dir: &Path, stem: &str, rows: usize) -> ExportResult<PathBuf> {
    let bytes = workbook.save_to_buffer()?;
    let path = write_atomically(dir, &timestamped_name(stem, "xlsx"), &bytes)?;
    info!(export = stem, rows, path = %path.display(), "Workbook exported");
    Ok(path)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::{PaymentType, Sale, SaleItem};
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use chrono::{TimeZone, Utc};

    fn product(id: i64, name: &str, stock: i64) -> Product {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        Product {
            id,
            name: name.to_string(),
            category_id: Some(2),
            brand: "Astral".to_string(),
            size: "1 inch".to_string(),
            color: String::new(),
            unit: "pcs".to_string(),
            purchase_price_paise: 18_000,
            selling_price_paise: 23_050,
            opening_stock: 10,
            current_stock: stock,
            low_stock_alert: 5,
            barcode: String::new(),
            created_at: at,
            updated_at: at,
        }
    }

    fn categories() -> HashMap<i64, String> {
        HashMap::from([(2, "Plumbing".to_string())])
    }

    fn text(data: &Data) -> String {
        match data {
            Data::String(s) => s.clone(),
            Data::Float(f) => f.to_string(),
            Data::Int(i) => i.to_string(),
            Data::Empty => String::new(),
            other => format!("{:?}", other),
        }
    }

    #[test]
    fn test_products_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_products(
            dir.path(),
            &[product(1, "CPVC Pipe", 8), product(2, "CPVC Elbow", 3)],
            &categories(),
        )
        .unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Products_Export_") && name.ends_with(".xlsx"));

        let mut book: Xlsx<_> = open_workbook(&path).unwrap();
        let range = book.worksheet_range("Products").unwrap();
        let rows: Vec<Vec<String>> = range.rows().map(|r| r.iter().map(text).collect()).collect();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], PRODUCT_HEADERS.map(String::from).to_vec());
        assert_eq!(rows[1][1], "CPVC Pipe");
        assert_eq!(rows[1][2], "Plumbing");
        assert_eq!(rows[1][8], "230.5");
        assert_eq!(rows[2][10], "3");
    }

    #[test]
    fn test_stock_report_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_stock_report(
            dir.path(),
            &[product(1, "CPVC Pipe", 8), product(2, "CPVC Elbow", 5)],
            &HashMap::new(),
        )
        .unwrap();

        let mut book: Xlsx<_> = open_workbook(&path).unwrap();
        let range = book.worksheet_range("Stock Report").unwrap();
        let rows: Vec<Vec<String>> = range.rows().map(|r| r.iter().map(text).collect()).collect();

        assert_eq!(rows[1][4], "OK");
        assert_eq!(rows[2][4], "LOW STOCK");
        assert_eq!(rows[1][1], "");
    }

    #[test]
    fn test_sales_export_has_item_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let sale = SaleWithItems {
            sale: Sale {
                id: 7,
                customer_id: None,
                customer_name: "Ravi".to_string(),
                customer_phone: "9999999999".to_string(),
                date: at,
                total_amount_paise: 46_100,
                paid_amount_paise: 40_000,
                pending_amount_paise: 6_100,
                payment_type: PaymentType::Credit,
                invoice_number: String::new(),
                created_at: at,
            },
            items: vec![SaleItem {
                id: 1,
                sale_id: 7,
                product_id: Some(1),
                product_name: "CPVC Pipe".to_string(),
                quantity: 2,
                selling_price_paise: 23_050,
                total_amount_paise: 46_100,
            }],
        };

        let path = export_sales(dir.path(), &[sale], "INV").unwrap();
        let mut book: Xlsx<_> = open_workbook(&path).unwrap();
        assert_eq!(book.sheet_names(), vec!["Sales".to_string(), "Sale Items".to_string()]);

        let sales = book.worksheet_range("Sales").unwrap();
        let row: Vec<String> = sales.rows().nth(1).unwrap().iter().map(text).collect();
        assert_eq!(row[0], "INV0007");
        assert_eq!(row[6], "61");
        assert_eq!(row[7], "CREDIT");

        let items = book.worksheet_range("Sale Items").unwrap();
        let row: Vec<String> = items.rows().nth(1).unwrap().iter().map(text).collect();
        assert_eq!(row, vec!["INV0007", "CPVC Pipe", "2", "230.5", "461"]);
    }

    #[test]
    fn test_purchases_export_names_supplier() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let purchase = Purchase {
            id: 3,
            supplier_id: Some(9),
            date: at,
            invoice_number: "AST-2041".to_string(),
            total_amount_paise: 100_000,
            paid_amount_paise: 40_000,
            pending_amount_paise: 60_000,
            notes: String::new(),
            created_at: at,
        };
        let suppliers = HashMap::from([(9, "Astral Distributors".to_string())]);

        let path = export_purchases(dir.path(), &[purchase], &suppliers).unwrap();
        let mut book: Xlsx<_> = open_workbook(&path).unwrap();
        let range = book.worksheet_range("Purchases").unwrap();
        let row: Vec<String> = range.rows().nth(1).unwrap().iter().map(text).collect();
        assert_eq!(row[2], "AST-2041");
        assert_eq!(row[3], "Astral Distributors");
        assert_eq!(row[6], "600");
    }
}
