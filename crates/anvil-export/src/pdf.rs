//! # PDF Documents
//!
//! Two layouts, both drawn with the PDF builtin Helvetica:
//!
//! ```text
//! 80mm thermal invoice                 A4 report
//! ┌──────────────────────┐            ┌──────────────────────────────┐
//! │     SHOP NAME        │            │          Shop Name           │
//! │      location        │            │           location           │
//! │  phone · GST         │            │                              │
//! │ ──────────────────── │            │         Report Title         │
//! │ Date: ..   Inv: ..   │            │ Date: dd/mm/yyyy             │
//! │ Customer / Phone     │            │ Period: .. - ..              │
//! │ ──────────────────── │            │ label ................ value │
//! │ Item     Qty Rate Amt│            │ label ................ value │
//! │ ...                  │            │ ...            (more pages)  │
//! │ ──────────────────── │            │ Total ................ value │
//! │ Total / Paid /       │            └──────────────────────────────┘
//! │ Pending / Payment    │
//! │ Thank you ...        │
//! └──────────────────────┘
//! ```
//!
//! Builtin fonts have no rupee glyph, so amounts print as `Rs. 1,250.00`.

use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use anvil_core::dates::format_date;
use anvil_core::{Money, SaleWithItems, ShopInfo};

use crate::error::{ExportError, ExportResult};
use crate::{timestamped_name, write_atomically};

/// Thermal roll width.
pub const INVOICE_WIDTH_MM: f32 = 80.0;
/// Item names longer than this are cut on the invoice.
pub const INVOICE_NAME_CHARS: usize = 15;

const A4_WIDTH_MM: f32 = 210.0;
const A4_HEIGHT_MM: f32 = 297.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.52;

/// A report ready to print: what [`report_pdf`] draws.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub title: String,
    /// "dd/mm/yyyy - dd/mm/yyyy", or empty.
    pub period: String,
    pub rows: Vec<(String, String)>,
    pub totals: Vec<(String, String)>,
}

// =============================================================================
// Invoice
// =============================================================================

/// Renders the customer invoice for a sale.
pub fn invoice_pdf(shop: &ShopInfo, sale: &SaleWithItems) -> ExportResult<Vec<u8>> {
    let invoice = sale.sale.display_invoice_number(&shop.invoice_prefix);
    let height = invoice_height_mm(sale.items.len());

    let (doc, page, layer) = PdfDocument::new(
        format!("Invoice {}", invoice),
        Mm(INVOICE_WIDTH_MM),
        Mm(height),
        "Layer 1",
    );
    {
        let mut pen = Pen::new(&doc, doc.get_page(page).get_layer(layer), INVOICE_WIDTH_MM, height, 4.0)?;
        let s = &sale.sale;

        pen.centered(&shop.shop_name.to_uppercase(), 14.0, true);
        pen.down(5.5);
        if !shop.location.trim().is_empty() {
            pen.centered(&shop.location, 9.0, false);
            pen.down(4.0);
        }
        let contact = contact_line(shop);
        if !contact.is_empty() {
            pen.centered(&contact, 8.0, false);
            pen.down(4.0);
        }
        pen.rule();

        pen.left(&format!("Date: {}", format_date(s.date)), 9.0, false);
        pen.right(&format!("Inv: {}", invoice), 9.0, false);
        pen.down(4.0);
        if !s.customer_name.trim().is_empty() {
            pen.left(&format!("Customer: {}", s.customer_name), 9.0, false);
            pen.down(4.0);
        }
        if !s.customer_phone.trim().is_empty() {
            pen.left(&format!("Phone: {}", s.customer_phone), 9.0, false);
            pen.down(4.0);
        }
        pen.rule();

        let cols = InvoiceColumns::for_width(INVOICE_WIDTH_MM);
        pen.at(cols.item, "Item", 10.0, true);
        pen.at(cols.qty, "Qty", 10.0, true);
        pen.right_at(cols.rate_end, "Rate", 10.0, true);
        pen.right("Amt", 10.0, true);
        pen.down(4.5);
        for item in &sale.items {
            pen.at(cols.item, &truncate_chars(&item.product_name, INVOICE_NAME_CHARS), 8.0, false);
            pen.at(cols.qty, &item.quantity.to_string(), 8.0, false);
            pen.right_at(cols.rate_end, &item.selling_price().format_plain(), 8.0, false);
            pen.right(&item.total_amount().format_plain(), 8.0, false);
            pen.down(4.0);
        }
        pen.rule();

        pen.left("Total:", 10.0, true);
        pen.right(&rupees(s.total_amount()), 10.0, true);
        pen.down(4.5);
        pen.left("Paid:", 9.0, false);
        pen.right(&rupees(s.paid_amount()), 9.0, false);
        pen.down(4.0);
        if s.pending_amount().is_positive() {
            pen.left("Pending:", 9.0, false);
            pen.right(&rupees(s.pending_amount()), 9.0, false);
            pen.down(4.0);
        }
        pen.left("Payment:", 9.0, false);
        pen.right(s.payment_type.as_str(), 9.0, false);
        pen.down(4.0);
        pen.rule();

        pen.centered("Thank you for your purchase!", 9.0, false);
    }

    save(doc)
}

/// Writes the invoice as `Invoice_<number>_<millis>.pdf`.
pub fn write_invoice(dir: &Path, shop: &ShopInfo, sale: &SaleWithItems) -> ExportResult<PathBuf> {
    let bytes = invoice_pdf(shop, sale)?;
    let invoice = sale.sale.display_invoice_number(&shop.invoice_prefix);
    let stem = format!("Invoice_{}", file_safe(&invoice));
    let path = write_atomically(dir, &timestamped_name(&stem, "pdf"), &bytes)?;

    info!(sale_id = sale.sale.id, invoice = %invoice, path = %path.display(), "Invoice PDF written");
    Ok(path)
}

fn invoice_height_mm(items: usize) -> f32 {
    (95.0 + items as f32 * 4.0).max(120.0)
}

struct InvoiceColumns {
    item: f32,
    qty: f32,
    rate_end: f32,
}

impl InvoiceColumns {
    /// Item 2 : Qty 0.8 : Rate 1 : Amt 1.2, as on the shop's printed rolls.
    fn for_width(width: f32) -> Self {
        let inner = width - 8.0;
        let unit = inner / 5.0;
        InvoiceColumns {
            item: 4.0,
            qty: 4.0 + unit * 2.0,
            rate_end: 4.0 + unit * 3.8,
        }
    }
}

fn contact_line(shop: &ShopInfo) -> String {
    let mut parts = Vec::new();
    if !shop.phone.trim().is_empty() {
        parts.push(format!("Ph: {}", shop.phone.trim()));
    }
    if !shop.gst_number.trim().is_empty() {
        parts.push(format!("GST: {}", shop.gst_number.trim()));
    }
    parts.join("  ")
}

// =============================================================================
// Report
// =============================================================================

/// Renders an A4 report, adding pages as rows run out.
pub fn report_pdf(
    shop: &ShopInfo,
    report: &ReportDocument,
    generated_at: DateTime<Utc>,
) -> ExportResult<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(
        report.title.clone(),
        Mm(A4_WIDTH_MM),
        Mm(A4_HEIGHT_MM),
        "Layer 1",
    );
    {
        let mut pen = Pen::new(&doc, doc.get_page(page).get_layer(layer), A4_WIDTH_MM, A4_HEIGHT_MM, 13.0)?;

        pen.centered(&shop.shop_name, 18.0, true);
        pen.down(7.0);
        if !shop.location.trim().is_empty() {
            pen.centered(&shop.location, 10.0, false);
            pen.down(5.0);
        }
        pen.down(5.0);
        pen.centered(&report.title, 12.0, true);
        pen.down(7.0);
        pen.left(&format!("Date: {}", format_date(generated_at)), 10.0, false);
        pen.down(5.0);
        if !report.period.is_empty() {
            pen.left(&format!("Period: {}", report.period), 10.0, false);
            pen.down(5.0);
        }
        pen.down(4.0);

        for (label, value) in &report.rows {
            pen.ensure_room(10.0);
            pen.left(label, 10.0, false);
            pen.right(value, 10.0, false);
            pen.down(2.0);
            pen.rule();
            pen.down(1.5);
        }

        pen.down(3.0);
        for (label, value) in &report.totals {
            pen.ensure_room(8.0);
            pen.left(label, 11.0, true);
            pen.right(value, 11.0, true);
            pen.down(6.0);
        }
    }

    save(doc)
}

/// Writes the report as `<Title_With_Underscores>_<millis>.pdf`.
pub fn write_report(dir: &Path, shop: &ShopInfo, report: &ReportDocument) -> ExportResult<PathBuf> {
    let bytes = report_pdf(shop, report, Utc::now())?;
    let stem = file_safe(&report.title.replace(' ', "_"));
    let path = write_atomically(dir, &timestamped_name(&stem, "pdf"), &bytes)?;

    info!(title = %report.title, rows = report.rows.len(), path = %path.display(), "Report PDF written");
    Ok(path)
}

// =============================================================================
// Drawing
// =============================================================================

/// A cursor over a document, writing top to bottom.
struct Pen<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    width: f32,
    height: f32,
    margin: f32,
    y: f32,
}

impl<'a> Pen<'a> {
    fn new(
        doc: &'a PdfDocumentReference,
        layer: PdfLayerReference,
        width: f32,
        height: f32,
        margin: f32,
    ) -> ExportResult<Self> {
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(ExportError::pdf)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(ExportError::pdf)?;
        Ok(Pen {
            doc,
            layer,
            regular,
            bold,
            width,
            height,
            margin,
            y: height - margin - 4.0,
        })
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold {
            &self.bold
        } else {
            &self.regular
        }
    }

    fn at(&self, x: f32, text: &str, size: f32, bold: bool) {
        self.layer
            .use_text(pdf_text(text), size, Mm(x), Mm(self.y), self.font(bold));
    }

    fn left(&self, text: &str, size: f32, bold: bool) {
        self.at(self.margin, text, size, bold);
    }

    fn right_at(&self, x_end: f32, text: &str, size: f32, bold: bool) {
        let x = (x_end - text_width_mm(&pdf_text(text), size)).max(self.margin);
        self.at(x, text, size, bold);
    }

    fn right(&self, text: &str, size: f32, bold: bool) {
        self.right_at(self.width - self.margin, text, size, bold);
    }

    fn centered(&self, text: &str, size: f32, bold: bool) {
        let x = ((self.width - text_width_mm(&pdf_text(text), size)) / 2.0).max(self.margin);
        self.at(x, text, size, bold);
    }

    fn down(&mut self, mm: f32) {
        self.y -= mm;
    }

    fn rule(&mut self) {
        self.down(1.0);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(self.margin), Mm(self.y)), false),
                (Point::new(Mm(self.width - self.margin), Mm(self.y)), false),
            ],
            is_closed: false,
        });
        self.down(3.5);
    }

    /// Starts a new page when fewer than `mm` remain above the margin.
    fn ensure_room(&mut self, mm: f32) {
        if self.y - mm >= self.margin {
            return;
        }
        let (page, layer) = self.doc.add_page(Mm(self.width), Mm(self.height), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = self.height - self.margin - 4.0;
    }
}

fn save(doc: PdfDocumentReference) -> ExportResult<Vec<u8>> {
    let mut writer = BufWriter::new(Vec::<u8>::new());
    doc.save(&mut writer).map_err(ExportError::pdf)?;
    writer.into_inner().map_err(ExportError::pdf)
}

// =============================================================================
// Text Helpers
// =============================================================================

fn rupees(amount: Money) -> String {
    if amount.is_negative() {
        format!("-Rs. {}", amount.abs().format_plain())
    } else {
        format!("Rs. {}", amount.format_plain())
    }
}

/// Swaps characters the builtin fonts cannot draw.
fn pdf_text(text: &str) -> String {
    text.replace('₹', "Rs. ")
}

fn text_width_mm(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_GLYPH_EM * PT_TO_MM
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Keeps letters, digits, `-` and `_`; everything else becomes `_`.
fn file_safe(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::{PaymentType, Sale, SaleItem};
    use chrono::TimeZone;

    fn shop() -> ShopInfo {
        ShopInfo {
            id: 1,
            shop_name: "Krishna Hardware".to_string(),
            location: "Station Road, Nashik".to_string(),
            phone: "0253-2312345".to_string(),
            email: String::new(),
            gst_number: "27AAPFK1234L1Z5".to_string(),
            invoice_prefix: "KH-".to_string(),
            next_invoice_number: 3,
            biometric_enabled: false,
        }
    }

    fn sale(items: usize) -> SaleWithItems {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let items: Vec<SaleItem> = (0..items as i64)
            .map(|i| SaleItem {
                id: i + 1,
                sale_id: 2,
                product_id: Some(i + 1),
                product_name: "Stainless Steel Hinge 4 inch".to_string(),
                quantity: 2,
                selling_price_paise: 12_500,
                total_amount_paise: 25_000,
            })
            .collect();
        let total = items.iter().map(|i| i.total_amount_paise).sum();
        SaleWithItems {
            sale: Sale {
                id: 2,
                customer_id: None,
                customer_name: "Ravi".to_string(),
                customer_phone: String::new(),
                date: at,
                total_amount_paise: total,
                paid_amount_paise: total - 5_000,
                pending_amount_paise: 5_000,
                payment_type: PaymentType::Credit,
                invoice_number: "KH-0002".to_string(),
                created_at: at,
            },
            items,
        }
    }

    #[test]
    fn test_invoice_pdf_renders() {
        let bytes = invoice_pdf(&shop(), &sale(3)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_write_invoice_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_invoice(dir.path(), &shop(), &sale(1)).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Invoice_KH-0002_"));
        assert!(name.ends_with(".pdf"));
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_long_report_spills_onto_pages() {
        let report = ReportDocument {
            title: "Stock Report".to_string(),
            period: String::new(),
            rows: (0..200)
                .map(|i| (format!("Product {}", i), "Stock: 1 (Alert: 5)".to_string()))
                .collect(),
            totals: vec![("Inventory Value".to_string(), "₹12,400.00".to_string())],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(dir.path(), &shop(), &report).unwrap();
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("Stock_Report_"));
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(truncate_chars("Stainless Steel Hinge", INVOICE_NAME_CHARS), "Stainless Steel");
        assert_eq!(truncate_chars("Tap", INVOICE_NAME_CHARS), "Tap");
        assert_eq!(rupees(Money::from_rupees(1250)), "Rs. 1,250.00");
        assert_eq!(pdf_text("₹50.00"), "Rs. 50.00");
        assert_eq!(file_safe("INV/12 A"), "INV_12_A");
    }

    #[test]
    fn test_invoice_height_grows_with_items() {
        assert_eq!(invoice_height_mm(1), 120.0);
        assert!(invoice_height_mm(30) > invoice_height_mm(10));
    }
}
