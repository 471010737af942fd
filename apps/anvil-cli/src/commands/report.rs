//! Dashboard, search and the six reports.

use clap::{Args, ValueEnum};
use tracing::info;

use anvil_core::dates::format_date;
use anvil_db::reports::describe_dashboard;
use anvil_db::{Report, ReportKind};
use anvil_export::share::LogShareTarget;
use anvil_export::{write_report, ReportDocument, SharePayload, ShareTarget};

use super::{table, Period, RangeArgs};
use crate::error::AppResult;
use crate::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Sales,
    Purchases,
    Profit,
    Stock,
    SupplierPending,
    CustomerPending,
}

impl From<KindArg> for ReportKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Sales => ReportKind::Sales,
            KindArg::Purchases => ReportKind::Purchases,
            KindArg::Profit => ReportKind::Profit,
            KindArg::Stock => ReportKind::Stock,
            KindArg::SupplierPending => ReportKind::SupplierPending,
            KindArg::CustomerPending => ReportKind::CustomerPending,
        }
    }
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[arg(value_enum)]
    pub kind: KindArg,

    /// Period for sales, purchases and profit (default today).
    #[command(flatten)]
    pub range: RangeArgs,

    /// Also write the report as a PDF.
    #[arg(long)]
    pub pdf: bool,

    /// Hand the PDF to the share target (implies --pdf).
    #[arg(long)]
    pub share: bool,
}

pub async fn dashboard(app: &App) -> AppResult<()> {
    let summary = app.db.reports().dashboard().await?;
    app.out.emit(&summary, || describe_dashboard(&summary))
}

pub async fn search(app: &App, query: &str) -> AppResult<()> {
    let results = app.db.search().all(query).await?;
    let prefix = app.db.shop().get().await?.invoice_prefix;

    app.out.emit(&results, || {
        if results.is_empty() {
            return format!("Nothing matches '{}'", results.query);
        }
        let mut rows = Vec::with_capacity(results.len());
        for p in &results.products {
            rows.push(vec![
                "Product".to_string(),
                p.id.to_string(),
                p.display_name(),
                format!("{} in stock", p.current_stock),
            ]);
        }
        for c in &results.customers {
            rows.push(vec![
                "Customer".to_string(),
                c.id.to_string(),
                c.name.clone(),
                c.phone.clone(),
            ]);
        }
        for s in &results.suppliers {
            rows.push(vec![
                "Supplier".to_string(),
                s.id.to_string(),
                s.name.clone(),
                s.phone.clone(),
            ]);
        }
        for s in &results.sales {
            rows.push(vec![
                "Sale".to_string(),
                s.id.to_string(),
                s.display_invoice_number(&prefix),
                format!("{} {}", format_date(s.date), s.customer_label()),
            ]);
        }
        table(&["Kind", "ID", "Name", ""], &rows)
    })
}

pub async fn report(app: &App, args: ReportArgs) -> AppResult<()> {
    let kind = ReportKind::from(args.kind);
    let range = if kind.is_dated() {
        Some(args.range.resolve(Period::Today)?)
    } else {
        None
    };
    let report = app.db.reports().generate(kind, range).await?;

    if args.pdf || args.share {
        let shop = app.db.shop().get().await?;
        let path = write_report(&app.config.export_dir, &shop, &to_document(&report))?;
        info!(kind = ?kind, path = %path.display(), "Report PDF written");
        if args.share {
            LogShareTarget.share(&SharePayload::pdf(&path, report.title.clone()))?;
        }
        if !app.out.is_json() {
            println!("PDF: {}\n", path.display());
        }
    }

    app.out.emit(&report, || describe_report(&report))
}

/// What the PDF renderer needs from a report.
pub fn to_document(report: &Report) -> ReportDocument {
    ReportDocument {
        title: report.title.clone(),
        period: report.period_label(),
        rows: report
            .lines
            .iter()
            .map(|l| (l.label.clone(), l.value.clone()))
            .collect(),
        totals: report.totals(),
    }
}

fn describe_report(report: &Report) -> String {
    let mut out = vec![report.title.clone()];
    let period = report.period_label();
    if !period.is_empty() {
        out.push(period);
    }
    out.push(String::new());

    let rows = report
        .lines
        .iter()
        .map(|l| {
            vec![
                l.date.map(format_date).unwrap_or_default(),
                l.label.clone(),
                l.value.clone(),
            ]
        })
        .collect::<Vec<_>>();
    out.push(table(&["Date", "Item", "Value"], &rows));
    out.push(String::new());
    for (label, value) in report.totals() {
        out.push(format!("{}: {}", label, value));
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anvil_core::Money;
    use anvil_db::ReportLine;

    fn sample() -> Report {
        Report {
            kind: ReportKind::Stock,
            title: ReportKind::Stock.title().to_string(),
            range: None,
            total_amount: Money::from_rupees(4500),
            total_profit: None,
            lines: vec![ReportLine {
                label: "Claw Hammer".to_string(),
                value: "Stock: 3 (Alert: 5)".to_string(),
                date: None,
            }],
        }
    }

    #[test]
    fn test_every_kind_maps() {
        for (arg, kind) in KindArg::value_variants().iter().zip(ReportKind::ALL) {
            assert_eq!(ReportKind::from(*arg), kind);
        }
    }

    #[test]
    fn test_to_document() {
        let doc = to_document(&sample());
        assert_eq!(doc.title, "Stock Report");
        assert_eq!(doc.period, "");
        assert_eq!(doc.rows, vec![("Claw Hammer".to_string(), "Stock: 3 (Alert: 5)".to_string())]);
        assert_eq!(doc.totals[0].0, "Inventory Value");
    }

    #[test]
    fn test_describe_report() {
        let text = describe_report(&sample());
        assert!(text.starts_with("Stock Report\n\n"));
        assert!(text.contains("Claw Hammer"));
        assert!(text.ends_with(&format!("Inventory Value: {}", Money::from_rupees(4500))));
    }
}
