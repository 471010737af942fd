//! Spreadsheet exports into the export folder.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use tracing::info;

use anvil_export::share::LogShareTarget;
use anvil_export::{
    export_products, export_purchases, export_sales, export_stock_report, SharePayload,
    ShareTarget,
};

use super::product::category_names;
use super::{Period, RangeArgs};
use crate::error::AppResult;
use crate::App;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportKind {
    Products,
    Sales,
    Purchases,
    Stock,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(value_enum)]
    pub what: ExportKind,

    /// Period for sales and purchases (default all time).
    #[command(flatten)]
    pub range: RangeArgs,

    /// Write here instead of the configured export folder.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    #[arg(long)]
    pub share: bool,
}

pub async fn export(app: &App, args: ExportArgs) -> AppResult<()> {
    let dir = args.dir.unwrap_or_else(|| app.config.export_dir.clone());

    let (path, rows) = match args.what {
        ExportKind::Products => {
            let products = app.db.products().list().await?;
            let categories = category_names(app).await?;
            (export_products(&dir, &products, &categories)?, products.len())
        }
        ExportKind::Stock => {
            let products = app.db.products().list().await?;
            let categories = category_names(app).await?;
            (export_stock_report(&dir, &products, &categories)?, products.len())
        }
        ExportKind::Sales => {
            let range = args.range.resolve(Period::All)?;
            let repo = app.db.sales();
            let mut sales = Vec::new();
            for sale in repo.in_range(&range).await? {
                sales.push(repo.with_items(sale.id).await?);
            }
            let prefix = app.db.shop().get().await?.invoice_prefix;
            (export_sales(&dir, &sales, &prefix)?, sales.len())
        }
        ExportKind::Purchases => {
            let range = args.range.resolve(Period::All)?;
            let purchases = app.db.purchases().in_range(&range).await?;
            let suppliers: HashMap<i64, String> = app
                .db
                .suppliers()
                .list()
                .await?
                .into_iter()
                .map(|s| (s.id, s.name))
                .collect();
            (export_purchases(&dir, &purchases, &suppliers)?, purchases.len())
        }
    };
    info!(kind = ?args.what, rows, path = %path.display(), "Export written");

    if args.share {
        let subject = format!("{:?} export", args.what);
        LogShareTarget.share(&SharePayload::workbook(&path, subject))?;
    }

    app.out
        .emit(&path, || format!("Exported {} rows to {}", rows, path.display()))
}
