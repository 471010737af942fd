//! # Commands
//!
//! One module per screen of the shop app. Each command takes the [`App`]
//! context, calls the database or exporters, and prints through
//! [`Output`].
//!
//! ## Organization
//! - [`product`] - Products, categories, stock adjustment and history
//! - [`party`] - Suppliers and customers
//! - [`sale`] - Selling, sale payments, invoices
//! - [`purchase`] - Supplier bills and payments
//! - [`report`] - Dashboard, reports, search
//! - [`export`] - Spreadsheet exports
//! - [`shop`] - Shop details, lock, app config

pub mod export;
pub mod party;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;
pub mod shop;

use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::Serialize;

use anvil_core::dates::parse_date;
use anvil_core::{DateRange, Money};

use crate::error::{AppError, AppResult, ErrorCode};
use crate::{App, Command};

/// Runs a parsed command.
pub async fn dispatch(app: &App, command: Command) -> AppResult<()> {
    match command {
        Command::Dashboard => report::dashboard(app).await,
        Command::Search { query } => report::search(app, &query).await,
        Command::Product(cmd) => product::product(app, cmd).await,
        Command::Category(cmd) => product::category(app, cmd).await,
        Command::Supplier(cmd) => party::supplier(app, cmd).await,
        Command::Customer(cmd) => party::customer(app, cmd).await,
        Command::Sell(args) => sale::sell(app, args).await,
        Command::Sale(cmd) => sale::sale(app, cmd).await,
        Command::Purchase(args) => purchase::purchase(app, args).await,
        Command::Purchases(cmd) => purchase::purchases(app, cmd).await,
        Command::Report(args) => report::report(app, args).await,
        Command::Export(args) => export::export(app, args).await,
        Command::Shop(cmd) => shop::shop(app, cmd).await,
        Command::Config(cmd) => shop::config(&cmd, &app.config, app.config_path.clone(), &app.out),
    }
}

// =============================================================================
// Output
// =============================================================================

/// Prints results as text or JSON.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Output { json }
    }

    pub fn is_json(&self) -> bool {
        self.json
    }

    /// Prints `value` as JSON, or the text from `human`.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce() -> String) -> AppResult<()> {
        if self.json {
            let text = serde_json::to_string_pretty(value)
                .map_err(|e| AppError::new(ErrorCode::Internal, e.to_string()))?;
            println!("{}", text);
        } else {
            println!("{}", human());
        }
        Ok(())
    }
}

/// Left-aligned columns sized to their widest cell.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(headers.to_vec())];
    out.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    if rows.is_empty() {
        out.push("(none)".to_string());
    }
    out.join("\n")
}

// =============================================================================
// Shared Arguments
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Period {
    Today,
    Week,
    Month,
    All,
}

/// `--period` or an explicit `--from` / `--to` (inclusive days).
#[derive(Debug, Clone, clap::Args)]
pub struct RangeArgs {
    #[arg(long, value_enum, conflicts_with_all = ["from", "to"])]
    pub period: Option<Period>,

    /// First day, dd/mm/yyyy or yyyy-mm-dd.
    #[arg(long, value_parser = parse_day)]
    pub from: Option<NaiveDate>,

    /// Last day (inclusive). Defaults to `--from`.
    #[arg(long, value_parser = parse_day, requires = "from")]
    pub to: Option<NaiveDate>,
}

impl RangeArgs {
    /// The chosen range, or `default` when nothing was given.
    pub fn resolve(&self, default: Period) -> AppResult<DateRange> {
        if let Some(from) = self.from {
            let to = self.to.unwrap_or(from);
            return Ok(DateRange::between(from, to)?);
        }
        Ok(match self.period.unwrap_or(default) {
            Period::Today => DateRange::today(),
            Period::Week => DateRange::this_week(),
            Period::Month => DateRange::this_month(),
            Period::All => DateRange::all_time(),
        })
    }
}

pub fn parse_day(text: &str) -> Result<NaiveDate, String> {
    parse_date(text).map_err(|e| e.to_string())
}

pub fn parse_money(text: &str) -> Result<Money, String> {
    Money::from_str(text).map_err(|e| e.to_string())
}

/// A cart line from the command line: `ID:QTY` or `ID:QTY@RATE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemArg {
    pub product_id: i64,
    pub quantity: i64,
    pub rate: Option<Money>,
}

impl FromStr for ItemArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("'{}' should look like ID:QTY", s))?;
        let (qty, rate) = match rest.split_once('@') {
            Some((qty, rate)) => (qty, Some(parse_money(rate)?)),
            None => (rest, None),
        };
        Ok(ItemArg {
            product_id: id
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not a product id", id))?,
            quantity: qty
                .trim()
                .parse()
                .map_err(|_| format!("'{}' is not a quantity", qty))?,
            rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_arg() {
        assert_eq!(
            "12:3".parse::<ItemArg>().unwrap(),
            ItemArg { product_id: 12, quantity: 3, rate: None }
        );
        assert_eq!(
            "4:10@182.50".parse::<ItemArg>().unwrap().rate,
            Some(Money::from_rupees_paise(182, 50))
        );
        assert!("12".parse::<ItemArg>().is_err());
        assert!("x:1".parse::<ItemArg>().is_err());
        assert!("1:2@abc".parse::<ItemArg>().is_err());
    }

    #[test]
    fn test_table_alignment() {
        let text = table(
            &["ID", "Name"],
            &[vec!["1".into(), "Claw Hammer".into()], vec!["12".into(), "Tape".into()]],
        );
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ID  Name");
        assert_eq!(lines[1], "--  -----------");
        assert_eq!(lines[2], "1   Claw Hammer");
        assert_eq!(lines[3], "12  Tape");
    }

    #[test]
    fn test_empty_table() {
        assert!(table(&["ID"], &[]).ends_with("(none)"));
    }

    #[test]
    fn test_range_from_to() {
        let args = RangeArgs {
            period: None,
            from: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
        };
        let range = args.resolve(Period::Today).unwrap();
        assert!(range.end > range.start);

        let reversed = RangeArgs {
            period: None,
            from: Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        };
        assert!(reversed.resolve(Period::Today).is_err());
    }
}
