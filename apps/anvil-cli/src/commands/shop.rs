//! Shop details printed on invoices, the app-open lock, and the local
//! config file.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

use anvil_core::ShopInfo;

use super::Output;
use crate::config::AppConfig;
use crate::error::AppResult;
use crate::App;

#[derive(Debug, Subcommand)]
pub enum ShopCommand {
    Show,
    /// Change the details printed on invoices. Unset flags keep their value.
    Set(ShopFields),
    /// Ask for confirmation every time the app opens.
    Lock {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Debug, Args)]
pub struct ShopFields {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub gst: Option<String>,
    /// Invoice number prefix, e.g. KH for KH-0001.
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the settings in effect.
    Show,
    /// Write the settings in effect to the config file.
    Init,
}

pub async fn shop(app: &App, cmd: ShopCommand) -> AppResult<()> {
    let repo = app.db.shop();
    match cmd {
        ShopCommand::Show => {
            let info = repo.get().await?;
            app.out.emit(&info, || describe_shop(&info))
        }
        ShopCommand::Set(fields) => {
            let mut info = repo.get().await?;
            fields.apply(&mut info);
            let info = repo.update(&info).await?;
            app.out.emit(&info, || describe_shop(&info))
        }
        ShopCommand::Lock { state } => {
            let enabled = state == Toggle::On;
            repo.set_biometric_enabled(enabled).await?;
            app.out.emit(&enabled, || {
                format!("App lock {}", if enabled { "enabled" } else { "disabled" })
            })
        }
    }
}

impl ShopFields {
    fn apply(self, info: &mut ShopInfo) {
        let fields = [
            (self.name, &mut info.shop_name),
            (self.location, &mut info.location),
            (self.phone, &mut info.phone),
            (self.email, &mut info.email),
            (self.gst, &mut info.gst_number),
            (self.prefix, &mut info.invoice_prefix),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

fn describe_shop(info: &ShopInfo) -> String {
    let mut lines = vec![info.shop_name.clone()];
    for (label, value) in [
        ("Location", &info.location),
        ("Phone", &info.phone),
        ("Email", &info.email),
        ("GST", &info.gst_number),
    ] {
        if !value.is_empty() {
            lines.push(format!("{:<10}{}", format!("{}:", label), value));
        }
    }
    lines.push(format!("Next invoice: {}", info.peek_invoice_number()));
    lines.push(format!(
        "App lock:     {}",
        if info.biometric_enabled { "on" } else { "off" }
    ));
    lines.join("\n")
}

#[derive(Debug, Serialize)]
struct ConfigView<'a> {
    path: Option<PathBuf>,
    #[serde(flatten)]
    config: &'a AppConfig,
}

/// Config commands never open the database.
pub fn config(
    cmd: &ConfigCommand,
    config: &AppConfig,
    path: Option<PathBuf>,
    out: &Output,
) -> AppResult<()> {
    match cmd {
        ConfigCommand::Show => {
            let view = ConfigView {
                path: path.or_else(AppConfig::default_config_path),
                config,
            };
            out.emit(&view, || {
                format!(
                    "Config file:     {}\nDatabase:        {}\nExport folder:   {}\nBalance policy:  {:?}\nLock fail-open:  {}",
                    view.path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(none)".to_string()),
                    config.database_path.display(),
                    config.export_dir.display(),
                    config.balance_policy,
                    config.biometric_fail_open,
                )
            })
        }
        ConfigCommand::Init => {
            let written = config.save(path)?;
            out.emit(&written, || format!("Wrote {}", written.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop() -> ShopInfo {
        ShopInfo {
            id: anvil_core::SHOP_INFO_ID,
            shop_name: "Kumar Hardware".to_string(),
            location: "Main Bazaar".to_string(),
            phone: String::new(),
            email: String::new(),
            gst_number: String::new(),
            invoice_prefix: "INV".to_string(),
            next_invoice_number: 1,
            biometric_enabled: false,
        }
    }

    #[test]
    fn test_set_keeps_unset_fields() {
        let mut info = shop();
        ShopFields {
            name: None,
            location: None,
            phone: Some("9876543210".to_string()),
            email: None,
            gst: None,
            prefix: Some("KH".to_string()),
        }
        .apply(&mut info);

        assert_eq!(info.shop_name, "Kumar Hardware");
        assert_eq!(info.location, "Main Bazaar");
        assert_eq!(info.phone, "9876543210");
        assert_eq!(info.invoice_prefix, "KH");
    }

    #[test]
    fn test_describe_skips_blank_fields() {
        let text = describe_shop(&shop());
        assert!(text.contains("Main Bazaar"));
        assert!(!text.contains("Email"));
        assert!(text.contains("App lock:     off"));
    }

    #[test]
    fn test_config_init_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anvil.toml");
        let settings = AppConfig::default();

        config(&ConfigCommand::Init, &settings, Some(path.clone()), &Output::new(true)).unwrap();
        assert!(path.is_file());
        assert_eq!(AppConfig::load(Some(path)).unwrap(), settings);
    }
}
