use std::{path::PathBuf, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Operator preferences and the billing policy switches the engine reads at startup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub locale: String,
    pub currency: String,
    #[serde(default = "Config::default_ui_color_enabled")]
    pub ui_color_enabled: bool,
    /// Subtract GST from the net payable instead of only reporting it.
    #[serde(default)]
    pub gst_withheld: bool,
    #[serde(default)]
    pub payment_requires_approval: bool,
    #[serde(default)]
    pub open_overrun_requests: bool,
    #[serde(default = "Config::default_gst_percentage")]
    pub default_gst_percentage: Decimal,
    #[serde(default = "Config::default_retention_percentage")]
    pub default_retention_percentage: Decimal,
    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_book: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for project books. Defaults to `~/Documents/Worksbill`.
    pub default_book_root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root directory for backups. Defaults to `~/Documents/Worksbill/backups`.
    pub default_backup_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: "en-IN".into(),
            currency: "INR".into(),
            ui_color_enabled: Self::default_ui_color_enabled(),
            gst_withheld: false,
            payment_requires_approval: false,
            open_overrun_requests: false,
            default_gst_percentage: Self::default_gst_percentage(),
            default_retention_percentage: Self::default_retention_percentage(),
            backup_retention: Self::default_backup_retention(),
            last_opened_book: None,
            default_book_root: None,
            default_backup_root: None,
        }
    }
}

impl Config {
    pub const KEYS: [&'static str; 10] = [
        "locale",
        "currency",
        "ui_color_enabled",
        "gst_withheld",
        "payment_requires_approval",
        "open_overrun_requests",
        "default_gst_percentage",
        "default_retention_percentage",
        "backup_retention",
        "default_book_root",
    ];

    pub fn default_ui_color_enabled() -> bool {
        true
    }

    pub fn default_gst_percentage() -> Decimal {
        Decimal::from(18)
    }

    pub fn default_retention_percentage() -> Decimal {
        Decimal::from(5)
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    pub fn resolve_default_book_root(&self) -> PathBuf {
        if let Some(path) = &self.default_book_root {
            return path.clone();
        }

        let base = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join("Worksbill")
    }

    pub fn resolve_default_backup_root(&self) -> PathBuf {
        if let Some(path) = &self.default_backup_root {
            return path.clone();
        }
        self.resolve_default_book_root().join("backups")
    }

    /// Current value of a settable key, rendered for display.
    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let value = match key {
            "locale" => self.locale.clone(),
            "currency" => self.currency.clone(),
            "ui_color_enabled" => self.ui_color_enabled.to_string(),
            "gst_withheld" => self.gst_withheld.to_string(),
            "payment_requires_approval" => self.payment_requires_approval.to_string(),
            "open_overrun_requests" => self.open_overrun_requests.to_string(),
            "default_gst_percentage" => self.default_gst_percentage.to_string(),
            "default_retention_percentage" => self.default_retention_percentage.to_string(),
            "backup_retention" => self.backup_retention.to_string(),
            "default_book_root" => self.resolve_default_book_root().display().to_string(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "locale" => self.locale = non_empty(key, value)?,
            "currency" => self.currency = non_empty(key, value)?.to_ascii_uppercase(),
            "ui_color_enabled" => self.ui_color_enabled = parse_flag(key, value)?,
            "gst_withheld" => self.gst_withheld = parse_flag(key, value)?,
            "payment_requires_approval" => {
                self.payment_requires_approval = parse_flag(key, value)?
            }
            "open_overrun_requests" => self.open_overrun_requests = parse_flag(key, value)?,
            "default_gst_percentage" => self.default_gst_percentage = parse_percentage(key, value)?,
            "default_retention_percentage" => {
                self.default_retention_percentage = parse_percentage(key, value)?
            }
            "backup_retention" => {
                let retention: usize = value.parse().map_err(|_| invalid(key, "expected a whole number"))?;
                if retention == 0 {
                    return Err(invalid(key, "must keep at least one backup"));
                }
                self.backup_retention = retention;
            }
            "default_book_root" => {
                self.default_book_root = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                }
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn non_empty(key: &str, value: &str) -> Result<String, ConfigError> {
    if value.is_empty() {
        Err(invalid(key, "must not be empty"))
    } else {
        Ok(value.to_string())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(key, "expected true or false")),
    }
}

fn parse_percentage(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    let parsed = Decimal::from_str(value).map_err(|_| invalid(key, "expected a number"))?;
    if parsed < Decimal::ZERO || parsed > Decimal::ONE_HUNDRED {
        return Err(invalid(key, "must be between 0 and 100"));
    }
    Ok(parsed)
}
