use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub import: ImportSettings,
    #[serde(default)]
    pub fees: FeeSettings,
    #[serde(default)]
    pub reporting: ReportingSettings,
    /// Company code -> display name. Codes double as the CSV filename prefix.
    pub companies: BTreeMap<String, String>,
    #[serde(default)]
    pub expected_totals: Vec<ExpectedTotals>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ImportSettings {
    pub csv_dir: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FeeSettings {
    /// Blended rate used to estimate missing fees on charges/payments.
    pub estimate_rate: Decimal,
}

impl Default for FeeSettings {
    fn default() -> Self {
        Self {
            // 4.2%
            estimate_rate: Decimal::new(42, 3),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReportingSettings {
    /// Days past the 28th of a month that still count as an imminent transfer.
    pub settlement_grace_days: i64,
}

impl Default for ReportingSettings {
    fn default() -> Self {
        Self {
            settlement_grace_days: 4,
        }
    }
}

/// One verified historical period for the regression guard.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExpectedTotals {
    pub company: String,
    pub year: i32,
    pub month: u32,
    pub total_paid_out: Decimal,
    pub ending_balance: Decimal,
}
