mod settings;

pub use settings::{Config, ExpectedTotals, FeeSettings, ImportSettings, ReportingSettings};

use crate::error::{PayrecError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the config directory path (~/.payrec or XDG config)
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "payrec") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    let home = dirs_home().ok_or_else(|| {
        PayrecError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".payrec"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        if let Some(home) = dirs_home() {
            return home.join(&path[2..]);
        }
    }
    PathBuf::from(path)
}

/// Resolve the CSV import directory: expand ~, and resolve relative
/// paths against the config directory.
pub fn resolve_csv_dir(csv_dir: &str, cfg_dir: &Path) -> PathBuf {
    let expanded = expand_path(csv_dir);
    if expanded.is_absolute() {
        expanded
    } else {
        cfg_dir.join(expanded)
    }
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(PayrecError::ConfigFileNotFound(path));
    }
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| PayrecError::ConfigParse { path, source: e })
}

impl Config {
    /// Look up a company display name, rejecting unknown codes before any file I/O.
    pub fn company_name(&self, code: &str) -> Result<&str> {
        self.companies
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| PayrecError::UnknownCompany(code.to_string()))
    }
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[import]
# Directory holding the processor CSV exports. Files are discovered per
# company by filename prefix, e.g. cgge_2025_07.csv. Files with "_backup"
# in the name are ignored. The PAYREC_CSV_DIR environment variable
# overrides this value.
csv_dir = "csv_data"

[fees]
# Blended rate used to estimate a missing fee on charges/payments.
estimate_rate = 0.042

[reporting]
# Transfers landing up to this many days after the 28th of the statement
# month are treated as still in transit and excluded from the displayed
# closing balance.
settlement_grace_days = 4

# Company code -> display name. The code is also the CSV filename prefix.
[companies]
cgge = "CGGE"
ki = "Krystal Institute"
kt = "Krystal Technology"

# Verified historical totals checked by the regression guard. Mismatches
# are reported as warnings, never errors.
[[expected_totals]]
company = "cgge"
year = 2025
month = 7
total_paid_out = 2636.78
ending_balance = 554.77
"#;
