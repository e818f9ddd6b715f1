use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PayrecError {
    #[error("Config directory not found at {0}. Run 'payrec init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Company '{0}' not found in config.toml. Run 'payrec companies' to list codes.")]
    UnknownCompany(String),

    #[error("Invalid period '{0}'. Expected YYYY-MM (e.g., 2025-07)")]
    InvalidPeriod(String),

    #[error("Invalid amount '{0}'. Expected a decimal number (e.g., 1234.56)")]
    InvalidAmount(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PayrecError>;
