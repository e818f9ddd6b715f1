pub mod config;
pub mod engine;
pub mod error;

pub use config::Config;
pub use engine::{MonthlyStatement, PayoutReconciliation, Transaction};
pub use error::{PayrecError, Result};
