//! Record normalizer: discovers per-company CSV exports and maps their
//! heterogeneous row shapes into canonical transaction candidates.
//!
//! All failures here are row- or file-scoped: a malformed row is logged
//! and skipped, an unreadable file is logged and the rest of the batch
//! still imports. Nothing in this module aborts a run.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::engine::model::SourceRef;
use crate::error::Result;

/// A normalized row, not yet classified. Amounts are rounded to 2
/// fractional digits half-up; dates are parsed or the row was rejected.
#[derive(Debug, Clone)]
pub struct RowCandidate {
    pub id: String,
    /// Source type/category label ("charge", "refund", ...); may be empty,
    /// in which case classification falls back to the id prefix.
    pub kind_label: String,
    /// Raw status column, lowercased, when the layout carries one.
    pub status_label: Option<String>,
    pub date: NaiveDate,
    pub transfer_date: Option<NaiveDate>,
    pub currency: String,
    pub gross: Decimal,
    pub fee: Decimal,
    pub email: Option<String>,
    pub customer_id: Option<String>,
    pub description: String,
    pub source: SourceRef,
}

/// Known export layouts, detected per file by characteristic headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    /// Unified payments export ("Created date (UTC)" present).
    Unified,
    /// Itemized balance-change export ("balance_transaction_id" present).
    BalanceChange,
    /// Anything else: best-effort column aliases.
    Generic,
}

fn detect_layout(headers: &HashMap<String, usize>) -> Layout {
    if headers.contains_key("created date (utc)") {
        Layout::Unified
    } else if headers.contains_key("balance_transaction_id") {
        Layout::BalanceChange
    } else {
        Layout::Generic
    }
}

pub struct Normalizer {
    csv_dir: PathBuf,
}

impl Normalizer {
    /// The CSV directory is an explicit constructor argument; there is no
    /// path probing here.
    pub fn new(csv_dir: impl Into<PathBuf>) -> Self {
        Self {
            csv_dir: csv_dir.into(),
        }
    }

    /// Export files belonging to a company: `<code>_*.csv`, backups
    /// excluded, in sorted filename order for deterministic output.
    pub fn company_files(&self, code: &str) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.csv_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "cannot read CSV directory {}: {e}",
                    self.csv_dir.display()
                );
                return Vec::new();
            }
        };

        let prefix = format!("{code}_");
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    return false;
                };
                name.starts_with(&prefix) && name.ends_with(".csv") && !name.contains("_backup")
            })
            .collect();
        files.sort();
        files
    }

    /// Normalize every row of every export file for one company.
    pub fn load_company(&self, code: &str) -> Result<Vec<RowCandidate>> {
        let mut candidates = Vec::new();
        for path in self.company_files(code) {
            if let Err(e) = self.read_file(&path, &mut candidates) {
                warn!("skipping file {}: {e}", path.display());
            }
        }
        Ok(candidates)
    }

    fn read_file(&self, path: &Path, out: &mut Vec<RowCandidate>) -> Result<()> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

        let headers: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_lowercase(), idx))
            .collect();
        let layout = detect_layout(&headers);

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<unnamed>")
            .to_string();

        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("{file_name}: skipping malformed row: {e}");
                    continue;
                }
            };

            let source = SourceRef {
                file: file_name.clone(),
                line: record.position().map(|p| p.line()).unwrap_or(0),
            };

            match layout {
                Layout::Unified => parse_unified(&headers, &record, source, out),
                Layout::BalanceChange => parse_balance_change(&headers, &record, source, out),
                Layout::Generic => parse_generic(&headers, &record, source, out),
            }
        }

        Ok(())
    }
}

fn field<'r>(
    headers: &HashMap<String, usize>,
    record: &'r csv::StringRecord,
    name: &str,
) -> &'r str {
    headers
        .get(name)
        .and_then(|&idx| record.get(idx))
        .unwrap_or("")
        .trim()
}

/// First nonempty value among the given column aliases.
fn field_of<'r>(
    headers: &HashMap<String, usize>,
    record: &'r csv::StringRecord,
    names: &[&str],
) -> &'r str {
    names
        .iter()
        .map(|name| field(headers, record, name))
        .find(|value| !value.is_empty())
        .unwrap_or("")
}

/// Rows that summarize rather than record: never transactions.
fn is_summary_label(label: &str) -> bool {
    matches!(
        label.to_ascii_lowercase().as_str(),
        "automatic payout" | "automatic payouts" | "payout_summary" | "balance_summary" | "balance summary"
    )
}

fn parse_unified(
    headers: &HashMap<String, usize>,
    record: &csv::StringRecord,
    source: SourceRef,
    out: &mut Vec<RowCandidate>,
) {
    let id = field(headers, record, "id");
    if id.is_empty() {
        debug!("{}:{}: row without identifier", source.file, source.line);
        return;
    }

    let created_raw = field_of(headers, record, &["created date (utc)", "created (utc)"]);
    let Some(created) = parse_timestamp(created_raw) else {
        warn!(
            "{}:{}: rejecting row '{id}': unparseable date '{created_raw}'",
            source.file, source.line
        );
        return;
    };

    let status = field(headers, record, "status").to_lowercase();
    let gross = parse_amount(
        field_of(headers, record, &["converted amount", "amount"]),
        &source,
    );
    let fee = parse_amount(field(headers, record, "fee"), &source);
    let currency = normalize_currency(field_of(
        headers,
        record,
        &["converted currency", "currency"],
    ));
    let email = nonempty(field_of(
        headers,
        record,
        &[
            "customer email",
            "2. user email (metadata)",
            "user email (metadata)",
        ],
    ));
    let customer_id = nonempty(field_of(headers, record, &["userid (metadata)", "userid"]));
    let description = field(headers, record, "description").to_string();

    // The unified export carries no transfer date; the processor's
    // standard payout delay is close enough for reconciliation bucketing.
    let transfer_date = Some(created.date() + Duration::days(6));

    let refunded_amount = parse_amount(
        field_of(
            headers,
            record,
            &["converted amount refunded", "amount refunded"],
        ),
        &source,
    );

    out.push(RowCandidate {
        id: id.to_string(),
        kind_label: String::new(),
        status_label: nonempty(&status),
        date: created.date(),
        transfer_date,
        currency: currency.clone(),
        gross,
        fee,
        email: email.clone(),
        customer_id: customer_id.clone(),
        description: description.clone(),
        source: source.clone(),
    });

    // Refunded payments fan out into a companion refund row so the money
    // leaving the balance shows up in statements and reconciliation.
    if status == "refunded" && refunded_amount > Decimal::ZERO {
        let refund_ts = parse_timestamp(field(headers, record, "refunded date (utc)"))
            .unwrap_or(created);
        out.push(RowCandidate {
            id: format!("{id}_refund"),
            kind_label: "refund".to_string(),
            status_label: None,
            date: refund_ts.date(),
            transfer_date: Some(refund_ts.date() + Duration::days(2)),
            currency,
            gross: -refunded_amount,
            fee: Decimal::ZERO,
            email,
            customer_id,
            description: if description.is_empty() {
                format!("Refund of {id}")
            } else {
                format!("Refund: {description}")
            },
            source,
        });
    }
}

fn parse_balance_change(
    headers: &HashMap<String, usize>,
    record: &csv::StringRecord,
    source: SourceRef,
    out: &mut Vec<RowCandidate>,
) {
    let id = field(headers, record, "balance_transaction_id");
    if id.is_empty() {
        debug!("{}:{}: row without identifier", source.file, source.line);
        return;
    }

    let category = field(headers, record, "reporting_category");
    if is_summary_label(category) {
        debug!(
            "{}:{}: skipping summary row '{category}'",
            source.file, source.line
        );
        return;
    }

    let created_raw = field(headers, record, "created");
    let Some(created) = parse_timestamp(created_raw) else {
        warn!(
            "{}:{}: rejecting row '{id}': unparseable date '{created_raw}'",
            source.file, source.line
        );
        return;
    };

    let transfer_date = parse_day(field(headers, record, "transfer date (utc)"))
        .or_else(|| parse_day(field(headers, record, "available_on")))
        .or_else(|| Some(created.date() + Duration::days(2)));

    out.push(RowCandidate {
        id: id.to_string(),
        kind_label: category.to_string(),
        status_label: None,
        date: created.date(),
        transfer_date,
        currency: normalize_currency(field(headers, record, "currency")),
        gross: parse_amount(field(headers, record, "gross"), &source),
        fee: parse_amount(field(headers, record, "fee"), &source),
        email: nonempty(field(headers, record, "customer_email")),
        customer_id: None,
        description: field(headers, record, "description").to_string(),
        source,
    });
}

fn parse_generic(
    headers: &HashMap<String, usize>,
    record: &csv::StringRecord,
    source: SourceRef,
    out: &mut Vec<RowCandidate>,
) {
    let id = field_of(headers, record, &["id", "transaction_id", "payment_id"]);
    if id.is_empty() {
        debug!("{}:{}: row without identifier", source.file, source.line);
        return;
    }

    let type_label = field(headers, record, "type");
    if is_summary_label(type_label) {
        debug!(
            "{}:{}: skipping summary row '{type_label}'",
            source.file, source.line
        );
        return;
    }

    let created_raw = field_of(headers, record, &["created", "date", "timestamp"]);
    let Some(created) = parse_timestamp(created_raw) else {
        warn!(
            "{}:{}: rejecting row '{id}': unparseable date '{created_raw}'",
            source.file, source.line
        );
        return;
    };

    let kind_label = if !type_label.is_empty() {
        type_label.to_string()
    } else if crate::engine::model::TxKind::from_id_prefix(id).is_some() {
        String::new()
    } else {
        "payment".to_string()
    };

    let transfer_date = parse_day(field_of(
        headers,
        record,
        &["transfer date (utc)", "transfer_date"],
    ))
    .or_else(|| Some(created.date() + Duration::days(2)));

    out.push(RowCandidate {
        id: id.to_string(),
        kind_label,
        status_label: nonempty(&field(headers, record, "status").to_lowercase()),
        date: created.date(),
        transfer_date,
        currency: normalize_currency(field(headers, record, "currency")),
        gross: parse_amount(
            field_of(headers, record, &["amount", "gross", "total"]),
            &source,
        ),
        fee: parse_amount(
            field_of(headers, record, &["fee", "processing_fee"]),
            &source,
        ),
        email: nonempty(field_of(headers, record, &["customer email", "email"])),
        customer_id: nonempty(field_of(headers, record, &["customer_id", "user_id"])),
        description: field_of(headers, record, &["description", "memo"]).to_string(),
        source,
    });
}

fn nonempty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn normalize_currency(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "USD".to_string()
    } else {
        trimmed.to_uppercase()
    }
}

/// Single decimal-parsing routine for all amount fields: strips
/// formatting characters, rounds to 2 fractional digits half-up.
/// Unparseable amounts become zero rather than failing the row.
pub fn parse_amount(raw: &str, source: &SourceRef) -> Decimal {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, ',' | '$' | '"' | '\'' | ' '))
        .collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    match Decimal::from_str(&cleaned) {
        Ok(value) => value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        Err(_) => {
            warn!(
                "{}:{}: unparseable amount '{raw}', treating as zero",
                source.file, source.line
            );
            Decimal::ZERO
        }
    }
}

/// Parse a creation timestamp, tolerating second-less timestamps and
/// bare dates.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse a date-only field, accepting full timestamps as well.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|ts| ts.date())
}
