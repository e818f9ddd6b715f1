//! Transaction classifier: kind/status assignment, fee estimation and
//! itemized-fee splitting, posting generation, counterparty extraction.
//!
//! Sign convention, fixed across the whole engine: debits increase the
//! running balance (funds received), credits decrease it (funds removed
//! from the processor balance).

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::engine::model::{Transaction, TxKind, TxStatus};
use crate::engine::normalize::RowCandidate;

/// Counterparty label for processor-side postings (fees, payouts).
const PROCESSOR_PARTY: &str = "Processor";

const COUNTERPARTY_MAX: usize = 50;

/// Estimates a missing fee from the configured blended rate. Kept as a
/// standalone strategy so the rate (and the heuristic itself) can be
/// swapped without touching classification.
#[derive(Debug, Clone, Copy)]
pub struct FeeEstimator {
    rate: Decimal,
}

impl FeeEstimator {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }

    pub fn estimate(&self, gross: Decimal) -> Decimal {
        (gross * self.rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// One source row's classified output: the primary transaction plus, for
/// charges/payments with an itemized fee, a synthetic fee entry. This is
/// the explicit one-row-to-1..2-postings relationship.
#[derive(Debug, Clone)]
pub struct Classified {
    pub primary: Transaction,
    pub fee: Option<Transaction>,
}

impl Classified {
    pub fn into_transactions(self) -> impl Iterator<Item = Transaction> {
        std::iter::once(self.primary).chain(self.fee)
    }
}

pub struct Classifier {
    company: String,
    fees: FeeEstimator,
}

impl Classifier {
    pub fn new(company: impl Into<String>, fees: FeeEstimator) -> Self {
        Self {
            company: company.into(),
            fees,
        }
    }

    pub fn classify_all(&self, candidates: Vec<RowCandidate>) -> Vec<Transaction> {
        candidates
            .into_iter()
            .filter_map(|candidate| self.classify(candidate))
            .flat_map(Classified::into_transactions)
            .collect()
    }

    /// Classify one candidate, or drop it (`None`) when it cannot affect
    /// any balance: unknown kind, or a status outside the retained set.
    pub fn classify(&self, c: RowCandidate) -> Option<Classified> {
        let kind = match TxKind::from_label(&c.kind_label).or_else(|| TxKind::from_id_prefix(&c.id))
        {
            Some(kind) => kind,
            None => {
                debug!(
                    "{}:{}: dropping '{}': unrecognized kind '{}'",
                    c.source.file, c.source.line, c.id, c.kind_label
                );
                return None;
            }
        };

        // Rows with no usable amount parse to zero upstream; they carry no
        // balance information and never reach a statement or report.
        if c.gross.is_zero() {
            debug!(
                "{}:{}: dropping '{}': zero amount",
                c.source.file, c.source.line, c.id
            );
            return None;
        }

        let status = match resolve_status(kind, c.status_label.as_deref()) {
            Some(status) => status,
            None => {
                debug!(
                    "{}:{}: dropping '{}': status '{}' does not affect balance",
                    c.source.file,
                    c.source.line,
                    c.id,
                    c.status_label.as_deref().unwrap_or("")
                );
                return None;
            }
        };

        let gross = c.gross;
        let mut fee = c.fee.abs();
        let mut estimated = false;
        if matches!(kind, TxKind::Charge | TxKind::Payment)
            && fee.is_zero()
            && gross > Decimal::ZERO
        {
            fee = self.fees.estimate(gross);
            estimated = true;
        }
        if !matches!(kind, TxKind::Charge | TxKind::Payment) {
            fee = Decimal::ZERO;
        }
        let net = gross - fee;

        // Itemized fees split into a gross debit plus a synthetic fee
        // credit; estimated fees stay folded into a single net posting.
        // Negative-gross rows never split: they fold into one net credit.
        let split = matches!(kind, TxKind::Charge | TxKind::Payment)
            && !estimated
            && fee > Decimal::ZERO
            && gross > Decimal::ZERO;

        let (debit, credit, nature) = match kind {
            TxKind::Charge | TxKind::Payment => {
                let gross_label = if kind == TxKind::Charge {
                    "Gross Charge"
                } else {
                    "Gross Payment"
                };
                let net_label = if kind == TxKind::Charge {
                    "Charge"
                } else {
                    "Payment"
                };
                if split {
                    (gross, Decimal::ZERO, gross_label)
                } else if net >= Decimal::ZERO {
                    (net, Decimal::ZERO, net_label)
                } else {
                    (Decimal::ZERO, -net, net_label)
                }
            }
            TxKind::Refund => (Decimal::ZERO, gross.abs(), "Refund"),
            TxKind::Payout => (Decimal::ZERO, gross.abs(), "Payout"),
            TxKind::PayoutFailure => {
                let label = if c.description.to_uppercase().contains("REFUND FOR PAYOUT") {
                    "Payout Reversal"
                } else {
                    "Payout Failure"
                };
                (gross.abs(), Decimal::ZERO, label)
            }
            TxKind::Fee => (Decimal::ZERO, gross.abs(), "Processing Fee"),
        };

        let counterparty = match kind {
            TxKind::Payout | TxKind::PayoutFailure | TxKind::Fee => PROCESSOR_PARTY.to_string(),
            _ => extract_counterparty(&c),
        };

        let fee_entry = split.then(|| Transaction {
            id: format!("{}_fee", c.id),
            company: self.company.clone(),
            kind: TxKind::Fee,
            status: TxStatus::Succeeded,
            date: c.date,
            transfer_date: c.transfer_date,
            currency: c.currency.clone(),
            gross: Decimal::ZERO,
            fee,
            net: -fee,
            debit: Decimal::ZERO,
            credit: fee,
            nature: "Processing Fee".to_string(),
            counterparty: PROCESSOR_PARTY.to_string(),
            description: format!("Processing fee for {}", c.id),
            source: c.source.clone(),
        });

        let primary = Transaction {
            id: c.id,
            company: self.company.clone(),
            kind,
            status,
            date: c.date,
            transfer_date: c.transfer_date,
            currency: c.currency,
            gross,
            fee,
            net,
            debit,
            credit,
            nature: nature.to_string(),
            counterparty,
            description: c.description,
            source: c.source,
        };

        Some(Classified {
            primary,
            fee: fee_entry,
        })
    }
}

/// Kind-specific status mapping. `None` means the transaction does not
/// affect any balance and is excluded from everything downstream.
fn resolve_status(kind: TxKind, status_label: Option<&str>) -> Option<TxStatus> {
    match kind {
        TxKind::Charge | TxKind::Payment => match status_label {
            None | Some("paid") | Some("succeeded") | Some("available") => {
                Some(TxStatus::Succeeded)
            }
            Some("refunded") => Some(TxStatus::Refunded),
            Some(_) => None,
        },
        TxKind::Refund => Some(TxStatus::Refunded),
        TxKind::Payout | TxKind::Fee => Some(TxStatus::Succeeded),
        TxKind::PayoutFailure => Some(TxStatus::Failed),
    }
}

/// Counterparty extraction priority: explicit customer metadata, then an
/// email found in the free-text description, then the truncated
/// description itself.
fn extract_counterparty(c: &RowCandidate) -> String {
    if let Some(email) = &c.email {
        return email.clone();
    }
    if let Some(user_id) = &c.customer_id {
        return format!("User {user_id}");
    }
    if let Some(email) = find_email(&c.description) {
        return email;
    }
    truncate(&c.description, COUNTERPARTY_MAX)
}

fn find_email(text: &str) -> Option<String> {
    text.split(|ch: char| {
        ch.is_whitespace() || matches!(ch, ',' | ';' | '(' | ')' | '<' | '>' | '"')
    })
    .map(|token| token.trim_matches(|ch: char| matches!(ch, '.' | ':' | '\'')))
    .find(|token| looks_like_email(token))
    .map(str::to_string)
}

fn looks_like_email(token: &str) -> bool {
    let Some((local, domain)) = token.split_once('@') else {
        return false;
    };
    if local.is_empty() || !domain.contains('.') {
        return false;
    }
    domain
        .rsplit('.')
        .next()
        .map_or(false, |tld| tld.len() >= 2 && tld.chars().all(|ch| ch.is_ascii_alphabetic()))
}

fn truncate(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return "Unknown".to_string();
    }
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}
