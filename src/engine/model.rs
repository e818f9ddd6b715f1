use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// Transaction kind. `Fee` entries are synthetic: the classifier creates
/// them (id `<source-id>_fee`) when a charge or payment carries an
/// itemized fee, and itemized balance-change exports can also carry
/// standalone fee lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    Charge,
    Payment,
    Refund,
    Payout,
    PayoutFailure,
    Fee,
}

impl TxKind {
    /// Map a source type/category label to a kind.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "charge" => Some(TxKind::Charge),
            "payment" => Some(TxKind::Payment),
            "refund" => Some(TxKind::Refund),
            "payout" => Some(TxKind::Payout),
            "payout_failure" | "payout failure" => Some(TxKind::PayoutFailure),
            "fee" | "stripe_fee" => Some(TxKind::Fee),
            _ => None,
        }
    }

    /// Fall back to the processor's id prefix when no type label is present.
    pub fn from_id_prefix(id: &str) -> Option<Self> {
        if id.starts_with("ch_") {
            Some(TxKind::Charge)
        } else if id.starts_with("py_") || id.starts_with("pi_") {
            Some(TxKind::Payment)
        } else if id.starts_with("re_") || id.starts_with("pyr_") {
            Some(TxKind::Refund)
        } else if id.starts_with("po_") {
            Some(TxKind::Payout)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxStatus {
    Succeeded,
    Refunded,
    Failed,
}

/// Where a transaction came from, for audit trails and skip logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub file: String,
    /// 1-based data row number within the file (header excluded).
    pub line: u64,
}

/// The canonical, normalized transaction. `gross == fee + net` holds for
/// every transaction that survives classification; `debit` and `credit`
/// are the derived posting amounts, exactly one of which is nonzero
/// (both zero only for a zero-amount transaction).
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: String,
    pub company: String,
    pub kind: TxKind,
    pub status: TxStatus,
    /// Drives monthly statement bucketing.
    pub date: NaiveDate,
    /// When funds moved (or will move) to the bank; drives reconciliation.
    pub transfer_date: Option<NaiveDate>,
    pub currency: String,
    pub gross: Decimal,
    pub fee: Decimal,
    pub net: Decimal,
    pub debit: Decimal,
    pub credit: Decimal,
    /// Human posting label, e.g. "Gross Payment", "Processing Fee", "Payout".
    pub nature: String,
    pub counterparty: String,
    pub description: String,
    pub source: SourceRef,
}

impl Transaction {
    /// Net effect of this posting on the running balance. Debits increase
    /// the balance (funds received), credits decrease it (funds removed).
    pub fn balance_delta(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// One posting within a statement. Exactly one of debit/credit is nonzero.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerLine {
    pub date: NaiveDate,
    pub nature: String,
    pub counterparty: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyStatement {
    pub company: String,
    pub company_name: String,
    pub year: i32,
    pub month: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub opening_balance: Decimal,
    /// Displayed closing balance: frozen at the last posting whose
    /// transfer date is not in the imminent-future window.
    pub closing_balance: Decimal,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub lines: Vec<LedgerLine>,
}

/// Per-kind aggregate within one reconciliation bucket. Fees are summed
/// as positive magnitudes regardless of posting sign; refund gross stays
/// signed (negative).
#[derive(Debug, Clone, Default, Serialize)]
pub struct KindTotals {
    pub count: usize,
    pub gross: Decimal,
    pub fees: Decimal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BucketTotals {
    pub charges: KindTotals,
    pub refunds: KindTotals,
    pub reversals: KindTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayoutReconciliation {
    pub company: String,
    pub company_name: String,
    pub year: i32,
    pub month: u32,
    /// Transfer date within the month: funds that actually hit the bank.
    pub paid_out: BucketTotals,
    pub total_paid_out: Decimal,
    /// Transfer date after the month: funds attributable to a future payout.
    pub ending: BucketTotals,
    pub ending_balance: Decimal,
    pub paid_out_transactions: Vec<Transaction>,
    pub ending_transactions: Vec<Transaction>,
}
