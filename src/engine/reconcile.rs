//! Payout reconciliation: partitions transactions by transfer date (not
//! transaction date) to answer "what actually hit the bank this month"
//! in the same shape as the processor's own payout report.

use rust_decimal::Decimal;

use crate::engine::ledger::month_bounds;
use crate::engine::model::{BucketTotals, PayoutReconciliation, Transaction, TxKind};
use crate::error::Result;

/// Build the reconciliation report for one company and month.
///
/// Transactions with a transfer date inside the month land in the
/// `paid_out` bucket; after the month, in `ending`. Transfers before the
/// month were reconciled in a prior period, and transactions without a
/// transfer date do not participate at all.
pub fn build_payout_reconciliation(
    company: &str,
    company_name: &str,
    transactions: &[Transaction],
    year: i32,
    month: u32,
) -> Result<PayoutReconciliation> {
    let (start, end) = month_bounds(year, month)?;

    let mut paid_out_txs: Vec<Transaction> = Vec::new();
    let mut ending_txs: Vec<Transaction> = Vec::new();
    for tx in transactions {
        let Some(transfer) = tx.transfer_date else {
            continue;
        };
        if transfer >= start && transfer <= end {
            paid_out_txs.push(tx.clone());
        } else if transfer > end {
            ending_txs.push(tx.clone());
        }
    }
    paid_out_txs.sort_by_key(|tx| (tx.transfer_date, tx.date));
    ending_txs.sort_by_key(|tx| (tx.transfer_date, tx.date));

    let paid_out = aggregate(&paid_out_txs);
    let ending = aggregate(&ending_txs);

    let total_paid_out =
        paid_out.charges.gross - paid_out.charges.fees + paid_out.refunds.gross
            + paid_out.reversals.gross;
    let ending_balance = ending.charges.gross - ending.charges.fees + ending.reversals.gross;

    Ok(PayoutReconciliation {
        company: company.to_string(),
        company_name: company_name.to_string(),
        year,
        month,
        paid_out,
        total_paid_out,
        ending,
        ending_balance,
        paid_out_transactions: paid_out_txs,
        ending_transactions: ending_txs,
    })
}

/// Per-kind sums within one bucket. Charges aggregate their debit
/// posting (gross when the fee is itemized, net when estimated); fee
/// entries contribute their credit as a positive magnitude; refund gross
/// stays signed.
fn aggregate(transactions: &[Transaction]) -> BucketTotals {
    let mut totals = BucketTotals::default();
    for tx in transactions {
        match tx.kind {
            TxKind::Charge | TxKind::Payment => {
                totals.charges.count += 1;
                totals.charges.gross += tx.debit;
            }
            TxKind::Fee => {
                totals.charges.fees += tx.credit.abs();
            }
            TxKind::Refund => {
                totals.refunds.count += 1;
                totals.refunds.gross += tx.gross;
            }
            TxKind::PayoutFailure => {
                totals.reversals.count += 1;
                totals.reversals.gross += tx.debit;
            }
            // Payouts are the transfers themselves, not a balance source;
            // they appear in the bucket's transaction list only.
            TxKind::Payout => {}
        }
    }
    totals
}
