//! Ledger builder: monthly statements with running balances, opening
//! balance by full recomputation, and the imminent-transfer closing
//! freeze.

use chrono::{Datelike, Duration, Months, NaiveDate};
use rust_decimal::Decimal;

use crate::engine::model::{LedgerLine, MonthlyStatement, Transaction};
use crate::error::{PayrecError, Result};

/// First and last day of a month, rejecting invalid periods before any
/// computation.
pub fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| PayrecError::InvalidPeriod(format!("{year}-{month:02}")))?;
    let end = start
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| PayrecError::InvalidPeriod(format!("{year}-{month:02}")))?;
    Ok((start, end))
}

/// Policy for transfers scheduled just after month-end: such funds are
/// not yet reported as closed in that month's statement. The boundary
/// (day 28 of the statement month plus a grace period) was matched
/// against the processor's observed payout schedule; it is isolated here
/// so it can be revisited on its own.
#[derive(Debug, Clone, Copy)]
pub struct SettlementWindow {
    grace_days: i64,
}

impl SettlementWindow {
    pub fn new(grace_days: i64) -> Self {
        Self { grace_days }
    }

    /// True when the transfer lands after the period end but no later
    /// than day 28 of that month plus the grace period.
    pub fn is_imminent(&self, transfer: NaiveDate, period_end: NaiveDate) -> bool {
        let anchor = period_end.with_day(28).unwrap_or(period_end);
        let cutoff = anchor + Duration::days(self.grace_days);
        transfer > period_end && transfer <= cutoff
    }
}

impl Default for SettlementWindow {
    fn default() -> Self {
        Self::new(4)
    }
}

pub struct LedgerBuilder {
    window: SettlementWindow,
}

impl LedgerBuilder {
    pub fn new(window: SettlementWindow) -> Self {
        Self { window }
    }

    /// Build the monthly statement for one company from its full
    /// transaction history.
    ///
    /// The opening balance, unless overridden, is the running balance of
    /// every transaction dated before the month — i.e. the previous
    /// month's closing balance by full recomputation, never a cached
    /// value. An empty month is a valid statement with opening ==
    /// closing.
    pub fn build(
        &self,
        company: &str,
        company_name: &str,
        transactions: &[Transaction],
        year: i32,
        month: u32,
        opening_override: Option<Decimal>,
    ) -> Result<MonthlyStatement> {
        let (start, end) = month_bounds(year, month)?;

        let opening = match opening_override {
            Some(value) => value,
            None => opening_balance(transactions, start),
        };

        let mut monthly: Vec<&Transaction> = transactions
            .iter()
            .filter(|tx| tx.date >= start && tx.date <= end)
            .collect();
        // Stable sort: ties keep original input order.
        monthly.sort_by_key(|tx| tx.date);

        let mut running = opening;
        let mut closing = opening;
        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;
        let mut lines = Vec::with_capacity(monthly.len());

        for tx in monthly {
            running += tx.balance_delta();
            total_debit += tx.debit;
            total_credit += tx.credit;

            // Imminent transfers still appear with their running balance
            // but leave the displayed closing untouched.
            let imminent = tx
                .transfer_date
                .map_or(false, |transfer| self.window.is_imminent(transfer, end));
            if !imminent {
                closing = running;
            }

            lines.push(LedgerLine {
                date: tx.date,
                nature: tx.nature.clone(),
                counterparty: tx.counterparty.clone(),
                debit: tx.debit,
                credit: tx.credit,
                balance: running,
                description: tx.description.clone(),
            });
        }

        Ok(MonthlyStatement {
            company: company.to_string(),
            company_name: company_name.to_string(),
            year,
            month,
            period_start: start,
            period_end: end,
            opening_balance: opening,
            closing_balance: closing,
            total_debit,
            total_credit,
            lines,
        })
    }
}

/// Running balance of the full history strictly before `start`.
fn opening_balance(transactions: &[Transaction], start: NaiveDate) -> Decimal {
    transactions
        .iter()
        .filter(|tx| tx.date < start)
        .map(Transaction::balance_delta)
        .sum()
}
