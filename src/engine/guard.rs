//! Regression guard: compares computed reconciliation totals for known
//! historical periods against verified values from the config table.
//! Upstream export formats drift silently; this is a tripwire, not a
//! correctness proof, so mismatches warn and never fail.

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::ExpectedTotals;
use crate::engine::model::PayoutReconciliation;

/// One detected mismatch, already logged at warn level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardFinding {
    pub field: &'static str,
    pub expected: Decimal,
    pub actual: Decimal,
}

fn tolerance() -> Decimal {
    // One cent.
    Decimal::new(1, 2)
}

/// Check a report against every matching expectation row.
pub fn check(expectations: &[ExpectedTotals], report: &PayoutReconciliation) -> Vec<GuardFinding> {
    let mut findings = Vec::new();
    for expected in expectations.iter().filter(|e| {
        e.company == report.company && e.year == report.year && e.month == report.month
    }) {
        if let Some(finding) = compare(report, "total_paid_out", expected.total_paid_out, report.total_paid_out) {
            findings.push(finding);
        }
        if let Some(finding) = compare(report, "ending_balance", expected.ending_balance, report.ending_balance) {
            findings.push(finding);
        }
    }
    findings
}

fn compare(
    report: &PayoutReconciliation,
    field: &'static str,
    expected: Decimal,
    actual: Decimal,
) -> Option<GuardFinding> {
    if (expected - actual).abs() <= tolerance() {
        return None;
    }
    warn!(
        "regression guard: {} {}-{:02} {field} expected {expected}, got {actual}",
        report.company, report.year, report.month
    );
    Some(GuardFinding {
        field,
        expected,
        actual,
    })
}
