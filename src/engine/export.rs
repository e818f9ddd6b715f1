//! Flat tabular projection of a monthly statement, suitable for CSV
//! re-export. Opening and closing balances are synthesized as the first
//! and last rows with fixed labels.

use serde::Serialize;
use std::io::Write;

use crate::engine::model::MonthlyStatement;
use crate::error::Result;

#[derive(Debug, Serialize)]
pub struct StatementRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Nature")]
    pub nature: String,
    #[serde(rename = "Party")]
    pub party: String,
    #[serde(rename = "Debit")]
    pub debit: String,
    #[serde(rename = "Credit")]
    pub credit: String,
    #[serde(rename = "Balance")]
    pub balance: String,
    #[serde(rename = "Description")]
    pub description: String,
}

fn cell(value: rust_decimal::Decimal) -> String {
    if value.is_zero() {
        String::new()
    } else {
        format!("{value:.2}")
    }
}

/// Project a statement into ordered rows with synthesized balance rows.
pub fn statement_rows(statement: &MonthlyStatement) -> Vec<StatementRow> {
    let mut rows = Vec::with_capacity(statement.lines.len() + 2);

    rows.push(StatementRow {
        date: statement.period_start.to_string(),
        nature: "Opening Balance".to_string(),
        party: "Brought Forward".to_string(),
        debit: String::new(),
        credit: String::new(),
        balance: format!("{:.2}", statement.opening_balance),
        description: String::new(),
    });

    for line in &statement.lines {
        rows.push(StatementRow {
            date: line.date.to_string(),
            nature: line.nature.clone(),
            party: line.counterparty.clone(),
            debit: cell(line.debit),
            credit: cell(line.credit),
            balance: format!("{:.2}", line.balance),
            description: line.description.clone(),
        });
    }

    rows.push(StatementRow {
        date: statement.period_end.to_string(),
        nature: "Closing Balance".to_string(),
        party: "Carry Forward".to_string(),
        debit: String::new(),
        credit: String::new(),
        balance: format!("{:.2}", statement.closing_balance),
        description: String::new(),
    });

    rows
}

/// Write the projection as CSV.
pub fn write_statement_csv<W: Write>(statement: &MonthlyStatement, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in statement_rows(statement) {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
