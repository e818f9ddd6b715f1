use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tabled::{settings::Style, Table, Tabled};
use tracing_subscriber::EnvFilter;

use payrec::config::{self, config_dir, load_config, Config, CONFIG_TEMPLATE};
use payrec::engine::{
    build_payout_reconciliation, guard, month_bounds, write_statement_csv, Classifier,
    FeeEstimator, LedgerBuilder, MonthlyStatement, Normalizer, PayoutReconciliation,
    SettlementWindow, Transaction,
};
use payrec::error::{PayrecError, Result};

#[derive(Parser)]
#[command(name = "payrec")]
#[command(version, about = "Ledger statements and payout reconciliation from processor CSV exports", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.payrec or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// List configured companies
    Companies,

    /// Build and print a monthly ledger statement
    Statement {
        /// Company code from config.toml
        #[arg(short, long)]
        company: String,

        /// Statement period as YYYY-MM (e.g., 2025-07)
        #[arg(short, long)]
        period: String,

        /// Override the opening balance instead of recomputing it
        #[arg(long)]
        opening: Option<String>,

        /// Print the statement as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Build and print a payout reconciliation report
    Reconcile {
        /// Company code from config.toml
        #[arg(short, long)]
        company: String,

        /// Report period as YYYY-MM (e.g., 2025-07)
        #[arg(short, long)]
        period: String,

        /// Print the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Export a monthly statement as CSV
    Export {
        /// Company code from config.toml
        #[arg(short, long)]
        company: String,

        /// Statement period as YYYY-MM (e.g., 2025-07)
        #[arg(short, long)]
        period: String,

        /// Output CSV file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Show configuration and per-company import summary
    Status,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Companies => cmd_companies(&cfg_dir),
        Commands::Statement {
            company,
            period,
            opening,
            json,
        } => cmd_statement(&cfg_dir, &company, &period, opening, json),
        Commands::Reconcile {
            company,
            period,
            json,
        } => cmd_reconcile(&cfg_dir, &company, &period, json),
        Commands::Export {
            company,
            period,
            output,
        } => cmd_export(&cfg_dir, &company, &period, &output),
        Commands::Status => cmd_status(&cfg_dir),
    }
}

/// Initialize config directory with a template config.toml
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(PayrecError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::create_dir_all(cfg_dir.join("csv_data"))?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized payrec config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit companies and import settings:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!(
        "  2. Drop processor CSV exports into:     {}/csv_data",
        cfg_dir.display()
    );
    println!();
    println!("Then build your first statement:");
    println!("  payrec statement --company <code> --period <YYYY-MM>");

    Ok(())
}

// Table row structs for tabled
#[derive(Tabled)]
struct CompanyRow {
    #[tabled(rename = "CODE")]
    code: String,
    #[tabled(rename = "NAME")]
    name: String,
}

#[derive(Tabled)]
struct LineRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "NATURE")]
    nature: String,
    #[tabled(rename = "PARTY")]
    party: String,
    #[tabled(rename = "DEBIT")]
    debit: String,
    #[tabled(rename = "CREDIT")]
    credit: String,
    #[tabled(rename = "BALANCE")]
    balance: String,
}

#[derive(Tabled)]
struct BucketRow {
    #[tabled(rename = "BUCKET")]
    bucket: String,
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "COUNT")]
    count: usize,
    #[tabled(rename = "GROSS")]
    gross: String,
    #[tabled(rename = "FEES")]
    fees: String,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "CODE")]
    code: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "FILES")]
    files: usize,
    #[tabled(rename = "TRANSACTIONS")]
    transactions: usize,
}

/// List configured companies
fn cmd_companies(cfg_dir: &Path) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(PayrecError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let config = load_config(cfg_dir)?;

    if config.companies.is_empty() {
        println!("No companies configured.");
        println!("Add companies to: {}/config.toml", cfg_dir.display());
        return Ok(());
    }

    let rows: Vec<CompanyRow> = config
        .companies
        .iter()
        .map(|(code, name)| CompanyRow {
            code: code.clone(),
            name: name.clone(),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");

    Ok(())
}

/// Build and print a monthly ledger statement
fn cmd_statement(
    cfg_dir: &Path,
    company: &str,
    period: &str,
    opening: Option<String>,
    json: bool,
) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(PayrecError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let config = load_config(cfg_dir)?;
    let (year, month) = parse_period(period)?;
    let opening_override = opening.map(|raw| parse_amount_arg(&raw)).transpose()?;

    let statement = build_statement(&config, cfg_dir, company, year, month, opening_override)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statement)?);
        return Ok(());
    }

    println!(
        "Monthly Statement: {} ({}-{:02})",
        statement.company_name, year, month
    );
    println!("{}", "-".repeat(50));

    if statement.lines.is_empty() {
        println!("No transactions in this period.");
    } else {
        let rows: Vec<LineRow> = statement
            .lines
            .iter()
            .map(|line| LineRow {
                date: line.date.to_string(),
                nature: line.nature.clone(),
                party: line.counterparty.clone(),
                debit: format_cell(line.debit),
                credit: format_cell(line.credit),
                balance: format_amount(line.balance),
            })
            .collect();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    println!();
    println!("Opening balance: {:>14}", format_amount(statement.opening_balance));
    println!("Total debits:    {:>14}", format_amount(statement.total_debit));
    println!("Total credits:   {:>14}", format_amount(statement.total_credit));
    println!("Closing balance: {:>14}", format_amount(statement.closing_balance));

    Ok(())
}

/// Build and print a payout reconciliation report
fn cmd_reconcile(cfg_dir: &Path, company: &str, period: &str, json: bool) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(PayrecError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let config = load_config(cfg_dir)?;
    let (year, month) = parse_period(period)?;

    let name = config.company_name(company)?.to_string();
    let transactions = load_transactions(&config, cfg_dir, company)?;
    let report = build_payout_reconciliation(company, &name, &transactions, year, month)?;
    let findings = guard::check(&config.expected_totals, &report);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        print_guard_findings(&report, &findings);
        return Ok(());
    }

    println!(
        "Payout Reconciliation: {} ({}-{:02})",
        report.company_name, year, month
    );
    println!("{}", "-".repeat(50));

    let table = Table::new(bucket_rows(&report))
        .with(Style::rounded())
        .to_string();
    println!("{table}");

    println!();
    println!(
        "Total paid out ({} transfers): {:>14}",
        report.paid_out_transactions.len(),
        format_amount(report.total_paid_out)
    );
    println!(
        "Ending balance ({} pending):   {:>14}",
        report.ending_transactions.len(),
        format_amount(report.ending_balance)
    );

    print_guard_findings(&report, &findings);

    Ok(())
}

fn bucket_rows(report: &PayoutReconciliation) -> Vec<BucketRow> {
    let mut rows = Vec::new();
    for (bucket, totals) in [("Paid out", &report.paid_out), ("Ending", &report.ending)] {
        rows.push(BucketRow {
            bucket: bucket.to_string(),
            kind: "Charges".to_string(),
            count: totals.charges.count,
            gross: format_amount(totals.charges.gross),
            fees: format_amount(totals.charges.fees),
        });
        rows.push(BucketRow {
            bucket: bucket.to_string(),
            kind: "Refunds".to_string(),
            count: totals.refunds.count,
            gross: format_amount(totals.refunds.gross),
            fees: String::new(),
        });
        rows.push(BucketRow {
            bucket: bucket.to_string(),
            kind: "Reversals".to_string(),
            count: totals.reversals.count,
            gross: format_amount(totals.reversals.gross),
            fees: String::new(),
        });
    }
    rows
}

fn print_guard_findings(report: &PayoutReconciliation, findings: &[guard::GuardFinding]) {
    for finding in findings {
        println!(
            "Warning: {} {}-{:02} {} expected {} but computed {}",
            report.company,
            report.year,
            report.month,
            finding.field,
            format_amount(finding.expected),
            format_amount(finding.actual)
        );
    }
}

/// Export a monthly statement as CSV
fn cmd_export(cfg_dir: &Path, company: &str, period: &str, output: &Path) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(PayrecError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let config = load_config(cfg_dir)?;
    let (year, month) = parse_period(period)?;

    let statement = build_statement(&config, cfg_dir, company, year, month, None)?;

    let file = std::fs::File::create(output)?;
    write_statement_csv(&statement, file)?;

    println!(
        "Exported {} ({}-{:02}) to {}",
        statement.company_name,
        year,
        month,
        output.display()
    );
    println!("  Lines:   {}", statement.lines.len());
    println!("  Closing: {}", format_amount(statement.closing_balance));

    Ok(())
}

/// Show configuration and per-company import summary
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(PayrecError::ConfigNotFound(cfg_dir.to_path_buf()));
    }

    let config = load_config(cfg_dir)?;
    let csv_dir = effective_csv_dir(&config, cfg_dir);

    println!("Payrec Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    if csv_dir.exists() {
        println!("CSV directory:    {}", csv_dir.display());
    } else {
        println!("CSV directory:    {} (missing)", csv_dir.display());
    }
    println!("Companies:        {}", config.companies.len());
    println!("Guard entries:    {}", config.expected_totals.len());

    let normalizer = Normalizer::new(csv_dir);
    let estimator = FeeEstimator::new(config.fees.estimate_rate);
    let rows: Vec<StatusRow> = config
        .companies
        .iter()
        .map(|(code, name)| {
            let files = normalizer.company_files(code).len();
            let candidates = normalizer.load_company(code).unwrap_or_default();
            let transactions = Classifier::new(code.clone(), estimator).classify_all(candidates);
            StatusRow {
                code: code.clone(),
                name: name.clone(),
                files,
                transactions: transactions.len(),
            }
        })
        .collect();

    if !rows.is_empty() {
        println!();
        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
    }

    Ok(())
}

/// Normalize and classify one company's full transaction history.
fn load_transactions(config: &Config, cfg_dir: &Path, company: &str) -> Result<Vec<Transaction>> {
    // Validates the company code before any file I/O.
    config.company_name(company)?;

    let normalizer = Normalizer::new(effective_csv_dir(config, cfg_dir));
    let candidates = normalizer.load_company(company)?;
    let classifier = Classifier::new(company, FeeEstimator::new(config.fees.estimate_rate));
    Ok(classifier.classify_all(candidates))
}

fn build_statement(
    config: &Config,
    cfg_dir: &Path,
    company: &str,
    year: i32,
    month: u32,
    opening_override: Option<Decimal>,
) -> Result<MonthlyStatement> {
    let name = config.company_name(company)?.to_string();
    let transactions = load_transactions(config, cfg_dir, company)?;
    let window = SettlementWindow::new(config.reporting.settlement_grace_days);
    LedgerBuilder::new(window).build(company, &name, &transactions, year, month, opening_override)
}

/// CSV directory resolution: explicit env override, else the configured
/// path relative to the config directory.
fn effective_csv_dir(config: &Config, cfg_dir: &Path) -> PathBuf {
    match std::env::var("PAYREC_CSV_DIR") {
        Ok(value) if !value.is_empty() => PathBuf::from(value),
        _ => config::resolve_csv_dir(&config.import.csv_dir, cfg_dir),
    }
}

fn parse_period(raw: &str) -> Result<(i32, u32)> {
    let Some((y, m)) = raw.split_once('-') else {
        return Err(PayrecError::InvalidPeriod(raw.to_string()));
    };
    let year: i32 = y
        .parse()
        .map_err(|_| PayrecError::InvalidPeriod(raw.to_string()))?;
    let month: u32 = m
        .parse()
        .map_err(|_| PayrecError::InvalidPeriod(raw.to_string()))?;
    month_bounds(year, month)?;
    Ok((year, month))
}

fn parse_amount_arg(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|_| PayrecError::InvalidAmount(raw.to_string()))
}

fn format_cell(value: Decimal) -> String {
    if value.is_zero() {
        String::new()
    } else {
        format_amount(value)
    }
}

/// Format a money amount with two decimal places and thousands separators
fn format_amount(value: Decimal) -> String {
    let rounded = format!("{value:.2}");
    let (whole, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let negative = whole.starts_with('-');
    let digits = whole.trim_start_matches('-');
    let grouped = format_grouped_int(digits.parse::<i64>().unwrap_or(0));

    if negative {
        format!("-{grouped}.{frac}")
    } else {
        format!("{grouped}.{frac}")
    }
}

fn format_grouped_int(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out.chars().rev().collect()
}
