//! Check command - run the checklist and reconciliation on one NF-e file.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use console::style;
use rust_decimal::Decimal;
use tracing::{debug, info};

use nfe_rtc::core::{ReportBundle, Severity, Status, format_amount};
use nfe_rtc::export::{CsvSheets, export_bundle, to_json};
use nfe_rtc::nfe;

use super::config::load;

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// NF-e XML file (nfeProc or NFe)
    #[arg(required = true)]
    input: PathBuf,

    /// IBS rate in percent
    #[arg(long)]
    ibs_rate: Option<Decimal>,

    /// CBS rate in percent
    #[arg(long)]
    cbs_rate: Option<Decimal>,

    /// Accepted absolute deviation
    #[arg(long)]
    tolerance: Option<Decimal>,

    /// Deviation up to which a mismatch is only a warning
    #[arg(long)]
    warning_tolerance: Option<Decimal>,

    /// Treat missing IBS/CBS tags as failures
    #[arg(long)]
    mandatory: bool,

    /// Also check issuance metadata (environment, parties)
    #[arg(long)]
    header_checks: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Output file (json) or directory (csv); default: stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Exit with an error when any check fails
    #[arg(long)]
    strict: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text summary
    Text,
    /// JSON report bundle
    Json,
    /// QuadroResumo and Checklist sheets
    Csv,
}

pub fn run(args: CheckArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load(config_path)?;
    if let Some(rate) = args.ibs_rate {
        config.ibs_rate = rate;
    }
    if let Some(rate) = args.cbs_rate {
        config.cbs_rate = rate;
    }
    if let Some(t) = args.tolerance {
        config.tolerance = t;
        if config.warning_tolerance < t {
            config.warning_tolerance = t;
        }
    }
    if let Some(t) = args.warning_tolerance {
        config.warning_tolerance = t;
    }
    if args.mandatory {
        config.missing_tag_severity = Severity::Fail;
    }
    if args.header_checks {
        config.header_checks = true;
    }
    config.validate()?;
    debug!(?config, "effective configuration");

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }
    let data = fs::read(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let report = nfe::check_nfe_xml(&data, &config)
        .with_context(|| format!("{} was not accepted", args.input.display()))?;

    match args.format {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => {
            let json = to_json(&report)?;
            match &args.output {
                Some(path) => {
                    fs::write(path, json)?;
                    println!(
                        "{} Report written to {}",
                        style("✓").green(),
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
        }
        OutputFormat::Csv => {
            let mut sink = CsvSheets::new();
            export_bundle(&report, &mut sink)?;
            match &args.output {
                Some(dir) => {
                    for path in sink.write_to_dir(dir)? {
                        println!("{} Sheet written to {}", style("✓").green(), path.display());
                    }
                }
                None => {
                    for sheet in sink.sheets() {
                        println!("# {}", sheet.name);
                        print!("{}", sheet.content);
                    }
                }
            }
        }
    }

    let counts = report.status_counts();
    info!(
        pass = counts.pass,
        warning = counts.warning,
        fail = counts.fail,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "check finished"
    );

    if args.strict && counts.fail > 0 {
        anyhow::bail!("{} check(s) failed", counts.fail);
    }
    Ok(())
}

fn opt(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

fn amount(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), format_amount)
}

fn print_text(report: &ReportBundle) {
    let h = &report.header;
    println!(
        "{} NF-e {} série {} (modelo {}, tpAmb {})",
        style("ℹ").blue(),
        opt(h.number.as_deref()),
        opt(h.series.as_deref()),
        opt(h.model.as_deref()),
        opt(h.environment.as_deref()),
    );
    println!(
        "  {} item(s), vNF declarado {}",
        report.summary.len(),
        amount(report.declared_invoice_total)
    );
    println!();

    println!(
        "{:>5}  {:<14} {:<10} {:>5} {:>12} {:>10} {:>10} {:>12}",
        "Item", "cProd", "NCM", "CST", "vBC", "vIBS", "vCBS", "Total"
    );
    for row in &report.summary {
        println!(
            "{:>5}  {:<14} {:<10} {:>5} {:>12} {:>10} {:>10} {:>12}",
            row.order,
            opt(row.product_code.as_deref()),
            opt(row.ncm.as_deref()),
            opt(row.ibs_cst.as_deref()),
            amount(row.ibs_cbs_base),
            amount(row.ibs_value),
            amount(row.cbs_value),
            amount(row.item_total),
        );
    }
    let t = &report.summary_totals;
    println!(
        "{:>5}  {:<14} {:<10} {:>5} {:>12} {:>10} {:>10} {:>12}",
        "TOTAL",
        "",
        "",
        "",
        amount(t.ibs_base),
        amount(t.ibs_value),
        amount(t.cbs_value),
        amount(t.item_total),
    );
    println!();

    for result in &report.checklist {
        let symbol = match result.status {
            Status::Pass => style(result.status.symbol()).green(),
            Status::Warning => style(result.status.symbol()).yellow(),
            Status::Fail => style(result.status.symbol()).red(),
        };
        println!(
            "{symbol} {:<10} {:<20} {}",
            nfe_rtc::core::report::group_label(result),
            result.check.code(),
            result.message
        );
    }

    let counts = report.status_counts();
    println!();
    println!(
        "{} pass, {} warning, {} fail",
        style(counts.pass).green(),
        style(counts.warning).yellow(),
        style(counts.fail).red()
    );
}
