//! Value Assessment CLI
//!
//! Evaluates a study directory and writes the cash-flow ledgers as CSV and
//! the summary metrics as JSON

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;

use value_assessment::study::DEFAULT_STUDY_PATH;
use value_assessment::{
    CashflowInfo, CashflowLedger, Currency, DiscountMode, HypothesisSummary, StudyRunner,
};

#[derive(Parser, Debug)]
#[command(name = "value_assessment")]
#[command(version)]
#[command(about = "Cash-flow, P&L and return projections for manufactured product lines")]
struct Args {
    /// Study directory containing study.json and its CSV tables
    #[arg(short, long, default_value = DEFAULT_STUDY_PATH)]
    study: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Also write summary.json
    #[arg(long)]
    json: bool,

    /// Discount at the equivalent quarterly rate instead of the yearly WACC
    #[arg(long)]
    quarterly: bool,

    /// Report in this currency (USD or EUR) instead of the study's
    #[arg(long)]
    currency: Option<Currency>,

    /// Only evaluate the named product
    #[arg(short, long)]
    product: Option<String>,
}

fn write_ledger(path: &Path, ledger: &CashflowLedger) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    ledger
        .write_csv(file)
        .with_context(|| format!("writing {}", path.display()))
}

fn print_info(label: &str, info: &CashflowInfo) {
    let irr = match info.irr {
        Some(rate) => format!("{:.2}%", rate * 100.0),
        None => "n/a".to_string(),
    };
    let year = |y: Option<i32>| y.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string());
    println!(
        "{:<20} {:>16.2} {:>9} {:>10} {:>10} {:>16.2}",
        label,
        info.npv,
        irr,
        year(info.year_break_even_cashflow),
        year(info.year_break_even_discounted_cashflow),
        info.peak_exposure,
    );
}

/// Summary metrics with the IRR flattened to a number (-99999 when absent)
fn summary_entry(info: &CashflowInfo, hypothesis: &HypothesisSummary) -> serde_json::Value {
    json!({
        "irr": info.irr_value(),
        "npv": info.npv,
        "year_break_even_cashflow": info.year_break_even_cashflow,
        "year_break_even_discounted_cashflow": info.year_break_even_discounted_cashflow,
        "peak_exposure": info.peak_exposure,
        "total_free_cash_flow": info.total_free_cash_flow,
        "hypothesis": hypothesis,
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut runner = StudyRunner::from_dir(&args.study)?;
    if args.quarterly {
        runner = runner.with_discount_mode(DiscountMode::Quarterly);
    }
    let rate = runner.study().exchange_rate();
    let currency = args.currency.unwrap_or(runner.study().currency);

    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;

    println!("Value Assessment v{}", env!("CARGO_PKG_VERSION"));
    println!("Study: {} ({})", args.study.display(), runner.horizon());
    println!();
    println!(
        "{:<20} {:>16} {:>9} {:>10} {:>10} {:>16}",
        "Product", "NPV", "IRR", "Break-even", "Disc. BE", "Peak exposure"
    );
    println!("{}", "-".repeat(86));

    if let Some(name) = &args.product {
        let from = runner.study().currency;
        let valuation = runner.run_named(name)?.converted(&rate, from, currency);
        print_info(&valuation.name, &valuation.info);
        write_ledger(&args.output.join(format!("{}_cashflow.csv", valuation.name)), &valuation.ledger)?;

        if args.json {
            let mut products = serde_json::Map::new();
            products.insert(
                valuation.name.clone(),
                summary_entry(&valuation.info, &valuation.hypothesis),
            );
            let summary = json!({
                "currency": currency,
                "products": products,
            });
            write_json(&args.output.join("summary.json"), &summary)?;
        }
    } else {
        let portfolio = runner.run()?.in_currency(&rate, currency);
        for valuation in &portfolio.products {
            print_info(&valuation.name, &valuation.info);
            write_ledger(&args.output.join(format!("{}_cashflow.csv", valuation.name)), &valuation.ledger)?;
        }
        println!("{}", "-".repeat(86));
        print_info("portfolio", &portfolio.info);
        write_ledger(&args.output.join("portfolio_cashflow.csv"), &portfolio.ledger)?;

        if args.json {
            let products: serde_json::Map<String, serde_json::Value> = portfolio
                .products
                .iter()
                .map(|p| {
                    (
                        p.name.clone(),
                        summary_entry(&p.info, &p.hypothesis),
                    )
                })
                .collect();
            let summary = json!({
                "currency": currency,
                "products": products,
                "portfolio": summary_entry(&portfolio.info, &portfolio.hypothesis),
            });
            write_json(&args.output.join("summary.json"), &summary)?;
        }
    }

    println!("\nResults written to: {}", args.output.display());
    Ok(())
}

fn write_json(path: &Path, value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
