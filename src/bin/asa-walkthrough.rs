#![forbid(unsafe_code)]
//! Runs the asset walkthrough against a fresh local network.

use asa_walkthrough::config::{load_config, load_config_from};
use asa_walkthrough::crypto::short_hex;
use asa_walkthrough::localnet::LocalNet;
use asa_walkthrough::logging::init_logging;
use asa_walkthrough::transaction::format_units;
use asa_walkthrough::walkthrough::{Walkthrough, WalkthroughReport};
use clap::Parser;
use colored::*;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Color as TableColor;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use std::path::PathBuf;

const BANNER: &str = r#"
╔═══════════════════════════════════════════════════════╗
║            🪙  Asset Walkthrough on LocalNet           ║
╚═══════════════════════════════════════════════════════╝
"#;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml if present)
    #[arg(long)]
    config: Option<PathBuf>,
    /// More log output; repeat for trace level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Only warnings and the final summary
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(&cli).await {
        eprintln!("{}", format!("❌ Walkthrough failed: {}", e).red().bold());
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    println!("{}", BANNER.bright_cyan());

    let net = LocalNet::new(&config);
    let report = Walkthrough::new(&net, &net, &config).run().await?;

    print_summary(&report);
    println!("{}", "✅ Walkthrough complete".bright_green().bold());
    Ok(())
}

fn print_summary(report: &WalkthroughReport) {
    let header = |text: &str| Cell::new(text).fg(TableColor::Cyan).add_attribute(Attribute::Bold);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![header("Step"), header("Result")]);

    table.add_row(vec![Cell::new("Alice"), Cell::new(short_hex(&report.alice))]);
    table.add_row(vec![Cell::new("Bob"), Cell::new(short_hex(&report.bob))]);
    table.add_row(vec![Cell::new("Asset id"), Cell::new(report.asset_id)]);

    let (transfer_text, transfer_color) = match &report.transfer_error {
        Some(err) => (format!("rejected: {}", err), TableColor::Yellow),
        None => ("accepted before opt-in".to_string(), TableColor::Red),
    };
    table.add_row(vec![
        Cell::new("Transfer before opt-in"),
        Cell::new(transfer_text).fg(transfer_color),
    ]);
    table.add_row(vec![
        Cell::new("Holdings after transfer (Alice / Bob)"),
        Cell::new(format!(
            "{} / {}",
            report.alice_holding_after_transfer, report.bob_holding_after_transfer
        )),
    ]);
    table.add_row(vec![
        Cell::new("Holdings after buy-back (Alice / Bob)"),
        Cell::new(format!(
            "{} / {}",
            report.alice_holding_after_buy_back, report.bob_holding_after_buy_back
        )),
    ]);
    table.add_row(vec![
        Cell::new("Bob's min balance"),
        Cell::new(format!(
            "{} → {}",
            format_units(report.bob_min_balance_before_close),
            format_units(report.bob_min_balance_after_close)
        ))
        .fg(TableColor::Green),
    ]);
    table.add_row(vec![Cell::new("Final round"), Cell::new(report.final_round)]);

    println!("{table}");
}
