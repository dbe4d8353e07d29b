use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use seasonal_price::config::AppConfig;
use seasonal_price::models::Month;
use seasonal_price::normalizer::build_comparison_table_with;
use seasonal_price::pipeline::{self, Dashboard};
use seasonal_price::report::{self, OutputFormat};
use seasonal_price::sources::SeasonalFoodClient;
use seasonal_price::sources::kamis::decode_price_list;
use seasonal_price::utils;

#[derive(Parser)]
#[command(name = "seasonal-price", about = "Seasonal food prices from KAMIS", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Price comparison tables for comma-separated items ("쌀,감자")
    Compare {
        /// Survey month, "10" or "10월"
        #[arg(short, long)]
        month: Month,

        #[arg(short, long, value_delimiter = ',', required = true)]
        items: Vec<String>,

        /// Survey year (default: current year)
        #[arg(short, long)]
        year: Option<i32>,
    },

    /// List the month's seasonal foods
    Seasonal {
        #[arg(short, long)]
        month: Month,
    },

    /// Seasonal foods joined with their price tables
    Dashboard {
        #[arg(short, long)]
        month: Month,

        #[arg(short, long)]
        year: Option<i32>,
    },

    /// Normalize a saved KAMIS JSON response without touching the network
    Table {
        #[arg(long)]
        file: PathBuf,

        /// Only this item (default: every item in the file)
        #[arg(short, long)]
        item: Option<String>,
    },
}

fn current_year() -> i32 {
    chrono::Local::now().year()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "seasonal_price=info,warn",
        1 => "seasonal_price=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let decimals = config.comparison.decimals;

    match cli.command {
        Command::Compare { month, items, year } => {
            let _t = utils::Timer::start("Price comparison");
            let dashboard = Dashboard::new(&config)?;
            let year = year.unwrap_or_else(current_year);
            let comparisons = dashboard.compare(month, year, &items).await?;

            match cli.format {
                OutputFormat::Json => report::write_json(io::stdout().lock(), &comparisons)?,
                OutputFormat::Csv => report::write_csv(io::stdout().lock(), report::comparison_tables(&comparisons))?,
                OutputFormat::Text => {
                    for c in &comparisons {
                        match &c.table {
                            Some(table) => print!("{}", report::render_table(table, decimals)),
                            None => println!("{}: no price data for {} {}", c.item, year, month),
                        }
                    }
                }
            }
        }

        Command::Seasonal { month } => {
            let source = SeasonalFoodClient::new(&config.seasonal, &config.http)
                .context("Failed to build seasonal food client")?;
            let foods = pipeline::fetch_seasonal(&source, month).await?;

            match cli.format {
                OutputFormat::Json => report::write_json(io::stdout().lock(), &foods)?,
                OutputFormat::Csv => report::write_foods_csv(io::stdout().lock(), &foods)?,
                OutputFormat::Text => {
                    if foods.is_empty() {
                        println!("No seasonal foods listed for {}.", month);
                    }
                    for food in &foods {
                        println!("{}", report::render_food(food));
                    }
                }
            }
        }

        Command::Dashboard { month, year } => {
            let _t = utils::Timer::start("Dashboard load");
            let dashboard = Dashboard::new(&config)?;
            let year = year.unwrap_or_else(current_year);
            let dash = dashboard.load(month, year).await?;

            match cli.format {
                OutputFormat::Json => report::write_json(io::stdout().lock(), &dash)?,
                OutputFormat::Csv => {
                    report::write_csv(io::stdout().lock(), dash.cards.iter().filter_map(|c| c.prices.as_ref()))?
                }
                OutputFormat::Text => print!("{}", report::render_dashboard(&dash, decimals)),
            }
        }

        Command::Table { file, item } => {
            let body = std::fs::read_to_string(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let records = decode_price_list(&body).with_context(|| format!("Failed to decode {:?}", file))?;
            let periods = config
                .comparison
                .period_set()
                .context("Invalid comparison periods")?;
            let rule = config.comparison.display_rule();

            let tables: Vec<_> = records
                .iter()
                .filter(|r| item.as_deref().is_none_or(|name| r.item_name.trim() == name.trim()))
                .map(|r| build_comparison_table_with(r, &periods, &rule))
                .collect();
            info!("{}: {} of {} records", file.display(), tables.len(), records.len());

            match cli.format {
                OutputFormat::Json => report::write_json(io::stdout().lock(), &tables)?,
                OutputFormat::Csv => report::write_csv(io::stdout().lock(), &tables)?,
                OutputFormat::Text => {
                    for table in &tables {
                        print!("{}", report::render_table(table, decimals));
                    }
                }
            }
        }
    }

    Ok(())
}
