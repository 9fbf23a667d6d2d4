use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::fs;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use soreness_risk::logging::init_logging;
use soreness_risk::processing::{AthleteDayOutput, DailyRiskProcessor};
use soreness_risk::{EngineConfig, RiskEngineError, TriggerType, UncertaintyRange};

/// Soreness Risk - daily soreness state and training load risk engine
///
/// Reads one athlete-day of survey responses, historic soreness state and
/// training sessions, then prints the updated state, load metrics and the
/// triggers that fired.
#[derive(Parser)]
#[command(name = "soreness-risk")]
#[command(author = "Soreness Risk Contributors")]
#[command(version)]
#[command(about = "Soreness state and training load risk engine", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daily pass over an athlete-day JSON document
    Process {
        /// Input file path (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Write the JSON output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List every trigger type with its code and insight category
    Catalogue,

    /// Show or initialize the configuration file
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,

        /// Print the active configuration as TOML
        #[arg(long)]
        show: bool,
    },
}

#[derive(Tabled)]
struct SorenessRow {
    #[tabled(rename = "Body part")]
    body_part: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Streak")]
    streak: u32,
    #[tabled(rename = "Avg severity")]
    average_severity: String,
    #[tabled(rename = "Cause")]
    cause: String,
}

#[derive(Tabled)]
struct TriggerRow {
    #[tabled(rename = "Code")]
    code: u16,
    #[tabled(rename = "Trigger")]
    name: &'static str,
    #[tabled(rename = "Insight")]
    insight: String,
    #[tabled(rename = "Body part")]
    body_part: String,
    #[tabled(rename = "Sport")]
    sport: String,
}

#[derive(Tabled)]
struct CatalogueRow {
    #[tabled(rename = "Code")]
    code: u16,
    #[tabled(rename = "Trigger")]
    name: &'static str,
    #[tabled(rename = "Insight")]
    insight: String,
    #[tabled(rename = "Group")]
    group: String,
}

#[derive(Tabled)]
struct LoadRow {
    #[tabled(rename = "Load")]
    load_type: String,
    #[tabled(rename = "Week")]
    current_week: String,
    #[tabled(rename = "ACWR")]
    acwr: String,
    #[tabled(rename = "Ramp")]
    ramp: String,
    #[tabled(rename = "Monotony")]
    monotony: String,
    #[tabled(rename = "Strain")]
    strain: String,
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from_file(path),
        None => Ok(EngineConfig::load_or_default()),
    }
}

fn show(range: &UncertaintyRange) -> String {
    match range.observed {
        Some(_) => range.to_string(),
        None => "-".dimmed().to_string(),
    }
}

fn print_tables(output: &AthleteDayOutput) {
    println!(
        "{}",
        format!("Athlete day {}", output.event_date.format("%Y-%m-%d")).bold()
    );

    if output.rejected_reports > 0 {
        println!(
            "{}",
            format!("⚠ {} soreness report(s) rejected", output.rejected_reports).yellow()
        );
    }

    let soreness: Vec<SorenessRow> = output
        .historic_soreness
        .iter()
        .map(|state| SorenessRow {
            body_part: state.body_part_side().to_string(),
            kind: if state.pain { "pain" } else { "soreness" },
            status: format!("{:?}", state.status),
            streak: state.streak,
            average_severity: format!("{:.2}", state.average_severity),
            cause: state.cause.to_string(),
        })
        .collect();
    println!("\n{}", "Historic soreness".cyan().bold());
    println!("{}", Table::new(soreness).with(Style::rounded()));

    let load: Vec<LoadRow> = output
        .load
        .metrics
        .iter()
        .map(|metrics| LoadRow {
            load_type: metrics.load_type.to_string(),
            current_week: show(&metrics.current_week),
            acwr: show(&metrics.acwr),
            ramp: show(&metrics.ramp),
            monotony: show(&metrics.monotony),
            strain: show(&metrics.strain),
        })
        .collect();
    println!("\n{}", "Training load".blue().bold());
    println!("{}", Table::new(load).with(Style::rounded()));

    if output.high_load.eligible {
        println!(
            "  High load sessions: {}",
            output.high_load.sessions.len().to_string().bold()
        );
    } else {
        println!("  {}", "Not enough history for high load detection".dimmed());
    }

    let triggers: Vec<TriggerRow> = output
        .persisted_triggers
        .iter()
        .map(|trigger| TriggerRow {
            code: trigger.trigger_type.code(),
            name: trigger.trigger_type.name(),
            insight: trigger.insight_type().to_string(),
            body_part: trigger
                .body_part
                .map(|body_part| body_part.to_string())
                .unwrap_or_default(),
            sport: trigger
                .sport_name
                .map(|sport| format!("{:?}", sport))
                .unwrap_or_default(),
        })
        .collect();
    println!("\n{}", "Triggers".magenta().bold());
    if triggers.is_empty() {
        println!("  {}", "No triggers fired".green());
    } else {
        println!("{}", Table::new(triggers).with(Style::rounded()));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    init_logging(&config.log.clone().with_verbosity(cli.verbose))?;

    match cli.command {
        Commands::Process {
            input,
            format,
            output,
        } => {
            if !input.exists() {
                return Err(RiskEngineError::InputNotFound { path: input }.into());
            }
            let json = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read input file: {}", input.display()))?;

            let processor = DailyRiskProcessor::with_config(config);
            let result = processor
                .process_json(&json)
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;

            match (format, output) {
                (_, Some(path)) => {
                    fs::write(&path, serde_json::to_string_pretty(&result)?)
                        .with_context(|| format!("Failed to write output: {}", path.display()))?;
                    println!("{}", format!("✓ Output written to {}", path.display()).green());
                }
                (OutputFormat::Json, None) => {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
                (OutputFormat::Table, None) => print_tables(&result),
            }
        }

        Commands::Catalogue => {
            let rows: Vec<CatalogueRow> = TriggerType::ALL
                .iter()
                .map(|trigger_type| CatalogueRow {
                    code: trigger_type.code(),
                    name: trigger_type.name(),
                    insight: trigger_type.insight_type().to_string(),
                    group: trigger_type
                        .parent_group()
                        .map(|group| group.to_string())
                        .unwrap_or_default(),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::Config { init, show } => {
            let path = cli
                .config
                .clone()
                .unwrap_or_else(EngineConfig::default_config_path);

            if init {
                let mut defaults = EngineConfig::default();
                defaults.save_to_file(&path)?;
                println!(
                    "{}",
                    format!("✓ Default configuration written to {}", path.display()).green()
                );
            }
            if show || !init {
                println!("{}", format!("# {}", path.display()).dimmed());
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}
