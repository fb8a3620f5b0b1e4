use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tally_cli::bot;
use tally_cli::config::{self, Config, Env};
use tally_ingest::parse_notifications;

#[derive(Parser, Debug)]
#[command(name = "tally", version, about = "Expense tracking bot backed by Google Sheets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the Telegram bot (long polling)
    Run,

    /// Parse pasted bank notifications and print the records
    Parse {
        /// Read from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,

        /// Year for dates written without one (default: current year)
        #[arg(long)]
        year: Option<i32>,

        /// Print JSON instead of one line per record
        #[arg(long)]
        json: bool,
    },

    /// Manage ~/.tally/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config if none exists
    Init,

    /// Print the effective config and which environment overrides are set
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log.filter)),
        )
        .init();

    match cli.command {
        Command::Run => {
            let settings = cfg.resolve(&Env::from_process())?;
            tracing::info!(version = env!("CARGO_PKG_VERSION"), "tally starting");
            bot::run(settings).await?;
        }

        Command::Parse { file, year, json } => {
            let text = match &file {
                Some(p) => std::fs::read_to_string(p)
                    .with_context(|| format!("read {}", p.display()))?,
                None => {
                    let mut s = String::new();
                    std::io::stdin()
                        .read_to_string(&mut s)
                        .context("read stdin")?;
                    s
                }
            };
            let year = match year {
                Some(y) => y,
                None => Utc::now().with_timezone(&cfg.timezone()?).year(),
            };
            let records = parse_notifications(&text, year)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for r in &records {
                    let ts = r
                        .timestamp
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let amount = r
                        .amount
                        .map(|a| format!("{a:.2}"))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{ts} | {amount:>14} {} | {}",
                        r.detected_currency.as_deref().unwrap_or("???"),
                        r.operation
                    );
                }
                let complete = records.iter().filter(|r| r.is_complete()).count();
                println!("\n{} records ({complete} complete)", records.len());
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => show_config(&cfg)?,
        },
    }

    Ok(())
}

fn show_config(cfg: &Config) -> Result<()> {
    println!("# {}", config::config_path()?.display());
    println!("{}", toml::to_string_pretty(cfg)?);

    let env = Env::from_process();
    let set = |present: bool| if present { "set" } else { "unset" };
    println!("# environment");
    println!("TELEGRAM_TOKEN: {}", set(env.telegram_token.is_some()));
    println!("SPREADSHEET_ID: {}", set(env.spreadsheet_id.is_some()));
    println!(
        "GOOGLE_APPLICATION_CREDENTIALS_PATH: {}",
        set(env.credentials_path.is_some())
    );
    println!(
        "GOOGLE_SERVICE_ACCOUNT_EMAIL: {}",
        set(env.service_account_email.is_some())
    );
    println!("GOOGLE_PRIVATE_KEY: {}", set(env.private_key.is_some()));
    Ok(())
}
