//! Main entry point for the pairbot binary
//!
//! Wires the real Mattermost client and JSON ledger store into the round
//! orchestrator. Meant to be run once per round by an external scheduler.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pairbot::orchestrator::render_history;
use pairbot::services::{JsonLedgerStore, MattermostClient};
use pairbot::{Config, LedgerStore, PairbotError, PairbotResult, RoundOrchestrator};
use shared::logging::{self, LogFormat};
use shared::ChannelRef;

/// Pairs up channel members for recurring meetups
#[derive(Parser)]
#[command(name = "pairbot")]
#[command(about = "Pairs up channel members for recurring meetups, avoiding frequent repeats")]
pub struct Args {
    /// Log level (trace, debug, info, warn, error); overrides PAIRBOT_DEBUG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (text, json); overrides PAIRBOT_LOG_FORMAT
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one pairing round for every configured channel
    Run {
        /// Compute pairs without committing history or messaging anyone
        #[arg(long)]
        dry_run: bool,

        /// Seed for the member shuffle (overrides PAIRBOT_SEED)
        #[arg(long)]
        seed: Option<u64>,

        /// Restrict the round to these team/channel entries
        #[arg(long = "channel")]
        channels: Vec<String>,
    },

    /// Print how often each pair in a channel has been matched
    History {
        /// Channel as team/channel
        #[arg(long)]
        channel: String,

        /// Directory holding the ledgers
        #[arg(long, env = "PAIRBOT_LEDGER_DIR", default_value = pairbot::config::DEFAULT_LEDGER_DIR)]
        ledger_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> PairbotResult<()> {
    // Load .env before clap so env-backed arguments see it
    let _ = dotenv::dotenv();
    let args = Args::parse();

    let cli_format = args.log_format.as_deref().map(str::parse::<LogFormat>).transpose()?;

    match args.command {
        Command::Run { dry_run, seed, channels } => {
            let config = Config::from_env()?;
            let level = args.log_level.as_deref().unwrap_or(config.log_level());
            logging::init_tracing(Some(level), cli_format.unwrap_or(config.log_format));
            logging::log_startup("pairbot round");

            let channels = if channels.is_empty() {
                config.channels.clone()
            } else {
                channels
                    .iter()
                    .map(|c| c.parse::<ChannelRef>())
                    .collect::<Result<Vec<_>, _>>()?
            };

            let store = JsonLedgerStore::new(config.ledger_dir.clone());
            let platform = MattermostClient::new(config.mattermost.clone())?;
            let mut orchestrator = RoundOrchestrator::new(store, platform, config.messages.clone())
                .with_seed(seed.or(config.seed))
                .with_dry_run(dry_run);

            orchestrator.initialize().await?;
            let outcomes = orchestrator.run_all(&channels).await;

            for report in outcomes.iter().flatten() {
                for (a, b) in &report.assignment.pairs {
                    println!("{}: {} <-> {}", report.channel, a, b);
                }
                if let Some(leftover) = &report.assignment.leftover {
                    println!("{}: {} (unmatched)", report.channel, leftover);
                }
            }

            let failed = outcomes.iter().filter(|o| o.is_err()).count();
            if failed > 0 {
                return Err(PairbotError::RoundsFailed {
                    failed,
                    total: outcomes.len(),
                });
            }
            tracing::info!("✅ All {} channel rounds completed", outcomes.len());
        }

        Command::History { channel, ledger_dir } => {
            logging::init_tracing(args.log_level.as_deref(), cli_format.unwrap_or_default());
            let channel: ChannelRef = channel.parse()?;
            let store = JsonLedgerStore::new(ledger_dir);
            let ledger = store.load(&channel).await?;
            print!("{}", render_history(&channel, &ledger));
        }
    }

    Ok(())
}
