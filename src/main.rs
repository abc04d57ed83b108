use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use trending_digest::analyze::gemini::GeminiSummarizer;
use trending_digest::config::Config;
use trending_digest::feed::github_trending::GitHubTrendingFeed;
use trending_digest::history::HistoryStore;
use trending_digest::notify::message::failure_notification;
use trending_digest::notify::ntfy::NtfyNotifier;
use trending_digest::notify::DeliverySink;
use trending_digest::pipeline::{RunConfig, RunOrchestrator, RunResult};

#[derive(Parser)]
#[command(name = "trending-digest", about = "Push summaries of newly trending GitHub repositories")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Log notifications instead of publishing them
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one discovery-and-push pass (default)
    Run,
    /// List repositories pushed recently
    Recent {
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trending_digest=info"));

    match &config.log_file {
        Some(path) => {
            let log_file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(log_file)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

/// Resolved config, and whether it came from a file.
fn load_config(cli: &Cli) -> Result<(Config, bool)> {
    // Saved keys from .env (real env vars take precedence)
    Config::load_env_file();

    let loaded = Config::load_optional(&cli.config)?;
    let from_file = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    config.apply_env_overrides()?;
    if cli.dry_run {
        config.notifier.dry_run = true;
    }
    config.validate()?;
    Ok((config, from_file))
}

async fn run_pass(config: &Config, notifier: &NtfyNotifier) -> Result<RunResult> {
    let history = HistoryStore::open(&config.history.db_path)?;
    let mut feed = GitHubTrendingFeed::new(
        &config.trending.base_url,
        config.trending.scope(),
        config.trending.request_timeout_ms,
    )?;
    let api_key = Config::gemini_api_key();
    if api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, summaries will use the fallback text");
    }
    let summarizer = GeminiSummarizer::new(&config.summarizer, api_key)?;

    let language = if config.trending.language.is_empty() {
        "all"
    } else {
        config.trending.language.as_str()
    };
    tracing::info!(
        language,
        since = config.trending.since.as_str(),
        min_stars = config.admission.min_stars,
        max_per_run = config.admission.max_per_run,
        "starting run"
    );

    let mut orchestrator = RunOrchestrator::new(
        &history,
        &mut feed,
        &summarizer,
        notifier,
        RunConfig::from_config(config),
    );
    let result = orchestrator.run().await?;
    Ok(result)
}

async fn run_once(config: &Config) -> Result<()> {
    let notifier = NtfyNotifier::new(&config.notifier)?;

    match run_pass(config, &notifier).await {
        Ok(result) => {
            println!(
                "Examined {}, admitted {}, delivered {}",
                result.candidates_examined, result.candidates_admitted, result.deliveries_succeeded
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "run aborted");
            if !notifier.deliver(&failure_notification(&e)).await {
                tracing::warn!("failure notification could not be delivered");
            }
            Err(e)
        }
    }
}

fn print_recent(config: &Config, days: u32) -> Result<()> {
    let history = HistoryStore::open_existing(&config.history.db_path)?;
    let records = history.recent(days)?;
    if records.is_empty() {
        println!("No repositories pushed in the last {} days.", days);
        return Ok(());
    }
    for r in &records {
        println!(
            "{}  {:<40} {:>8} stars  {}",
            r.recorded_at.format("%Y-%m-%d %H:%M"),
            r.identity,
            r.stars,
            if r.language.is_empty() { "-" } else { r.language.as_str() }
        );
    }
    Ok(())
}

async fn execute(cli: Cli) -> Result<()> {
    let (config, from_file) = load_config(&cli)?;
    init_logging(&config)?;
    if !from_file {
        tracing::info!(path = %cli.config.display(), "no config file, using defaults");
    }

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_once(&config).await,
        Command::Recent { days } => print_recent(&config, days),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
