//! MLB Player Props CLI
//!
//! Pulls player prop lines for the day's MLB games and summarizes them.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use mlb_props::enrichment::{MlbStatsClient, StatsEnricher};
use mlb_props::report::{Balance, ReportData};
use mlb_props::services::Metrics;
use mlb_props::{BetSide, Config, IngestionConfig, IngestionOutput, OddsApiClient, PropPipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mlb-props")]
#[command(about = "MLB player props ingestion and stats enrichment")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch props for today's events and show the Over/Under summary
    Fetch {
        /// Only process the first N events
        #[arg(short, long)]
        max_events: Option<usize>,

        /// Delay between event requests in milliseconds
        #[arg(short, long)]
        delay_ms: Option<u64>,

        /// Write the report data as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch props and list every unique player
    Players {
        /// Only process the first N events
        #[arg(short, long)]
        max_events: Option<usize>,

        /// Delay between event requests in milliseconds
        #[arg(short, long)]
        delay_ms: Option<u64>,
    },

    /// Fetch props, then enrich every player with season and recent stats
    Analyze {
        /// Only process the first N events
        #[arg(short, long)]
        max_events: Option<usize>,

        /// Delay between event requests in milliseconds
        #[arg(short, long)]
        delay_ms: Option<u64>,

        /// Concurrent stats lookup workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Write the report data as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,mlb_props={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    // Load configuration
    let mut config = Config::from_env()?;

    match cli.command {
        Commands::Fetch { max_events, delay_ms, output } => {
            apply_overrides(&mut config, max_events, delay_ms, None);
            fetch_props(&config, output).await?
        }
        Commands::Players { max_events, delay_ms } => {
            apply_overrides(&mut config, max_events, delay_ms, None);
            list_players(&config).await?
        }
        Commands::Analyze { max_events, delay_ms, workers, output } => {
            apply_overrides(&mut config, max_events, delay_ms, workers);
            analyze(&config, output).await?
        }
    }

    Ok(())
}

fn apply_overrides(
    config: &mut Config,
    max_events: Option<usize>,
    delay_ms: Option<u64>,
    workers: Option<usize>,
) {
    if let Some(n) = max_events {
        config.odds.set_max_events(n);
    }
    if let Some(ms) = delay_ms {
        config.odds.request_delay_ms = ms;
    }
    if let Some(w) = workers {
        config.enrichment.workers = w.max(1);
    }
}

async fn ingest(config: &Config, metrics: &Metrics) -> Result<IngestionOutput> {
    let client = OddsApiClient::new(config.odds_api_key.clone(), config.odds.clone());
    let pipeline = PropPipeline::new(
        Arc::new(client),
        IngestionConfig::from(&config.odds),
        metrics.clone(),
    );
    let output = pipeline.run().await?;

    let failed = output.failed_events();
    if failed > 0 {
        warn!(
            "{} of {} events failed to fetch; their props are missing from this run",
            failed,
            output.events.len()
        );
    }
    Ok(output)
}

async fn fetch_props(config: &Config, output: Option<PathBuf>) -> Result<()> {
    print_banner("MLB PROPS FETCH");
    println!(
        "  Regions: {} | Format: {} | Delay: {}ms",
        config.odds.regions,
        config.odds.odds_format.as_str(),
        config.odds.request_delay_ms
    );

    let metrics = Metrics::new();
    let ingested = ingest(config, &metrics).await?;
    let report = ReportData::new(ingested, Vec::new(), metrics.snapshot());

    print_events(&report);
    print_category_summary(&report);
    print_metrics(&report);

    if let Some(path) = output {
        report.write_json(&path)?;
        info!("Report data written to {}", path.display());
    }

    Ok(())
}

async fn list_players(config: &Config) -> Result<()> {
    print_banner("UNIQUE PLAYERS SUMMARY");

    let metrics = Metrics::new();
    let ingested = ingest(config, &metrics).await?;
    let report = ReportData::new(ingested, Vec::new(), metrics.snapshot());

    let rows = report.player_rows();
    println!("Total Unique Players: {}", rows.len());

    for (i, row) in rows.iter().enumerate() {
        println!("\n{:3}. {}", i + 1, row.name.bold());
        println!("     Categories: {}", row.categories.join(", "));
        println!("     Props Count: {}", row.prop_count);
        println!("     Games: {}", row.game_count);
        println!("     Bookmakers: {}", row.bookmakers.join(", "));
        println!("     Sample: {}", row.sample.dimmed());
    }
    println!();

    Ok(())
}

async fn analyze(config: &Config, output: Option<PathBuf>) -> Result<()> {
    print_banner("MLB PROPS ANALYSIS");
    println!(
        "  Season: {} | Workers: {} | Recent games: {}",
        config.enrichment.season, config.enrichment.workers, config.enrichment.recent_games
    );

    let metrics = Metrics::new();
    let ingested = ingest(config, &metrics).await?;

    let stats_client = MlbStatsClient::new(&config.enrichment, metrics.clone());
    let enricher = StatsEnricher::new(
        Arc::new(stats_client),
        config.enrichment.clone(),
        metrics.clone(),
    );
    let stats = enricher.enrich(ingested.aggregator.players()).await;

    let report = ReportData::new(ingested, stats, metrics.snapshot());

    print_category_summary(&report);
    print_balance(&report);
    print_line_comparisons(&report, 20);

    let (found, total) = report.stats_coverage();
    println!("Stats coverage: {}/{} player/category pairs", found, total);
    print_metrics(&report);

    if let Some(path) = output {
        report.write_json(&path)?;
        info!("Report data written to {}", path.display());
    }

    Ok(())
}

fn print_banner(title: &str) {
    println!("\n{}", "=".repeat(70));
    println!("  {}", title.bold());
    println!("{}\n", "=".repeat(70));
}

fn print_events(report: &ReportData) {
    if report.event_outcomes.is_empty() {
        println!("No events found.\n");
        return;
    }

    println!("EVENTS ({})", report.event_outcomes.len());
    println!("{}", "-".repeat(70));

    for (event, outcome) in report.events.iter().zip(&report.event_outcomes) {
        let status = if outcome.fetch_failed {
            "FAILED".red().to_string()
        } else {
            format!("{} props, {} categories", outcome.props, outcome.categories.len())
        };
        println!(
            "  {:<45} {}  {}",
            outcome.matchup,
            event.local_start().format("%m/%d %I:%M %p %Z"),
            status
        );
    }
    println!();
}

fn print_category_summary(report: &ReportData) {
    println!("OVER/UNDER PROPS SUMMARY");
    println!("{}", "-".repeat(70));
    println!(
        "  {:<26} {:>6} {:>6} {:>6} {:>8}  Status",
        "Category", "Over", "Under", "Total", "Players"
    );

    for row in report.category_summary() {
        let status = if row.active {
            "Active".green()
        } else {
            "No Data".red()
        };
        println!(
            "  {:<26} {:>6} {:>6} {:>6} {:>8}  {}",
            row.category.market_key(),
            row.over,
            row.under,
            row.total,
            row.players,
            status
        );
    }

    println!(
        "\n  Events: {} | Players: {} | Over: {} | Under: {}\n",
        report.events.len(),
        report.players.len(),
        report.total_over().to_string().green(),
        report.total_under().to_string().red()
    );
}

fn print_balance(report: &ReportData) {
    println!("OVER VS UNDER");
    println!("{}", "-".repeat(70));

    for row in report.balance() {
        let label = row.balance.to_string();
        let label = match row.balance {
            Balance::OverHeavy => label.green(),
            Balance::UnderHeavy => label.red(),
            Balance::Balanced => label.yellow(),
            Balance::NoData => label.dimmed(),
        };
        println!(
            "  {:<26} {:>5} / {:<5} {:>6.1}%  {}",
            row.category.display_name(),
            row.over,
            row.under,
            row.over_pct,
            label
        );
    }
    println!();
}

fn print_line_comparisons(report: &ReportData, limit: usize) {
    let rows = report.line_comparisons();
    if rows.is_empty() {
        println!("No lines with recent game data.\n");
        return;
    }

    println!("LINES VS RECENT GAMES");
    println!("{}", "-".repeat(70));

    for row in rows.iter().take(limit) {
        let side = match row.side {
            BetSide::Over => row.side.to_string().green(),
            BetSide::Under => row.side.to_string().red(),
            BetSide::Other(_) => row.side.to_string().normal(),
        };
        let rate = row
            .hit_rate
            .map(|r| format!("{:.0}%", r * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} {:<22} {} {:<5} over {} / under {} / push {} of {}  hit {}",
            row.player,
            row.category.market_key(),
            side,
            row.line.normalize(),
            row.over,
            row.under,
            row.push,
            row.games,
            rate
        );
    }

    if rows.len() > limit {
        println!("\n  ... and {} more", rows.len() - limit);
    }
    println!();
}

fn print_metrics(report: &ReportData) {
    let m = &report.metrics;
    println!(
        "Run {}: {} events ({} failed), {} fetch attempts, {} props, {} malformed outcomes",
        report.run_id,
        m.events_processed,
        m.events_failed,
        m.fetch_attempts,
        m.props_normalized,
        m.outcomes_malformed
    );
    if m.player_lookups > 0 {
        println!(
            "Stats: {} identity lookups, {} stats fetches, {} game logs, {} failures, {} rate limited",
            m.player_lookups, m.stats_fetches, m.game_log_fetches, m.lookup_failures, m.stats_rate_limited
        );
    }
    println!();
}
