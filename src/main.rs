use anyhow::{Context, Result};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use event_scraper::app::ScrapeRunUseCase;
use event_scraper::config::Config;
use event_scraper::constants::DEFAULT_CONFIG_PATH;
use event_scraper::geocoding::{RetryPolicy, RetryingGeocoder};
use event_scraper::infra::{
    BrowserPageFetcher, HttpGeocodeBackend, HttpPageFetcher, JsonFileSink, SelectorExtractor,
};
use event_scraper::logging;
use event_scraper::pipeline::processing::normalize::{normalize_date_for_label, DateRules};
use event_scraper::pipeline::RecordAssembler;

#[derive(Parser)]
#[command(name = "event_scraper")]
#[command(about = "Scrapes event listings and writes normalized event records")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape the configured sources and write the canonical events
    Run {
        /// Specific sources to run (comma-separated). Defaults to every enabled source
        #[arg(long)]
        sources: Option<String>,
        /// Output file, overriding [output].path
        #[arg(long)]
        output: Option<String>,
    },
    /// Normalize a single date string the way a source's events would be
    NormalizeDate {
        /// Source label: facebook, eventbrite or google
        #[arg(long)]
        source: String,
        text: String,
    },
    /// List the configured sources
    Sources,
}

async fn run(config: &Config, sources: Option<String>, output: Option<String>) -> Result<()> {
    let names: Option<Vec<String>> =
        sources.map(|list| list.split(',').map(|s| s.trim().to_string()).collect());
    let selected = config.select_sources(names.as_deref());
    if selected.is_empty() {
        println!("⚠️  No sources selected");
        return Ok(());
    }

    let assembler_config = config.assembler_config(chrono::Local::now().year())?;
    let geocoding = &config.geocoding;

    let backend = HttpGeocodeBackend::new(geocoding, assembler_config.geocode_api_key.as_deref())?;
    let geocoder = RetryingGeocoder::new(
        backend,
        RetryPolicy::new(geocoding.max_attempts, geocoding.retry_delay()),
    );
    let fetcher = HttpPageFetcher::new(&geocoding.user_agent, geocoding.timeout())?;
    let sink = JsonFileSink::new(output.unwrap_or_else(|| config.output.path.clone()));

    let mut use_case = ScrapeRunUseCase::new(
        Box::new(fetcher),
        Box::new(SelectorExtractor::new()),
        Box::new(geocoder),
        Box::new(sink),
        RecordAssembler::new(assembler_config),
    );

    let mut browser_session = None;
    if Config::needs_browser(&selected) {
        let browser = BrowserPageFetcher::connect(&config.browser).await?;
        browser_session = Some(browser.session());
        use_case = use_case.with_browser_fetcher(Box::new(browser));
    }

    let result = use_case.execute(&selected).await;

    if let Some(session) = browser_session {
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }
    }
    let summary = result?;

    println!("\n📊 Run {} results:", summary.run_id);
    for source in &summary.sources {
        println!(
            "   {}: {} events ({} pages, {} failed pages, {} duplicates, {} untitled)",
            source.name,
            source.assembled,
            source.pages_fetched,
            source.pages_failed,
            source.duplicates,
            source.untitled
        );
    }
    println!("   Total events: {}", summary.total_events);
    if let Some(output) = &summary.output {
        println!("💾 Saved events to {}", output);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { sources, output } => {
            let config = Config::load(&cli.config)
                .with_context(|| format!("loading configuration from {}", cli.config))?;
            info!("Running scrape with config {}", cli.config);
            if let Err(e) = run(&config, sources, output).await {
                error!("Scrape run failed: {:#}", e);
                println!("❌ Scrape run failed: {:#}", e);
                return Err(e);
            }
        }
        Commands::NormalizeDate { source, text } => {
            // The date rules come from the config file when there is one
            let config = Config::load(&cli.config).unwrap_or_default();
            let assembler = config.assembler_config(chrono::Local::now().year())?;
            let rules = DateRules {
                eventbrite_format: assembler.eventbrite_date_format,
                reference_year: assembler.reference_year,
            };
            let date = normalize_date_for_label(Some(&text), &source, &rules);
            println!("{}", serde_json::to_string_pretty(&date)?);
        }
        Commands::Sources => {
            let config = Config::load(&cli.config)
                .with_context(|| format!("loading configuration from {}", cli.config))?;
            for source in &config.sources {
                let state = if source.enabled { "enabled" } else { "disabled" };
                println!(
                    "{:<16} {:<11} {:<9} {}",
                    source.name, source.kind, state, source.url
                );
            }
        }
    }
    Ok(())
}
