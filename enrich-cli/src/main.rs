//! Company Enrich CLI
//!
//! Crawl a company website and turn it into a structured profile.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use enrich_agents::{merge_signals, LlmBackend, SummaryMode};
use enrich_runtime::{build_backend, crawl_only, EnrichmentResult, Pipeline, PipelineConfig, Provider};
use enrich_web::{CrawlMode, CrawlReport, PageOutcome};

#[derive(Parser)]
#[command(name = "company-enrich")]
#[command(author, version, about = "Crawl a company website into a normalized profile", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

/// Crawl settings shared by every subcommand
#[derive(Args)]
struct CrawlArgs {
    /// Company website URL
    #[arg(short, long)]
    url: String,

    /// Pages to crawl (1-10)
    #[arg(long)]
    max_pages: Option<usize>,

    /// Crawl strategy: priority or frontier
    #[arg(long)]
    mode: Option<CrawlMode>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl a site and extract the company profile
    Profile {
        #[command(flatten)]
        crawl: CrawlArgs,

        /// Summary strategy: direct or map-reduce
        #[arg(long)]
        summary: Option<SummaryMode>,

        /// LLM model to use (default depends on the provider)
        #[arg(short, long)]
        model: Option<String>,

        /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
        #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
        anthropic_key: Option<String>,

        /// OpenAI API key (or set OPENAI_API_KEY env var)
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// OpenRouter API key (or set OPENROUTER_API_KEY env var)
        #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
        openrouter_key: Option<String>,

        /// Use OpenAI instead of Anthropic
        #[arg(long, conflicts_with = "openrouter")]
        openai: bool,

        /// Use OpenRouter instead of Anthropic
        #[arg(long)]
        openrouter: bool,

        /// Output file for the profile (default: profile_<timestamp>.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also print the summary, social links and analyzed pages
        #[arg(long)]
        insights: bool,
    },

    /// Crawl a site without calling a model
    Crawl {
        #[command(flatten)]
        crawl: CrawlArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match cli.command {
        Commands::Profile {
            crawl,
            summary,
            model,
            anthropic_key,
            api_key,
            openrouter_key,
            openai,
            openrouter,
            output,
            insights,
        } => {
            let provider = if openrouter {
                Provider::OpenRouter
            } else if openai {
                Provider::OpenAI
            } else {
                Provider::Anthropic
            };
            let key = match provider {
                Provider::Anthropic => anthropic_key,
                Provider::OpenAI => api_key,
                Provider::OpenRouter => openrouter_key,
            };

            let mut config = load_config(&crawl)?;
            if let Some(summary) = summary {
                config.summary_mode = summary;
            }

            run_profile(
                &crawl.url,
                config,
                provider,
                model.as_deref(),
                key.as_deref(),
                output,
                insights,
            )
            .await?;
        }
        Commands::Crawl { crawl } => {
            let config = load_config(&crawl)?;
            run_crawl(&crawl.url, &config).await?;
        }
    }

    Ok(())
}

/// File config (if any) with flags layered on top
fn load_config(args: &CrawlArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(max_pages) = args.max_pages {
        config.max_pages = max_pages;
    }
    if let Some(mode) = args.mode {
        config.crawl_mode = mode;
    }

    Ok(config)
}

async fn run_profile(
    url: &str,
    config: PipelineConfig,
    provider: Provider,
    model: Option<&str>,
    api_key: Option<&str>,
    output: Option<PathBuf>,
    insights: bool,
) -> Result<()> {
    println!("🏢 Company Enrich\n");

    // Credentials are checked before any page is fetched
    let backend = build_backend(provider, model, api_key)?;

    println!("📡 Provider: {} | Model: {}", provider, backend.model_name());
    println!("🌐 Website: {}", url);
    println!(
        "🕷️  Crawl: {} mode, up to {} pages | 📝 Summary: {}\n",
        config.crawl_mode, config.max_pages, config.summary_mode
    );

    let pipeline = Pipeline::new(backend, config);
    let result = match pipeline.run(url).await {
        Ok(result) => result,
        Err(e) => {
            if let Some(raw) = e.raw_response() {
                println!("❌ Could not parse the model response. Raw response:\n{}", raw);
            }
            return Err(e.into());
        }
    };

    let json = serde_json::to_string_pretty(&result.profile)?;

    let output_path = output.unwrap_or_else(|| {
        let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
        PathBuf::from(format!("profile_{}.json", timestamp))
    });
    fs::write(&output_path, &json)
        .with_context(|| format!("Could not write {}", output_path.display()))?;

    println!("✅ Profile extracted from {} pages", result.aggregated.pages_analyzed.len());
    println!("📄 Saved to: {}", output_path.display());
    println!("\n{}", "=".repeat(60));
    println!("{}", json);

    let missing = result.profile.missing_fields();
    if !missing.is_empty() {
        println!("\n⚠️  Not found: {}", missing.join(", "));
    }

    if insights {
        print_insights(&result);
    }

    Ok(())
}

fn print_insights(result: &EnrichmentResult) {
    println!("\n{}", "=".repeat(60));
    println!("🔎 Additional Insights\n");

    println!("Summary:");
    let preview: String = result.aggregated.summary_text.chars().take(1000).collect();
    println!("{}", preview);
    if result.aggregated.summary_text.chars().count() > 1000 {
        println!("...");
    }

    println!("\nSocial links:");
    if result.aggregated.social_links.is_empty() {
        println!("   none found");
    }
    for (platform, link) in &result.aggregated.social_links {
        println!("   {}: {}", platform, link);
    }

    println!("\nPages analyzed:");
    for page in &result.aggregated.pages_analyzed {
        println!("   {} ({} chars)", page.url, page.char_count());
    }
}

async fn run_crawl(url: &str, config: &PipelineConfig) -> Result<()> {
    println!("🕷️  Crawling {} ({} mode, up to {} pages)\n", url, config.crawl_mode, config.max_pages);

    let report = crawl_only(url, config).await?;
    print_report(&report);

    Ok(())
}

fn print_report(report: &CrawlReport) {
    for attempt in &report.attempts {
        match &attempt.outcome {
            PageOutcome::Collected => println!("✅ {}", attempt.url),
            PageOutcome::Blank => println!("⬜ {} (no text)", attempt.url),
            PageOutcome::FetchFailed(e) => println!("❌ {} ({})", attempt.url, e),
            PageOutcome::ParseFailed(e) => println!("⚠️  {} ({})", attempt.url, e),
            PageOutcome::OffSite(final_url) => {
                println!("↪️  {} (redirected off site to {})", attempt.url, final_url)
            }
        }
        for link in &attempt.links {
            println!("   ↳ {}", link);
        }
    }

    println!(
        "\n📊 {} collected, {} blank, {} off site, {} fetch failures, {} parse failures",
        report.pages.len(),
        report.blank_pages(),
        report.off_site_pages(),
        report.fetch_failures(),
        report.parse_failures()
    );

    let signals = merge_signals(&report.pages);

    if !signals.social_links.is_empty() {
        println!("\nSocial links:");
        for (platform, link) in &signals.social_links {
            println!("   {}: {}", platform, link);
        }
    }
    if let Some(phone) = &signals.contact_info.phone {
        println!("📞 {}", phone);
    }
    if let Some(email) = &signals.contact_info.email {
        println!("✉️  {}", email);
    }
    for (name, value) in &signals.metadata {
        println!("🏷️  {}: {}", name, value);
    }
}
