use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use feed_harvester::application::{CrawlController, SearchQuery};
use feed_harvester::infrastructure::config::{AppConfig, ConfigManager};
use feed_harvester::infrastructure::logging::{init_logging_with_config, log_system_info};
use feed_harvester::infrastructure::{HtmlSnapshotFeed, JsonLinesSink};

/// Harvest posts from a rendered infinite-scroll feed
#[derive(Parser, Debug)]
#[command(name = "feed-harvester", version, about)]
struct Cli {
    /// Configuration file (defaults to the per-user config)
    #[arg(long, global = true, env = "FEED_HARVESTER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a directory of saved feed snapshots
    Crawl {
        /// Directory of `*.html` snapshots in scroll order
        #[arg(long)]
        snapshots: PathBuf,

        /// JSON-lines output file
        #[arg(long)]
        output: PathBuf,

        /// Unique records to collect
        #[arg(long)]
        target: Option<usize>,

        /// Stagnant steps before the feed counts as exhausted
        #[arg(long)]
        stagnation_ceiling: Option<u32>,

        /// Wait after each advance, in milliseconds
        #[arg(long)]
        settle_delay_ms: Option<u64>,

        /// Tags the snapshots were searched for (logged with the search URL)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Print the live-search URL for a set of tags
    SearchUrl {
        #[arg(long = "tag", required = true)]
        tags: Vec<String>,

        /// Override the configured base URL
        #[arg(long)]
        base_url: Option<String>,
    },
}

async fn load_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    manager.load_config().await
}

async fn run_crawl(
    mut config: AppConfig,
    snapshots: PathBuf,
    output: PathBuf,
    overrides: (Option<usize>, Option<u32>, Option<u64>),
    tags: Vec<String>,
) -> Result<()> {
    let (target, ceiling, settle) = overrides;
    if let Some(target) = target {
        config.crawl.target_count = target;
    }
    if let Some(ceiling) = ceiling {
        config.crawl.stagnation_ceiling = ceiling;
    }
    if let Some(settle) = settle {
        config.crawl.settle_delay_ms = settle;
    }
    config.crawl.validate()?;

    if !tags.is_empty() {
        let url = SearchQuery::from_tags(&tags)?.url(&config.extraction.base_url)?;
        info!("Harvesting snapshots of {}", url);
    }

    let feed = HtmlSnapshotFeed::from_dir(&snapshots, &config.selectors)
        .await
        .context("Failed to load feed snapshots")?;
    let controller = CrawlController::from_config(Arc::new(feed), &config);

    let token = controller.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping crawl");
            token.cancel();
        }
    });

    let sink = JsonLinesSink::new(output);
    let outcome = controller.crawl_into(&sink).await?;

    info!(
        "Harvested {} records in {} polls ({:?})",
        outcome.records.len(),
        outcome.polls,
        outcome.termination
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config).await?;

    init_logging_with_config(&config.logging)?;
    log_system_info();

    match cli.command {
        Command::Crawl {
            snapshots,
            output,
            target,
            stagnation_ceiling,
            settle_delay_ms,
            tags,
        } => {
            run_crawl(
                config,
                snapshots,
                output,
                (target, stagnation_ceiling, settle_delay_ms),
                tags,
            )
            .await
        }
        Command::SearchUrl { tags, base_url } => {
            let base_url = base_url.unwrap_or(config.extraction.base_url);
            let url = SearchQuery::from_tags(&tags)?.url(&base_url)?;
            println!("{url}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crawl_command() {
        let cli = Cli::try_parse_from([
            "feed-harvester",
            "crawl",
            "--snapshots",
            "snaps",
            "--output",
            "out.jsonl",
            "--target",
            "25",
            "--tag",
            "jobs",
            "--tag",
            "vacancy",
        ])
        .unwrap();

        match cli.command {
            Command::Crawl { target, tags, stagnation_ceiling, .. } => {
                assert_eq!(target, Some(25));
                assert_eq!(tags, ["jobs", "vacancy"]);
                assert_eq!(stagnation_ceiling, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_search_url_requires_a_tag() {
        assert!(Cli::try_parse_from(["feed-harvester", "search-url"]).is_err());
    }
}
