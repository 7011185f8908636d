use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lyrx_crawler::engine::gdal::GdalEngine;
use lyrx_crawler::{
    CatalogConfig, CrawlConfig, CrawlSummary, Crawler, DryRunPublisher, HttpPublisher,
    MergeStrategy, Publisher,
};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Merge {
    /// Merge by tag name, existing metadata wins
    Combine,
    /// Append the new record and strip FGDC sections
    Legacy,
}

impl From<Merge> for MergeStrategy {
    fn from(merge: Merge) -> Self {
        match merge {
            Merge::Combine => MergeStrategy::Combine,
            Merge::Legacy => MergeStrategy::Legacy,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root folder of the GIS data tree
    #[arg(value_name = "ROOT")]
    root: PathBuf,

    /// Folder served over HTTP that receives published layer files
    #[arg(short, long, value_name = "DIR")]
    publish_folder: PathBuf,

    /// URL under which the publish folder is served
    #[arg(long, value_name = "URL", default_value = "")]
    public_base_url: String,

    /// Catalog metadata item endpoint
    #[arg(long, value_name = "URL", required_unless_present = "dry_run")]
    catalog_url: Option<String>,

    /// Catalog user
    #[arg(long, env = "CATALOG_USER", default_value = "")]
    catalog_user: String,

    /// Catalog password
    #[arg(long, env = "CATALOG_PASSWORD", default_value = "", hide_env_values = true)]
    catalog_password: String,

    /// Coordinate system assumed for datasets without one
    #[arg(long, default_value_t = 4326)]
    default_wkid: i32,

    /// Keep existing working layer files instead of replacing them
    #[arg(long)]
    reuse_layers: bool,

    /// How new metadata is combined with existing metadata
    #[arg(long, value_enum, default_value_t = Merge::Combine)]
    merge_strategy: Merge,

    /// Catalog request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Write layer files and metadata without publishing
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    fs::create_dir_all(&args.publish_folder).with_context(|| {
        format!(
            "Cannot create publish folder {}",
            args.publish_folder.display()
        )
    })?;

    let mut config = CrawlConfig::new(&args.root, &args.publish_folder);
    config.public_base_url = args.public_base_url.clone();
    config.default_wkid = args.default_wkid;
    config.overwrite_layers = !args.reuse_layers;
    config.merge_strategy = args.merge_strategy.into();

    let summary = match (&args.catalog_url, args.dry_run) {
        (Some(url), false) => {
            let publisher = HttpPublisher::new(CatalogConfig {
                url: url.clone(),
                username: args.catalog_user.clone(),
                password: args.catalog_password.clone(),
                timeout: Duration::from_secs(args.timeout),
            })?;
            crawl(&config, &publisher)?
        }
        _ => crawl(&config, &DryRunPublisher)?,
    };

    info!(
        "Crawled {} workspaces, {} datasets: {} published, {} unsupported, {} without layer, {} failed, {} rejected by catalog",
        summary.workspaces,
        summary.datasets,
        summary.published,
        summary.unsupported,
        summary.layer_failures,
        summary.failed,
        summary.publish_failures,
    );
    if summary.failed > 0 || summary.publish_failures > 0 {
        warn!("Some datasets were not published, see the log above");
    }

    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}

fn crawl<P: Publisher>(config: &CrawlConfig, publisher: &P) -> Result<CrawlSummary> {
    let mut engine = GdalEngine::new();
    let summary = Crawler::new(config, &mut engine, publisher)
        .run()
        .with_context(|| format!("Crawl of {} aborted", config.root.display()))?;
    Ok(summary)
}
