use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use wiki_item_harvester::{logging, HarvestConfig, HarvestPipeline, MediaWikiClient};

#[derive(Debug, Parser)]
#[command(
    name = "wiki-item-harvester",
    version,
    about = "Collect item metadata and images from a wiki category"
)]
struct Cli {
    /// Download image files (by default only item metadata is collected)
    #[arg(long)]
    download: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = HarvestConfig::default().with_download(cli.download);

    if let Err(e) = logging::init(&config.log_file) {
        warn!(
            path = %config.log_file.display(),
            error = %e,
            "Log file unavailable, logging to console only"
        );
    }

    info!(
        api = %config.api_base_url,
        category = %config.category,
        download = config.download_enabled,
        "Starting harvest"
    );

    let source = match MediaWikiClient::new(&config) {
        Ok(source) => source,
        Err(e) => {
            error!(error = %e, "Failed to create API client");
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match HarvestPipeline::new(config, source) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "Failed to set up pipeline");
            return ExitCode::FAILURE;
        }
    };

    match pipeline.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Harvest aborted");
            ExitCode::FAILURE
        }
    }
}
