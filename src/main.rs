//! CZ ID uploader CLI application
//!
//! Command-line interface for uploading local sequencing samples to CZ ID.

use std::process;

use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use czid_uploader::cli::{handle_upload_sample, handle_upload_samples, Cli, Commands};
use czid_uploader::config::AppConfig;
use czid_uploader::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!("{} error: {}", e.category(), e);
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    let config = AppConfig::load(cli.global.config.clone()).await?;

    init_logging(&cli, &config);

    info!("CZ ID uploader v{} starting", env!("CARGO_PKG_VERSION"));

    let verbose = cli.global.verbose || cli.global.very_verbose;
    match cli.command {
        Commands::UploadSamples(args) => {
            info!("Executing upload-samples command");
            handle_upload_samples(args, &config, verbose).await
        }
        Commands::UploadSample(args) => {
            info!("Executing upload-sample command");
            handle_upload_sample(args, &config, verbose).await
        }
    }
}

/// Initialize logging from CLI flags, falling back to the configured level
fn init_logging(cli: &Cli, config: &AppConfig) {
    let log_level = cli
        .log_level()
        .unwrap_or_else(|| config.logging.level.parse().unwrap_or(tracing::Level::WARN));

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("czid_uploader={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
