//! Nozomi Fetcher CLI application
//!
//! Command-line interface for building tagged image datasets from nozomi.la.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use nozomi_fetcher::cli::{
    handle_dataset, handle_download, handle_init, handle_post, Cli, Commands,
};
use nozomi_fetcher::config::AppConfig;
use nozomi_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        tracing::error!("{} error: {}", e.category(), e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let mut config = AppConfig::load(cli.global.config.clone()).await?;
    if cli.global.quiet {
        config.fetch.progress = false;
    }

    init_logging(&cli, &config);

    info!("Nozomi Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Dataset(args) => {
            info!("Executing dataset command");
            handle_dataset(args, config).await
        }
        Commands::Init(args) => {
            info!("Executing init command");
            handle_init(args, config).await
        }
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, config).await
        }
        Commands::Post(args) => {
            info!("Executing post command");
            handle_post(args, config).await
        }
    }
}

/// Initialize logging from the CLI flags, falling back to the config file
fn init_logging(cli: &Cli, config: &AppConfig) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.to_lowercase());

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("nozomi_fetcher={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.very_verbose)
        .with_writer(std::io::stderr)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
