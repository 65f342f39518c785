//! zipdeploy - Entry Point
//!
//! Zips a directory and deploys it through the Kudu zip deploy API using
//! credentials from a publish profile.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use zipdeploy::app::options::{DeployOptions, ProfileSource};
use zipdeploy::app::run::run;
use zipdeploy::deploy::poller;
use zipdeploy::logs::{init_logging, LogLevel, LogOptions};
use zipdeploy::profile::ZIP_DEPLOY_PUBLISH_METHOD;
use zipdeploy::utils::version_info;

#[derive(Parser, Debug)]
#[command(name = "zipdeploy")]
#[command(about = "Zip a directory and deploy it with a publish profile")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Path to the publish profile XML. If omitted, reads the AZURE_PUBLISH_PROFILE env var
    #[arg(long, value_name = "PATH")]
    publish_profile: Option<PathBuf>,

    /// Directory to deploy
    #[arg(long, value_name = "DIR", default_value = "api")]
    api_dir: PathBuf,

    /// Where to write the zip; a temp file is used otherwise. Removed after the run either way
    #[arg(long, value_name = "PATH")]
    zip_output: Option<PathBuf>,

    /// Deployment polling timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 300)]
    timeout: u64,

    /// Seconds between deployment status checks
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 2,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval: u64,

    /// Publish method of the profile entry holding the deploy credentials
    #[arg(long, value_name = "METHOD", default_value = ZIP_DEPLOY_PUBLISH_METHOD)]
    publish_method: String,

    /// Deployment API base URL, derived from the profile's publishUrl by default
    #[arg(long, value_name = "URL")]
    kudu_url: Option<String>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Print version information and exit
    #[arg(long)]
    version: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if cli.version {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("Failed to render version info: {e}"),
        }
        return;
    }

    let log_options = LogOptions {
        log_level: cli.log_level,
        json_format: cli.log_json,
    };
    if let Err(e) = init_logging(log_options) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let options = DeployOptions {
        source_dir: cli.api_dir,
        profile: ProfileSource::from_env(cli.publish_profile),
        zip_output: cli.zip_output,
        publish_method: cli.publish_method,
        base_url: cli.kudu_url,
        poller: poller::Options {
            interval: Duration::from_secs(cli.poll_interval),
            timeout: Duration::from_secs(cli.timeout),
        },
    };

    let version = version_info();
    info!(
        "Running zipdeploy {} ({}) with options: {:?}",
        version.version, version.git_hash, options
    );

    match run(options, shutdown_signal()).await {
        Ok(outcome) => {
            info!(
                "Deployed {} files with upload status {}",
                outcome.archive.entries, outcome.upload_status
            );
            println!("Deployment succeeded");
        }
        Err(e) => {
            error!("Deployment run failed: {e}");
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// Install the signal handlers now, so an interrupt at any point of the run
/// unwinds through the archive cleanup instead of killing the process.
fn shutdown_signal() -> Pin<Box<dyn Future<Output = ()> + Send>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(mut sigint), Ok(mut sigterm)) => {
                return Box::pin(async move {
                    tokio::select! {
                        _ = sigint.recv() => info!("SIGINT received, shutting down..."),
                        _ = sigterm.recv() => info!("SIGTERM received, shutting down..."),
                    }
                });
            }
            (Err(e), _) | (_, Err(e)) => error!("Failed to install signal handlers: {e}"),
        }
    }

    Box::pin(wait_for_ctrl_c())
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, shutting down..."),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    }
}
