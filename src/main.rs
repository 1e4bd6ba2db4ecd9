//! callguard operator CLI.
//!
//! Loads `callguard.toml` (or defaults), wires the verification and video
//! clients, and issues one guarded call per invocation. Circuit transitions
//! seen during the call are logged and, when enabled, exported as metrics.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use callguard::clients::{UploadRequest, VerificationClient, VideoClient};
use callguard::config::{load_config, ConfigError, GuardConfig};
use callguard::observability::{events, logging, metrics};

#[derive(Parser)]
#[command(name = "callguard")]
#[command(about = "Guarded calls to the verification and video services", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "callguard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration
    CheckConfig,
    /// Ask the verification service whether a user is verified
    Verify {
        user_id: String,
    },
    /// Request a signed upload URL from the video service
    UploadUrl {
        file_name: String,
        content_type: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let (config, missing) = read_config(&cli.config)?;

    logging::init_logging(&config.observability);
    if missing {
        tracing::warn!(
            path = %cli.config.display(),
            "Config file not found, using defaults"
        );
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    match cli.command {
        Commands::CheckConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Verify { user_id } => {
            let client = VerificationClient::new(&config.verification)?;
            let reporter = events::spawn_transition_reporter(client.call().subscribe());

            let verified = client.is_user_verified(&user_id).await;
            drop(client);
            let _ = reporter.await;

            let verified = verified?;
            let output = json!({ "user_id": user_id, "verified": verified });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::UploadUrl {
            file_name,
            content_type,
        } => {
            let client = VideoClient::new(&config.video)?;
            let reporter = events::spawn_transition_reporter(client.call().subscribe());

            let upload = client
                .signed_upload_url(UploadRequest::new(file_name, content_type))
                .await;
            drop(client);
            let _ = reporter.await;

            println!("{}", serde_json::to_string_pretty(&upload?)?);
        }
    }

    Ok(())
}

/// Load the config, or fall back to defaults when the file does not exist.
/// The flag reports the fallback so it can be logged once logging is up.
fn read_config(path: &Path) -> Result<(GuardConfig, bool), ConfigError> {
    match load_config(path) {
        Ok(config) => Ok((config, false)),
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            Ok((GuardConfig::default(), true))
        }
        Err(e) => Err(e),
    }
}
