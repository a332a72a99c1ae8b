//! # securetoken CLI
//!
//! Operator tool around the `securetoken` verifier.
//!
//! ## Usage
//!
//! ```bash
//! # Verify an ID token and print its claims
//! securetoken --project-id my-project verify eyJhbGciOiJSUzI1NiIs...
//!
//! # Verify a session cookie against an emulator's key endpoint
//! securetoken -p my-project -t session-cookie --key-url http://localhost:9099/certs verify "$COOKIE"
//!
//! # List the key ids currently published for ID tokens
//! securetoken -p my-project keys
//! ```
//!
//! Every flag except `--verbose` can also come from a config file (`--config`)
//! or from `SECURETOKEN_*` environment variables.

pub mod cli;
pub mod commands;
pub mod error;
pub mod settings;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use cli::{Cli, Commands, TokenTypeArg};
pub use error::{CliError, CliResult};

/// Run the CLI application
///
/// # Errors
///
/// Returns the first error from configuration loading or the subcommand.
pub async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = settings::load(&cli)?;
    debug!(
        project_id = %config.project_id,
        token_type = ?config.token_type,
        key_url = %config.effective_key_url(),
        "Loaded configuration"
    );

    match &cli.command {
        Commands::Verify { token } => {
            let rendered = commands::verify(&config, token).await?;
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        Commands::Keys => {
            let summary = commands::keys(&config).await?;
            if let Some(expires_at) = summary.expires_at {
                debug!(
                    expires_in_secs = commands::seconds_until(expires_at),
                    "Key set cache lifetime"
                );
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

/// Install the stderr log subscriber; `RUST_LOG` takes precedence over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
