//! Layered settings: file, then `SECURETOKEN_*` environment, then flags

use config::{Config, Environment, File, Map};
use securetoken::VerifierConfig;

use crate::cli::Cli;
use crate::error::CliResult;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "SECURETOKEN";

/// Build the verifier configuration for this invocation
///
/// # Errors
///
/// Returns [`CliError::Config`](crate::error::CliError::Config) if the file cannot
/// be read or the merged settings do not form a valid [`VerifierConfig`].
pub fn load(cli: &Cli) -> CliResult<VerifierConfig> {
    load_with_env(cli, None)
}

/// Like [`load`], reading variables from `env` instead of the process environment
///
/// # Errors
///
/// Same as [`load`].
pub fn load_with_env(cli: &Cli, env: Option<Map<String, String>>) -> CliResult<VerifierConfig> {
    let mut builder = Config::builder();

    if let Some(path) = &cli.config {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .set_override_option("project_id", cli.project_id.clone())?
        .set_override_option("token_type", cli.token_type.map(|t| t.config_name()))?
        .set_override_option("key_url", cli.key_url.clone())?
        .build()?;

    Ok(config.try_deserialize()?)
}
