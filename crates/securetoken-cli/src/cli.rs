//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use securetoken::TokenType;
use std::path::PathBuf;

/// Main CLI application structure
#[derive(Parser, Debug)]
#[command(
    name = "securetoken",
    version,
    about = "Verify ID tokens and session cookies offline against the issuer's key set",
    long_about = "Verifies RS256 ID tokens and session cookies for a project.\n\
                  Settings are read from an optional config file, then SECURETOKEN_* environment\n\
                  variables, then command-line flags, each overriding the previous."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (TOML, YAML or JSON, chosen by extension)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Project id the tokens must be issued for
    #[arg(long, short = 'p', global = true)]
    pub project_id: Option<String>,

    /// Kind of token to verify
    #[arg(long, short = 't', global = true, value_enum)]
    pub token_type: Option<TokenTypeArg>,

    /// Override the key-distribution URL
    #[arg(long, global = true)]
    pub key_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify a token and print its claims as JSON
    Verify {
        /// The encoded token
        token: String,
    },

    /// Fetch the current key set and list its key ids
    Keys,
}

/// Token type as spelled on the command line
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum TokenTypeArg {
    /// ID token
    IdToken,
    /// Session cookie
    SessionCookie,
}

impl From<TokenTypeArg> for TokenType {
    fn from(arg: TokenTypeArg) -> Self {
        match arg {
            TokenTypeArg::IdToken => TokenType::IdToken,
            TokenTypeArg::SessionCookie => TokenType::SessionCookie,
        }
    }
}

impl TokenTypeArg {
    /// Name used by config files and the environment
    pub fn config_name(self) -> &'static str {
        match self {
            TokenTypeArg::IdToken => "id_token",
            TokenTypeArg::SessionCookie => "session_cookie",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_command() {
        let cli = Cli::try_parse_from(["securetoken", "verify", "a.b.c", "-p", "demo"]).unwrap();
        assert_eq!(cli.project_id.as_deref(), Some("demo"));
        assert!(!cli.verbose);
        match cli.command {
            Commands::Verify { token } => assert_eq!(token, "a.b.c"),
            Commands::Keys => panic!("expected verify"),
        }
    }

    #[test]
    fn test_global_flags_before_subcommand() {
        let cli = Cli::try_parse_from([
            "securetoken",
            "--token-type",
            "session-cookie",
            "--key-url",
            "http://localhost:9099/certs",
            "-v",
            "keys",
        ])
        .unwrap();
        assert_eq!(cli.token_type, Some(TokenTypeArg::SessionCookie));
        assert_eq!(cli.key_url.as_deref(), Some("http://localhost:9099/certs"));
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Keys));
    }

    #[test]
    fn test_token_type_names() {
        assert_eq!(TokenType::from(TokenTypeArg::IdToken), TokenType::IdToken);
        assert_eq!(TokenTypeArg::SessionCookie.config_name(), "session_cookie");
        assert!(Cli::try_parse_from(["securetoken", "-t", "custom", "keys"]).is_err());
    }

    #[test]
    fn test_verify_requires_token() {
        assert!(Cli::try_parse_from(["securetoken", "verify"]).is_err());
    }
}
