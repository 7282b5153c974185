//! CLI module for nova-ledger
//!
//! Provides the command-line interface for serving and auditing the ledger.

pub mod serve;
pub mod token;
pub mod verify;

use clap::{Parser, Subcommand};

/// Nova decision ledger - Tamper-evident, append-only record of gateway verdicts
#[derive(Parser, Debug)]
#[command(name = "nova-ledger")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    NOVA_HOST                         Bind address (default: 0.0.0.0)
    NOVA_PORT                         Listen port (default: 8000)
    NOVA_DATABASE_URL                 Database URL (default: sqlite:~/.nova/ledger.db)
    NOVA_SECRET_KEY                   JWT signing key (required unless auth is disabled)
    NOVA_ACCESS_TOKEN_EXPIRE_MINUTES  Token lifetime for `token` (default: 60)
    NOVA_API_PREFIX                   API route prefix (default: /api/v1)
    NOVA_CORS_ORIGINS                 Comma-separated allowed origins
    NOVA_AUTH_DISABLED                Disable auth checks (dev/test only)
    NOVA_LEDGER_APPEND_MODE           optimistic | serialized (default: optimistic)
    NOVA_LEDGER_MAX_RETRIES           Append retries after contention (default: 5)
    NOVA_LOG_LEVEL                    Log level (default: info)
    NOVA_LOG_DIR                      Log directory (default: ~/.nova/logs)
"#)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger server
    Serve(serve::ServeArgs),
    /// Verify the full hash chain of a ledger database
    Verify(verify::VerifyArgs),
    /// Mint a bearer token signed with the configured secret
    Token(token::TokenArgs),
}
