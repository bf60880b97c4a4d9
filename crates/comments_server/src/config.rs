//! Command line and environment configuration.
//!
//! Every option can also come from the environment (or a `.env` file):
//!   COMMENTS_DATABASE_URL       Postgres connection string
//!   COMMENTS_JWT_SECRET         JWT HMAC secret (required for `serve`)
//!   COMMENTS_BIND_ADDR          listen address (default: 0.0.0.0:8000)
//!   COMMENTS_TOKEN_TTL_MINUTES  access token lifetime (default: 30)
//!   COMMENTS_DB_MAX_CONNECTIONS pool size (default: 10)
//!   COMMENTS_CORS_ORIGINS       comma-separated allowed origins

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "comments_server", version, about = "Group comments service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeArgs),
    /// Apply database migrations and exit.
    Migrate(DatabaseArgs),
    /// Insert demo users and comments.
    Seed(DatabaseArgs),
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    #[arg(long, env = "COMMENTS_DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "COMMENTS_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,
}

impl DatabaseArgs {
    pub fn require_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("COMMENTS_DATABASE_URL must be set"))
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Use a throwaway in-memory store instead of Postgres.
    #[arg(long)]
    pub in_memory: bool,

    #[arg(long, env = "COMMENTS_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    #[arg(long, env = "COMMENTS_BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,

    #[arg(long, env = "COMMENTS_TOKEN_TTL_MINUTES", default_value_t = 30)]
    pub token_ttl_minutes: i64,

    #[arg(long, env = "COMMENTS_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,
}
