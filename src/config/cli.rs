use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Yatube binary.
#[derive(Debug, Parser)]
#[command(name = "yatube", version, about = "Yatube blogging server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "YATUBE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server. This is the default command.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
    /// Create a post group.
    #[command(name = "create-group")]
    CreateGroup(CreateGroupArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the uploads directory.
    #[arg(long = "uploads-directory", value_name = "PATH")]
    pub uploads_directory: Option<PathBuf>,

    /// Override the maximum request size for uploads in bytes.
    #[arg(long = "uploads-max-request-bytes", value_name = "BYTES")]
    pub uploads_max_request_bytes: Option<u64>,

    /// Enable the index page cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the index page cache lifetime.
    #[arg(long = "cache-index-ttl-seconds", value_name = "SECONDS")]
    pub cache_index_ttl_seconds: Option<u64>,

    /// Override the number of cached index pages.
    #[arg(long = "cache-max-entries", value_name = "COUNT")]
    pub cache_max_entries: Option<usize>,

    /// Override the session lifetime.
    #[arg(long = "auth-session-ttl-hours", value_name = "HOURS")]
    pub auth_session_ttl_hours: Option<u64>,

    /// Mark session cookies as Secure.
    #[arg(
        long = "auth-secure-cookies",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub auth_secure_cookies: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Clone)]
pub struct CreateGroupArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Human-readable group title.
    #[arg(long, value_name = "TITLE")]
    pub title: String,

    /// URL slug. Derived from the title when omitted.
    #[arg(long, value_name = "SLUG")]
    pub slug: Option<String>,

    /// Group description shown on the group page.
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub description: String,
}
