//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "stormo";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_CELEBRITY_THRESHOLD: i64 = 5000;
const DEFAULT_TIMELINE_TTL_SECS: u64 = 300;
const DEFAULT_TIMELINE_MAX_SIZE: usize = 800;
const DEFAULT_BROADCAST_WINDOW: usize = 200;
const DEFAULT_BROADCAST_TTL_MULTIPLIER: u32 = 2;
const DEFAULT_TIMELINE_OVERFETCH: u32 = 50;

/// Command-line arguments for the Stormo binary.
#[derive(Debug, Parser)]
#[command(name = "stormo", version, about = "Stormo timeline server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "STORMO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the Stormo HTTP service.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    #[command(name = "migrate")]
    Migrate(MigrateArgs),
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

#[derive(Debug, Args, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
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

    /// Override the follower count at which fan-out switches to pull.
    #[arg(long = "timeline-celebrity-threshold", value_name = "COUNT")]
    pub timeline_celebrity_threshold: Option<i64>,

    /// Override the base TTL for home cache entries.
    #[arg(long = "timeline-ttl-seconds", value_name = "SECONDS")]
    pub timeline_ttl_seconds: Option<u64>,

    /// Override the per-user home cache entry bound.
    #[arg(long = "timeline-max-size", value_name = "COUNT")]
    pub timeline_max_size: Option<usize>,

    /// Override the per-publisher broadcast cache bound.
    #[arg(long = "timeline-broadcast-window", value_name = "COUNT")]
    pub timeline_broadcast_window: Option<usize>,

    /// Override the broadcast TTL multiplier.
    #[arg(long = "timeline-broadcast-ttl-multiplier", value_name = "FACTOR")]
    pub timeline_broadcast_ttl_multiplier: Option<u32>,

    /// Override the home cache read overfetch.
    #[arg(long = "timeline-overfetch", value_name = "COUNT")]
    pub timeline_overfetch: Option<u32>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub timeline: TimelineSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

/// Fan-out and cache tuning; mirrored into the cache layer at startup.
#[derive(Debug, Clone)]
pub struct TimelineSettings {
    pub celebrity_threshold: i64,
    pub ttl_seconds: u64,
    pub max_size: usize,
    pub broadcast_window: usize,
    pub broadcast_ttl_multiplier: u32,
    pub overfetch: u32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("STORMO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    timeline: RawTimelineSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(threshold) = overrides.timeline_celebrity_threshold {
            self.timeline.celebrity_threshold = Some(threshold);
        }
        if let Some(ttl) = overrides.timeline_ttl_seconds {
            self.timeline.ttl_seconds = Some(ttl);
        }
        if let Some(size) = overrides.timeline_max_size {
            self.timeline.max_size = Some(size);
        }
        if let Some(window) = overrides.timeline_broadcast_window {
            self.timeline.broadcast_window = Some(window);
        }
        if let Some(multiplier) = overrides.timeline_broadcast_ttl_multiplier {
            self.timeline.broadcast_ttl_multiplier = Some(multiplier);
        }
        if let Some(overfetch) = overrides.timeline_overfetch {
            self.timeline.overfetch = Some(overfetch);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            timeline,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let timeline = build_timeline_settings(timeline)?;

        Ok(Self {
            server,
            logging,
            database,
            timeline,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_value = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = non_zero_u32(max_value.into(), "database.max_connections")?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_timeline_settings(timeline: RawTimelineSettings) -> Result<TimelineSettings, LoadError> {
    let celebrity_threshold = timeline
        .celebrity_threshold
        .unwrap_or(DEFAULT_CELEBRITY_THRESHOLD);
    if celebrity_threshold < 1 {
        return Err(LoadError::invalid(
            "timeline.celebrity_threshold",
            "must be greater than zero",
        ));
    }

    let ttl_seconds = timeline.ttl_seconds.unwrap_or(DEFAULT_TIMELINE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "timeline.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let max_size = timeline.max_size.unwrap_or(DEFAULT_TIMELINE_MAX_SIZE);
    if max_size == 0 {
        return Err(LoadError::invalid(
            "timeline.max_size",
            "must be greater than zero",
        ));
    }

    let broadcast_window = timeline
        .broadcast_window
        .unwrap_or(DEFAULT_BROADCAST_WINDOW);
    if broadcast_window == 0 {
        return Err(LoadError::invalid(
            "timeline.broadcast_window",
            "must be greater than zero",
        ));
    }

    let broadcast_ttl_multiplier = timeline
        .broadcast_ttl_multiplier
        .unwrap_or(DEFAULT_BROADCAST_TTL_MULTIPLIER);
    if broadcast_ttl_multiplier == 0 {
        return Err(LoadError::invalid(
            "timeline.broadcast_ttl_multiplier",
            "must be greater than zero",
        ));
    }

    Ok(TimelineSettings {
        celebrity_threshold,
        ttl_seconds,
        max_size,
        broadcast_window,
        broadcast_ttl_multiplier,
        overfetch: timeline.overfetch.unwrap_or(DEFAULT_TIMELINE_OVERFETCH),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTimelineSettings {
    celebrity_threshold: Option<i64>,
    ttl_seconds: Option<u64>,
    max_size: Option<usize>,
    broadcast_window: Option<usize>,
    broadcast_ttl_multiplier: Option<u32>,
    overfetch: Option<u32>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
