use clap::{Parser, ValueEnum};
use portkey_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "PORTKEY_GATEWAY_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "PORTKEY_GATEWAY_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "PORTKEY_GATEWAY_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "PORTKEY_GATEWAY_MYSQL_DSN";
pub const CODE_LENGTH_ENV: &str = "PORTKEY_GATEWAY_CODE_LENGTH";
pub const MAX_ATTEMPTS_ENV: &str = "PORTKEY_GATEWAY_MAX_ATTEMPTS";
pub const REUSE_EMBARGO_ENV: &str = "PORTKEY_GATEWAY_REUSE_EMBARGO_SECS";
pub const STORE_TIMEOUT_ENV: &str = "PORTKEY_GATEWAY_STORE_TIMEOUT_MS";
pub const CACHE_CAPACITY_ENV: &str = "PORTKEY_GATEWAY_CACHE_CAPACITY";
pub const CACHE_TTL_ENV: &str = "PORTKEY_GATEWAY_CACHE_TTL_SECS";
pub const CLICK_QUEUE_CAPACITY_ENV: &str = "PORTKEY_GATEWAY_CLICK_QUEUE_CAPACITY";
pub const CLICK_MAX_DEFERRED_ENV: &str = "PORTKEY_GATEWAY_CLICK_MAX_DEFERRED";
pub const CLICK_RETRY_ATTEMPTS_ENV: &str = "PORTKEY_GATEWAY_CLICK_RETRY_ATTEMPTS";
pub const LOG_FORMAT_ENV: &str = "PORTKEY_GATEWAY_LOG_FORMAT";
pub const OTLP_ENDPOINT_ENV: &str = "PORTKEY_GATEWAY_OTLP_ENDPOINT";
pub const SESSION_TOKENS_ENV: &str = "PORTKEY_GATEWAY_SESSION_TOKENS";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Plain,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Plain => LogFormat::Plain,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "portkey-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public origin used to build `short_url` in responses.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(long, env = CODE_LENGTH_ENV, default_value_t = 7)]
    pub code_length: usize,

    /// Generated codes tried per create before giving up.
    #[arg(long, env = MAX_ATTEMPTS_ENV, default_value_t = 5)]
    pub max_attempts: u32,

    /// Seconds after deletion before a code may be issued again. Never when unset.
    #[arg(long, env = REUSE_EMBARGO_ENV, value_parser = clap::value_parser!(i64).range(0..))]
    pub reuse_embargo_secs: Option<i64>,

    #[arg(long, env = STORE_TIMEOUT_ENV, default_value_t = 2_000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = CACHE_CAPACITY_ENV, default_value_t = 10_000)]
    pub cache_capacity: u64,

    #[arg(long, env = CACHE_TTL_ENV, default_value_t = 300)]
    pub cache_ttl_secs: u64,

    #[arg(long, env = CLICK_QUEUE_CAPACITY_ENV, default_value_t = 10_000)]
    pub click_queue_capacity: usize,

    /// Clicks allowed to wait for room in a full queue before new ones are dropped.
    #[arg(long, env = CLICK_MAX_DEFERRED_ENV, default_value_t = 1_024)]
    pub click_max_deferred: usize,

    #[arg(long, env = CLICK_RETRY_ATTEMPTS_ENV, default_value_t = 5)]
    pub click_retry_attempts: u32,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Plain)]
    pub log_format: LogFormatArg,

    #[arg(long, env = OTLP_ENDPOINT_ENV)]
    pub otlp_endpoint: Option<String>,

    /// Comma-separated `token=owner_id` pairs accepted as sessions.
    #[arg(long, env = SESSION_TOKENS_ENV, value_delimiter = ',')]
    pub session_tokens: Vec<String>,
}
