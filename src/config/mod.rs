//! Configuration module for the slotting backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default Discord REST API base URL.
pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key expected from the authentication gateway
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// How many times a slot mutation is recomputed after a version conflict
    pub max_slot_attempts: u32,
    /// Timeout applied to each outbound role notification
    pub notify_timeout: Duration,
    /// Discord settings; role notifications are disabled when absent
    pub discord: Option<DiscordConfig>,
}

/// Credentials for granting and revoking Discord guild roles.
#[derive(Debug, Clone)]
pub struct DiscordConfig {
    pub api_base: String,
    pub bot_token: String,
    pub guild_id: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("SLOTTING_API_PSK").ok();

        let db_path = env::var("SLOTTING_DB_PATH")
            .unwrap_or_else(|_| "./data/events.sqlite".to_string())
            .into();

        let bind_addr = env::var("SLOTTING_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid SLOTTING_BIND_ADDR format");

        let log_level = env::var("SLOTTING_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let max_slot_attempts = parse_or("SLOTTING_MAX_SLOT_ATTEMPTS", 5u32).max(1);
        let notify_timeout = Duration::from_secs(parse_or("SLOTTING_NOTIFY_TIMEOUT_SECS", 5u64));

        let discord = match (
            env::var("SLOTTING_DISCORD_BOT_TOKEN").ok(),
            env::var("SLOTTING_DISCORD_GUILD_ID").ok(),
        ) {
            (Some(bot_token), Some(guild_id)) => Some(DiscordConfig {
                api_base: env::var("SLOTTING_DISCORD_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_DISCORD_API_BASE.to_string()),
                bot_token,
                guild_id,
            }),
            _ => None,
        };

        Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            max_slot_attempts,
            notify_timeout,
            discord,
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or invalid.
fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid {key} value {raw:?}, using default {default}");
            default
        }),
        Err(_) => default,
    }
}
