//! Server configuration: every field in §6's enumerated configuration
//! list, loaded from the environment with compiled-in defaults.
//!
//! One `default_*()` function per field, and a single [`Config::from_env`]
//! entry point that reads `std::env` once at startup. There is no
//! on-disk config file or merge precedence chain — this server's
//! configuration surface is small enough that environment variables
//! alone cover it.

use std::time::Duration;

use diceforge_room::RoomConfig;

pub const fn default_afk_warning_seconds() -> u64 {
    20
}

pub const fn default_afk_timeout_seconds() -> u64 {
    30
}

pub const fn default_starting_countdown_seconds() -> u64 {
    3
}

pub const fn default_min_players() -> usize {
    2
}

pub const fn default_max_players() -> u8 {
    6
}

pub const fn default_room_cleanup_ms() -> u64 {
    5 * 60 * 1000
}

pub const fn default_join_request_ttl_ms() -> u64 {
    2 * 60 * 1000
}

/// The host-grace interval the distilled spec names but never assigns
/// a constant to (resolved in `SPEC_FULL.md` §10.3).
pub const fn default_host_grace_seconds() -> u64 {
    30
}

pub fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

/// Full server configuration, assembled once at startup and shared
/// read-only across every actor and connection handler.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub room: RoomConfig,
    pub identity_provider_jwks_url: Option<String>,
    pub identity_provider_audience: String,
    pub legacy_shared_secret: Option<String>,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

impl Config {
    /// Reads every field from its environment variable, falling back to
    /// the compiled-in default when unset or unparseable.
    pub fn from_env() -> Self {
        let room = RoomConfig {
            afk_warning_seconds: env_or("AFK_WARNING_SECONDS", default_afk_warning_seconds()),
            afk_timeout_seconds: env_or("AFK_TIMEOUT_SECONDS", default_afk_timeout_seconds()),
            starting_countdown_seconds: env_or(
                "STARTING_COUNTDOWN_SECONDS",
                default_starting_countdown_seconds(),
            ),
            min_players: env_or("MIN_PLAYERS", default_min_players()),
            max_players: env_or("MAX_PLAYERS", default_max_players()),
            room_cleanup: Duration::from_millis(env_or(
                "ROOM_CLEANUP_MS",
                default_room_cleanup_ms(),
            )),
            max_rolls_per_turn: 3,
            join_request_ttl: Duration::from_millis(env_or(
                "JOIN_REQUEST_TTL_MS",
                default_join_request_ttl_ms(),
            )),
            host_grace_seconds: env_or("HOST_GRACE_SECONDS", default_host_grace_seconds()),
            is_public: true,
            allow_spectators: true,
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| default_bind_addr()),
            room,
            identity_provider_jwks_url: env_opt("IDENTITY_PROVIDER_JWKS_URL"),
            identity_provider_audience: std::env::var("IDENTITY_PROVIDER_AUDIENCE")
                .unwrap_or_else(|_| "diceforge".to_string()),
            legacy_shared_secret: env_opt("LEGACY_SHARED_SECRET"),
        }
    }
}
