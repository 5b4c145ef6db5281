//! Typed configuration, read once at startup from the environment.

/// Real seconds per simulated game-day, used by the retention kernel's
/// clock conversion. One real minute per game-day by default.
pub const DEFAULT_GAME_TIME_SCALE_SECONDS_PER_DAY: f64 = 60.0;

#[derive(Debug, Clone)]
pub struct Config {
    /// Accepted for interface parity with the document-store driver this
    /// engine's persisted layout mirrors; the embedded SQLite path below is
    /// what's actually opened.
    pub store_url: String,
    pub sqlite_path: std::path::PathBuf,
    /// `None` forces fallback-only linguistic dispatch.
    pub linguistic_api_key: Option<String>,
    pub bind_address: std::net::IpAddr,
    pub port: u16,
    pub game_time_scale_seconds_per_day: f64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            store_url: std::env::var("STORE_URL")
                .unwrap_or_else(|_| "mongodb://localhost:27017/bigfive".to_string()),
            sqlite_path: std::env::var("MADE_SQLITE_PATH")
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|_| std::path::PathBuf::from("made.sqlite3")),
            linguistic_api_key: std::env::var("LINGUISTIC_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            bind_address: std::env::var("BIND_ADDRESS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::new(0, 0, 0, 0))),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8000),
            game_time_scale_seconds_per_day: std::env::var("GAME_TIME_SCALE_SECONDS_PER_DAY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_GAME_TIME_SCALE_SECONDS_PER_DAY),
        }
    }
}
