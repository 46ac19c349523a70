use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    /// Listing endpoint the content source reads from.
    pub source_url: String,
    /// When set, every successful export is also written here.
    pub export_dir: Option<PathBuf>,
    pub port: u16,
    pub rust_log: String,
}

pub const DEFAULT_SOURCE_URL: &str = "https://www.reddit.com/r/all/hot.json";

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            source_url: std::env::var("SOURCE_URL")
                .unwrap_or_else(|_| DEFAULT_SOURCE_URL.to_string()),
            export_dir: std::env::var("EXPORT_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
