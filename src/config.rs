//! Process-wide settings, built once at startup and shared read-only.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;

use crate::models::Theme;

/// Immutable configuration handed to every component that needs it.
#[derive(Clone, Debug)]
pub struct LandableConfig {
    /// Path prefix the API is mounted under (from LANDABLE_API_NAMESPACE).
    pub api_namespace: String,
    /// Vendor namespace used in `application/vnd.<namespace>.v<N>+<fmt>`.
    pub media_namespace: String,
    /// Allowed CORS origins (from LANDABLE_CORS_ORIGINS, comma-separated).
    /// `None` disables the CORS layer.
    pub cors_origins: Option<Vec<String>>,
    /// SQLite file (from LANDABLE_DATABASE_PATH). Defaults to the platform data dir.
    pub database_path: Option<PathBuf>,
    /// Lifetime of tokens issued by `landable issue-token`.
    pub token_ttl: Duration,
    /// Theme catalog (from the JSON file named by LANDABLE_THEMES_FILE).
    pub themes: Vec<Theme>,
}

impl LandableConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let api_namespace = std::env::var("LANDABLE_API_NAMESPACE")
            .map(|ns| normalize_namespace(&ns))
            .unwrap_or(defaults.api_namespace);

        let cors_origins = std::env::var("LANDABLE_CORS_ORIGINS").ok().map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let database_path = std::env::var("LANDABLE_DATABASE_PATH")
            .ok()
            .map(PathBuf::from);

        let token_ttl = match std::env::var("LANDABLE_TOKEN_TTL_HOURS") {
            Ok(hours) => Duration::hours(
                hours
                    .parse::<i64>()
                    .context("LANDABLE_TOKEN_TTL_HOURS must be a whole number of hours")?,
            ),
            Err(_) => defaults.token_ttl,
        };

        let themes = match std::env::var("LANDABLE_THEMES_FILE") {
            Ok(path) => load_themes(Path::new(&path))?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            api_namespace,
            media_namespace: defaults.media_namespace,
            cors_origins,
            database_path,
            token_ttl,
            themes,
        })
    }

    /// Value of the `X-Landable-Media-Type` header for a negotiated response.
    pub fn media_type_label(&self, version: u32, format: &str) -> String {
        format!("{}.v{}; format={}", self.media_namespace, version, format)
    }

    pub fn with_themes(mut self, themes: Vec<Theme>) -> Self {
        self.themes = themes;
        self
    }
}

impl Default for LandableConfig {
    fn default() -> Self {
        Self {
            api_namespace: "/api".to_string(),
            media_namespace: "landable".to_string(),
            cors_origins: None,
            database_path: None,
            token_ttl: Duration::hours(8),
            themes: Vec::new(),
        }
    }
}

/// Read a theme catalog: a JSON array of theme objects.
pub fn load_themes(path: &Path) -> Result<Vec<Theme>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read theme catalog {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid theme catalog {}", path.display()))
}

/// `api`, `/api/` and `/api` all mean `/api`.
fn normalize_namespace(ns: &str) -> String {
    let trimmed = ns.trim().trim_matches('/');
    format!("/{trimmed}")
}
