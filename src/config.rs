// Client configuration, loaded with the 'config' crate.
// The binary loads .env before calling in here, so dotenv values show up as env vars.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    // Root that every API path (e.g. "/search") is appended to
    pub api_base_url: String,
    // Durable client-side storage for the logged-in user
    pub session_file: PathBuf,
    pub request_timeout_secs: u64,
    // Origin airport seeded into a fresh search form
    pub default_origin: String,
    // Used when RUST_LOG is not set
    pub log_filter: String,
}

impl Settings {
    // `file` overrides the default optional "config.toml" lookup
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name("config").required(false),
        };

        let builder = Config::builder()
            .set_default("api_base_url", "http://127.0.0.1:8000/api")?
            .set_default("session_file", ".smart_travel/session.json")?
            .set_default("request_timeout_secs", 30)?
            .set_default("default_origin", "JFK")?
            .set_default("log_filter", "smart_travel_client=info")?
            .add_source(file_source)
            // e.g. TRAVEL__API_BASE_URL=https://travel.example.com/api
            .add_source(Environment::with_prefix("TRAVEL").separator("__"));

        let settings: Settings = builder
            .build()
            .context("Failed to assemble configuration sources")?
            .try_deserialize()
            .context("Configuration has missing or invalid fields")?;
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
