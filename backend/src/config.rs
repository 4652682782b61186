//! Configuration management for the VRI planner service
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with VRI_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::registry::BoundaryMode;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Upstream geometry, pivot and prescription services
    pub upstream: UpstreamConfig,

    /// Editing behaviour
    #[serde(default)]
    pub planner: PlannerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Whole-request timeout in seconds, upstream calls included
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Cell grids, management zones and linear/micro grid generation
    pub geometry_url: String,

    /// Center pivot creation endpoint
    pub pivot_url: String,

    /// Prescription map generator
    pub prescription_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PlannerConfig {
    /// How zone outlines are computed for new workspaces
    #[serde(default)]
    pub boundary_mode: BoundaryMode,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("VRI_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("upstream.geometry_url", "http://localhost:8000")?
            .set_default("upstream.pivot_url", "http://localhost:80/pivot")?
            .set_default("upstream.prescription_url", "http://localhost:8002")?
            .set_default("upstream.timeout_secs", 10)?
            .set_default("planner.boundary_mode", "compatible")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (VRI_ prefix)
            .add_source(
                Environment::with_prefix("VRI")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
