mod env_manager;

use crate::error::{ReadmeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub use env_manager::{get_env_parsed, get_env_value, ApiKeys};

const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Main configuration struct for the application
///
/// Holds the two upstream credentials, the upstream endpoints, the server
/// address and every limit the fetch, context and rate-limit stages apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GitHub API token for authenticated requests
    pub github_token: Option<String>,
    /// Google generative-language API key
    pub google_api_key: Option<String>,
    /// Base URL of the GitHub REST API
    pub github_api_base: String,
    /// Base URL of the generative-language API
    pub gemini_api_base: String,
    /// Model used for generation
    pub model: String,
    /// HTTP server settings
    pub server: ServerConfig,
    /// Repository traversal limits
    pub fetch: FetchLimits,
    /// Context assembly limits
    pub context: ContextLimits,
    /// Per-client rate limit for the streaming endpoint
    pub rate_limit: RateLimitConfig,
    /// Largest accepted request body on the streaming endpoint, in bytes
    pub max_request_body: usize,
}

/// Address the HTTP server binds to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on
    pub host: String,
    /// TCP port
    pub port: u16,
}

/// Limits applied while walking a repository tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchLimits {
    /// Files whose reported size is at or above this many bytes are skipped
    pub max_file_size: u64,
    /// Directories whose path contains any of these substrings are not entered
    pub excluded_dirs: Vec<String>,
    /// Sibling entries fetched concurrently (output order is unaffected)
    pub concurrency: usize,
    /// Per-request timeout for upstream calls
    pub timeout_secs: u64,
}

/// Limits applied when building the model context
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextLimits {
    /// Maximum number of important files included verbatim
    pub max_important_files: usize,
    /// Characters kept from each included file
    pub max_file_chars: usize,
    /// Maximum number of top-level entries listed
    pub max_top_level_entries: usize,
}

/// Sliding-window rate limit settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window width in seconds
    pub window_secs: u64,
    /// Requests admitted per client within one window
    pub max_requests: usize,
    /// Client identifiers remembered at once; only idle ones are evicted
    pub max_clients: usize,
}

impl Config {
    /// Loads configuration from the default config file location
    ///
    /// If the config file doesn't exist the defaults are used. Environment
    /// variables are applied on top in both cases.
    pub fn load() -> Result<Self> {
        let config_path = dirs::config_dir().map(|dir| dir.join("readmegen").join("config.toml"));

        let mut config = match config_path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Parses a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ReadmeError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ReadmeError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Overrides settings from the process environment
    pub fn apply_env(&mut self) {
        let keys = ApiKeys::from_env();
        if keys.github_token.is_some() {
            self.github_token = keys.github_token;
        }
        if keys.google_api_key.is_some() {
            self.google_api_key = keys.google_api_key;
        }
        if let Some(base) = get_env_value("GITHUB_API_BASE_URL") {
            self.github_api_base = base;
        }
        if let Some(base) = get_env_value("GEMINI_API_BASE_URL") {
            self.gemini_api_base = base;
        }
        if let Some(model) = get_env_value("GEMINI_MODEL") {
            self.model = model;
        }
        if let Some(host) = get_env_value("READMEGEN_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get_env_parsed("READMEGEN_PORT") {
            self.server.port = port;
        }
    }

    /// Rejects settings that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.fetch.concurrency == 0 {
            return Err(ReadmeError::Config("fetch.concurrency must be at least 1".into()));
        }
        if self.rate_limit.max_clients == 0 {
            return Err(ReadmeError::Config("rate_limit.max_clients must be at least 1".into()));
        }
        if let Some(token) = &self.github_token {
            if token.trim().is_empty() {
                return Err(ReadmeError::new("GitHub token is empty"));
            }
        }
        Ok(())
    }

    /// Address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl FetchLimits {
    /// Per-request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RateLimitConfig {
    /// Window width as a `Duration`
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_token: None,
            google_api_key: None,
            github_api_base: DEFAULT_GITHUB_API_BASE.to_string(),
            gemini_api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            server: ServerConfig::default(),
            fetch: FetchLimits::default(),
            context: ContextLimits::default(),
            rate_limit: RateLimitConfig::default(),
            max_request_body: 1024,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            max_file_size: 100_000,
            excluded_dirs: vec![
                "node_modules".to_string(),
                ".git".to_string(),
                "dist".to_string(),
                "build".to_string(),
            ],
            concurrency: 4,
            timeout_secs: 30,
        }
    }
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self {
            max_important_files: 10,
            max_file_chars: 2000,
            max_top_level_entries: 20,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            max_requests: 3,
            max_clients: 10_000,
        }
    }
}
