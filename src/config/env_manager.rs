use std::str::FromStr;

/// Reads an environment variable, treating an empty value as unset
pub fn get_env_value(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Reads and parses an environment variable, ignoring values that fail to parse
pub fn get_env_parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = get_env_value(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring unparsable value for {}", key);
            None
        }
    }
}

/// Credentials read from the process environment at start-up
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// GitHub API token for authenticated requests
    pub github_token: Option<String>,
    /// Google generative-language API key
    pub google_api_key: Option<String>,
}

impl ApiKeys {
    /// Loads both credentials from `GITHUB_TOKEN` and `GOOGLE_API_KEY`
    pub fn from_env() -> Self {
        Self {
            github_token: get_env_value("GITHUB_TOKEN"),
            google_api_key: get_env_value("GOOGLE_API_KEY"),
        }
    }
}
