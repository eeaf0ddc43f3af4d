use axum::http::StatusCode;
use std::io;
use thiserror::Error;

/// Custom result type alias for the application
pub type Result<T> = std::result::Result<T, ReadmeError>;

const NOT_FOUND_MESSAGE: &str =
    "Repository not found. Please check the URL and ensure the repository is public.";
const AUTH_MESSAGE: &str = "GitHub authentication failed. Please check your GitHub token.";
const GITHUB_RATE_LIMIT_MESSAGE: &str = "GitHub API rate limit exceeded. Please try again in a few minutes or use a GitHub token for higher limits.";

/// Errors that can occur while generating a README
#[derive(Debug, Error)]
pub enum ReadmeError {
    /// I/O errors
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// The request did not carry a repository URL
    #[error("Repository URL is required")]
    MissingRepoUrl,

    /// The repository URL is not a `github.com/<owner>/<repo>` URL
    #[error("Please provide a valid GitHub URL")]
    InvalidRepoUrl,

    /// The request body could not be parsed
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// The request body exceeded the configured ceiling
    #[error("Request too large")]
    RequestTooLarge,

    /// The client exceeded its request allowance
    #[error("Rate limit exceeded. Please try again later.")]
    ClientRateLimited,

    /// The code-hosting API reported the repository as missing
    #[error("{}", NOT_FOUND_MESSAGE)]
    RepositoryNotFound,

    /// The code-hosting API rejected the credential
    #[error("{}", AUTH_MESSAGE)]
    GitHubAuth,

    /// The code-hosting API refused the call because of its own quota
    #[error("{}", GITHUB_RATE_LIMIT_MESSAGE)]
    GitHubRateLimit,

    /// Any other code-hosting API failure, carrying the upstream message
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Language model errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// The model produced no usable text
    #[error("Generated README is empty")]
    EmptyReadme,

    /// The caller went away before the request finished
    #[error("Client disconnected")]
    Cancelled,

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// General message errors
    #[error("{0}")]
    Message(String),
}

impl ReadmeError {
    /// Creates a new error with the specified message
    pub fn new(message: &str) -> Self {
        Self::Message(message.to_string())
    }

    /// Text shown to the caller when this error ends a request.
    pub fn user_message(&self) -> String {
        match self {
            Self::RepositoryNotFound => NOT_FOUND_MESSAGE.to_string(),
            Self::GitHubAuth => AUTH_MESSAGE.to_string(),
            Self::GitHubRateLimit => GITHUB_RATE_LIMIT_MESSAGE.to_string(),
            other => {
                let message = other.to_string();
                if message.is_empty() {
                    "Failed to generate README".to_string()
                } else {
                    message
                }
            }
        }
    }

    /// HTTP status used when the error is reported as a plain JSON response
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingRepoUrl | Self::InvalidRepoUrl | Self::InvalidRequestBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::RequestTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ClientRateLimited => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ReadmeError::new("test error");
        assert!(matches!(error, ReadmeError::Message(_)));

        if let ReadmeError::Message(msg) = error {
            assert_eq!(msg, "test error");
        }
    }

    #[test]
    fn test_user_message_for_upstream_failures() {
        assert_eq!(
            ReadmeError::RepositoryNotFound.user_message(),
            "Repository not found. Please check the URL and ensure the repository is public."
        );
        assert!(ReadmeError::GitHubRateLimit.user_message().contains("rate limit exceeded"));
        assert_eq!(
            ReadmeError::GitHubApi("Server Error".into()).user_message(),
            "GitHub API error: Server Error"
        );
    }

    #[test]
    fn test_empty_message_falls_back() {
        assert_eq!(
            ReadmeError::Message(String::new()).user_message(),
            "Failed to generate README"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ReadmeError::MissingRepoUrl.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ReadmeError::RequestTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ReadmeError::ClientRateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ReadmeError::RepositoryNotFound.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
