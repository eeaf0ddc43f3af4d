//! GitHub repository references and the contents-API fetcher.

use crate::config::{Config, FetchLimits};
use crate::context::{FileEntry, RepositoryContext, RepositoryInfo};
use crate::error::{ReadmeError, Result};
use async_recursion::async_recursion;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use url::Url;

const GITHUB_HOST: &str = "github.com";

/// Owner and name of a repository on github.com
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReference {
    /// Account or organisation owning the repository
    pub owner: String,
    /// Repository name, without a trailing `.git`
    pub name: String,
}

impl RepositoryReference {
    /// Parses and validates a `https://github.com/<owner>/<repo>` URL
    ///
    /// The host must be exactly `github.com`, the path must have at least two
    /// segments, and both of the first two may only contain ASCII letters,
    /// digits, `.`, `_` and `-`. Anything after the second segment is ignored.
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url.trim()).map_err(|_| ReadmeError::InvalidRepoUrl)?;

        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str() != Some(GITHUB_HOST) {
            return Err(ReadmeError::InvalidRepoUrl);
        }

        let mut segments = parsed
            .path_segments()
            .ok_or(ReadmeError::InvalidRepoUrl)?
            .filter(|segment| !segment.is_empty());

        let (owner, name) = match (segments.next(), segments.next()) {
            (Some(owner), Some(name)) => (owner, name),
            _ => return Err(ReadmeError::InvalidRepoUrl),
        };

        if !is_path_safe(owner) || !is_path_safe(name) {
            return Err(ReadmeError::InvalidRepoUrl);
        }

        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(ReadmeError::InvalidRepoUrl);
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn is_path_safe(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ContentKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: ContentKind,
    path: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContentListing {
    Directory(Vec<ContentItem>),
    Single(ContentItem),
}

impl ContentListing {
    fn into_items(self) -> Vec<ContentItem> {
        match self {
            Self::Directory(items) => items,
            Self::Single(item) => vec![item],
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileBody {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: Option<String>,
}

/// Client for the GitHub REST contents API
///
/// Every upstream call holds a permit from a shared semaphore, so at most
/// `FetchLimits::concurrency` requests are in flight per client.
#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    limits: FetchLimits,
    permits: Arc<Semaphore>,
}

impl GitHubClient {
    /// Creates a client against `base_url`, authenticating when a token is given
    pub fn new(base_url: &str, token: Option<String>, limits: FetchLimits) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("readmegen"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

        let client = Client::builder()
            .timeout(limits.timeout())
            .default_headers(headers)
            .build()?;

        if token.is_none() {
            warn!("No GitHub token configured, using anonymous rate limits");
        }

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            permits: Arc::new(Semaphore::new(limits.concurrency.max(1))),
            limits,
        })
    }

    /// Creates a client from the application configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.github_api_base,
            config.github_token.clone(),
            config.fetch.clone(),
        )
    }

    /// Fetches repository metadata and every eligible file
    pub async fn fetch_repository(&self, reference: &RepositoryReference) -> Result<RepositoryContext> {
        let info: RepositoryInfo = self
            .get_json(self.api_url(["repos", reference.owner.as_str(), reference.name.as_str()])?)
            .await?;

        let files = self.collect_files(reference, "").await?;
        info!("Fetched {} files from {}", files.len(), reference);

        Ok(RepositoryContext::new(info, files))
    }

    /// Checks whether a directory path is excluded from traversal
    pub fn is_excluded_dir(&self, path: &str) -> bool {
        self.limits
            .excluded_dirs
            .iter()
            .any(|excluded| path.contains(excluded.as_str()))
    }

    #[async_recursion]
    async fn collect_files(&self, reference: &RepositoryReference, path: &str) -> Result<Vec<FileEntry>> {
        let listing: ContentListing = self.get_json(self.contents_url(reference, path)?).await?;

        let batches: Vec<Vec<FileEntry>> = stream::iter(listing.into_items())
            .map(|item| self.visit(reference, item))
            .buffered(self.limits.concurrency.max(1))
            .try_collect()
            .await?;

        Ok(batches.into_iter().flatten().collect())
    }

    async fn visit(&self, reference: &RepositoryReference, item: ContentItem) -> Result<Vec<FileEntry>> {
        match item.kind {
            ContentKind::File if item.size < self.limits.max_file_size => {
                Ok(self.fetch_file(reference, item).await.into_iter().collect())
            }
            ContentKind::File => {
                debug!("Skipping large file: {} ({} bytes)", item.path, item.size);
                Ok(Vec::new())
            }
            ContentKind::Dir if !self.is_excluded_dir(&item.path) => {
                self.collect_files(reference, &item.path).await
            }
            ContentKind::Dir => {
                debug!("Skipping excluded directory: {}", item.path);
                Ok(Vec::new())
            }
            ContentKind::Other => Ok(Vec::new()),
        }
    }

    async fn fetch_file(&self, reference: &RepositoryReference, item: ContentItem) -> Option<FileEntry> {
        let url = match self.contents_url(reference, &item.path) {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping file: {} ({})", item.path, e);
                return None;
            }
        };

        match self.get_json::<FileBody>(url).await {
            Ok(body) => match decode_content(&body) {
                Some(content) => Some(FileEntry {
                    path: item.path,
                    content,
                    size: item.size,
                }),
                None => {
                    debug!("Skipping file without decodable content: {}", item.path);
                    None
                }
            },
            Err(e) => {
                warn!("Skipping file: {} ({})", item.path, e);
                None
            }
        }
    }

    fn contents_url(&self, reference: &RepositoryReference, path: &str) -> Result<Url> {
        let segments = ["repos", reference.owner.as_str(), reference.name.as_str(), "contents"]
            .into_iter()
            .chain(path.split('/').filter(|segment| !segment.is_empty()));
        self.api_url(segments)
    }

    fn api_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| ReadmeError::Config(format!("Invalid GitHub API base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ReadmeError::GitHubApi(e.to_string()))?;

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReadmeError::GitHubApi(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ReadmeError::GitHubApi(e.to_string()))
    }
}

/// Decodes a contents-API file body; `None` when absent, empty or undecodable
fn decode_content(body: &FileBody) -> Option<String> {
    let encoded = body.content.as_deref().filter(|content| !content.is_empty())?;
    match body.encoding.as_deref() {
        None | Some("base64") => {
            let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = STANDARD.decode(compact).ok()?;
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        Some(_) => None,
    }
}

async fn failure_from_response(response: Response) -> ReadmeError {
    let status = response.status();
    let quota_exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|value| value.to_str().ok())
        .map(|remaining| remaining.trim() == "0")
        .unwrap_or(false);

    let message = response
        .json::<ApiMessage>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| status.to_string());

    classify_failure(status, quota_exhausted, message)
}

/// Maps an unsuccessful upstream status to the error taxonomy
fn classify_failure(status: StatusCode, quota_exhausted: bool, message: String) -> ReadmeError {
    match status {
        StatusCode::NOT_FOUND => ReadmeError::RepositoryNotFound,
        StatusCode::UNAUTHORIZED => ReadmeError::GitHubAuth,
        StatusCode::TOO_MANY_REQUESTS => ReadmeError::GitHubRateLimit,
        StatusCode::FORBIDDEN
            if quota_exhausted || message.to_lowercase().contains("rate limit") =>
        {
            ReadmeError::GitHubRateLimit
        }
        _ => ReadmeError::GitHubApi(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://github.com/acme/widget", "acme", "widget" ; "plain")]
    #[test_case("https://github.com/acme/widget/", "acme", "widget" ; "trailing slash")]
    #[test_case("https://github.com/acme/widget.git", "acme", "widget" ; "git suffix")]
    #[test_case("https://github.com/acme/widget/tree/main/src", "acme", "widget" ; "deep path")]
    #[test_case("  https://github.com/a-b_c.d/x.y  ", "a-b_c.d", "x.y" ; "allowed punctuation")]
    #[test_case("http://github.com/acme/widget?tab=readme", "acme", "widget" ; "query string")]
    fn test_parse_valid(url: &str, owner: &str, name: &str) {
        let reference = RepositoryReference::parse(url).expect("valid url");
        assert_eq!(reference.owner, owner);
        assert_eq!(reference.name, name);
    }

    #[test_case("" ; "empty")]
    #[test_case("github.com/acme/widget" ; "no scheme")]
    #[test_case("https://gitlab.com/acme/widget" ; "other host")]
    #[test_case("https://www.github.com/acme/widget" ; "subdomain")]
    #[test_case("https://github.com.evil.io/acme/widget" ; "lookalike host")]
    #[test_case("https://github.com/acme" ; "one segment")]
    #[test_case("https://github.com/" ; "no segments")]
    #[test_case("https://github.com/ac%20me/widget" ; "encoded space")]
    #[test_case("https://github.com/acme/wid$get" ; "dollar")]
    #[test_case("https://github.com/acme/.git" ; "empty name after suffix")]
    #[test_case("ftp://github.com/acme/widget" ; "unsupported scheme")]
    fn test_parse_invalid(url: &str) {
        assert!(matches!(
            RepositoryReference::parse(url),
            Err(ReadmeError::InvalidRepoUrl)
        ));
    }

    #[test]
    fn test_reference_display() {
        let reference = RepositoryReference::parse("https://github.com/acme/widget").expect("valid url");
        assert_eq!(reference.to_string(), "acme/widget");
    }

    #[test]
    fn test_excluded_dirs_use_substring_match() {
        let client = GitHubClient::new("https://api.github.com", None, FetchLimits::default())
            .expect("client");
        assert!(client.is_excluded_dir("node_modules"));
        assert!(client.is_excluded_dir("packages/web/node_modules"));
        assert!(client.is_excluded_dir(".github"));
        assert!(client.is_excluded_dir("distribution"));
        assert!(client.is_excluded_dir("tools/build-scripts"));
        assert!(!client.is_excluded_dir("src"));
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let client = GitHubClient::new("http://127.0.0.1:9999/", None, FetchLimits::default())
            .expect("client");
        let reference = RepositoryReference {
            owner: "acme".into(),
            name: "widget".into(),
        };

        let root = client.contents_url(&reference, "").expect("url");
        assert_eq!(root.as_str(), "http://127.0.0.1:9999/repos/acme/widget/contents");

        let nested = client.contents_url(&reference, "docs/my guide.md").expect("url");
        assert_eq!(
            nested.as_str(),
            "http://127.0.0.1:9999/repos/acme/widget/contents/docs/my%20guide.md"
        );
    }

    #[test]
    fn test_decode_content() {
        let body = FileBody {
            content: Some("IyBXaWRn\nZXQK\n".into()),
            encoding: Some("base64".into()),
        };
        assert_eq!(decode_content(&body).as_deref(), Some("# Widget\n"));

        let empty = FileBody {
            content: Some(String::new()),
            encoding: Some("base64".into()),
        };
        assert_eq!(decode_content(&empty), None);

        let broken = FileBody {
            content: Some("!!!not base64!!!".into()),
            encoding: Some("base64".into()),
        };
        assert_eq!(decode_content(&broken), None);

        let unsupported = FileBody {
            content: Some("abc".into()),
            encoding: Some("none".into()),
        };
        assert_eq!(decode_content(&unsupported), None);
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, false, "Not Found".into()),
            ReadmeError::RepositoryNotFound
        ));
        assert!(matches!(
            classify_failure(StatusCode::UNAUTHORIZED, false, "Bad credentials".into()),
            ReadmeError::GitHubAuth
        ));
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, false, "API rate limit exceeded for 1.2.3.4".into()),
            ReadmeError::GitHubRateLimit
        ));
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, true, "Forbidden".into()),
            ReadmeError::GitHubRateLimit
        ));
        match classify_failure(StatusCode::FORBIDDEN, false, "Resource not accessible".into()) {
            ReadmeError::GitHubApi(message) => assert_eq!(message, "Resource not accessible"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
