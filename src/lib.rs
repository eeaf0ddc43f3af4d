#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! readmegen - README generation for public GitHub repositories
//!
//! The library fetches a repository through the GitHub REST API, assembles a
//! bounded text context from its metadata and most relevant files, and asks a
//! generative model to write a README. Results are served over HTTP either as
//! a single JSON document or as a stream of progress events.
//!
//! ## Usage
//! ```rust,ignore
//! use readmegen::{Config, ReadmePipeline, RepositoryReference};
//!
//! async fn example() -> readmegen::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = ReadmePipeline::from_config(&config)?;
//!     let reference = RepositoryReference::parse("https://github.com/rust-lang/log")?;
//!
//!     let generated = pipeline.generate(&reference).await?;
//!     println!("{}", generated.readme);
//!     Ok(())
//! }
//! ```

/// Configuration module for the application
pub mod config;
/// Error handling types and utilities
pub mod error;
/// Logging configuration and utilities
pub mod logging;
/// Metrics collection and reporting
pub mod metrics;
/// Per-client request limiting
pub mod rate_limiter;
/// GitHub REST API client and repository URL parsing
pub mod github;
/// Context assembly from repository metadata and files
pub mod context;
/// Prompt templates
pub mod prompts;
/// Generative model clients
pub mod llm;
/// Progress event framing for streaming responses
pub mod stream;
/// Fetch, assemble and generate pipeline
pub mod pipeline;
/// REST API functionality for the web service
pub mod api;

// Re-export common types
pub use api::{router, AppState, GenerateRequest};
pub use config::Config;
pub use context::{FileEntry, RepositoryContext, RepositoryInfo};
pub use error::{ReadmeError, Result};
pub use github::{GitHubClient, RepositoryReference};
pub use llm::{GeminiClient, ReadmeGenerator};
pub use pipeline::{GeneratedReadme, ReadmePipeline, StreamOutcome};
pub use stream::{FrameDecoder, StreamEvent};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
