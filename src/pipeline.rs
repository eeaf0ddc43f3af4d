//! Request pipeline: fetch, assemble, prompt, generate.
//!
//! Steps run strictly in sequence for one request. The streaming variant
//! reports each step as a [`StreamEvent`] and stops early when the receiving
//! side goes away.

use crate::config::{Config, ContextLimits};
use crate::context::RepositoryContext;
use crate::error::{ReadmeError, Result};
use crate::github::{GitHubClient, RepositoryReference};
use crate::llm::{GeminiClient, ReadmeGenerator};
use crate::prompts;
use crate::stream::StreamEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Result of a successful generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedReadme {
    /// Generated markdown
    pub readme: String,
    /// Repository name as reported by the hosting API
    #[serde(rename = "repoName")]
    pub repo_name: String,
    /// Number of files fetched
    #[serde(skip)]
    pub file_count: usize,
}

/// How a streaming request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// A `complete` event was delivered
    Completed,
    /// An `error` event was emitted
    Failed,
    /// The receiver went away before a terminal event
    Cancelled,
}

/// Orchestrates one README generation per call
pub struct ReadmePipeline {
    github: GitHubClient,
    generator: Arc<dyn ReadmeGenerator>,
    limits: ContextLimits,
}

impl ReadmePipeline {
    /// Creates a pipeline from its collaborators
    pub fn new(github: GitHubClient, generator: Arc<dyn ReadmeGenerator>, limits: ContextLimits) -> Self {
        Self {
            github,
            generator,
            limits,
        }
    }

    /// Creates a pipeline backed by GitHub and Gemini
    pub fn from_config(config: &Config) -> Result<Self> {
        let github = GitHubClient::from_config(config)?;
        let generator = Arc::new(GeminiClient::from_config(config)?);
        Ok(Self::new(github, generator, config.context.clone()))
    }

    /// Runs the whole pipeline and returns the README
    pub async fn generate(&self, reference: &RepositoryReference) -> Result<GeneratedReadme> {
        info!("Fetching repository contents for {}", reference);
        let repository = self.github.fetch_repository(reference).await?;

        info!("Found {} files, generating README...", repository.files.len());
        self.write_readme(repository).await
    }

    /// Runs the pipeline, reporting progress on `events`
    ///
    /// Emits `analyzing`, `processing` and `complete` in that order, or an
    /// `error` event as soon as a step fails. `events` is dropped on return,
    /// which ends the stream. If the receiver is dropped first, in-flight
    /// upstream calls are abandoned.
    pub async fn stream(&self, reference: RepositoryReference, events: mpsc::Sender<StreamEvent>) -> StreamOutcome {
        let outcome = tokio::select! {
            _ = events.closed() => {
                warn!("Client disconnected, aborting generation for {}", reference);
                return StreamOutcome::Cancelled;
            }
            outcome = self.drive(&reference, &events) => outcome,
        };

        match outcome {
            Ok(()) => StreamOutcome::Completed,
            Err(ReadmeError::Cancelled) => StreamOutcome::Cancelled,
            Err(e) => {
                error!("Error generating README for {}: {}", reference, e);
                match events.send(StreamEvent::failed(&e)).await {
                    Ok(()) => StreamOutcome::Failed,
                    Err(_) => StreamOutcome::Cancelled,
                }
            }
        }
    }

    async fn drive(&self, reference: &RepositoryReference, events: &mpsc::Sender<StreamEvent>) -> Result<()> {
        emit(events, StreamEvent::analyzing()).await?;

        info!("Fetching repository contents for {}", reference);
        let repository = self.github.fetch_repository(reference).await?;

        emit(events, StreamEvent::processing(repository.files.len())).await?;
        info!("Found {} files, generating README...", repository.files.len());

        let generated = self.write_readme(repository).await?;
        emit(
            events,
            StreamEvent::Complete {
                readme: generated.readme,
                repo_name: generated.repo_name,
            },
        )
        .await
    }

    async fn write_readme(&self, repository: RepositoryContext) -> Result<GeneratedReadme> {
        let context = repository.assemble(&self.limits);
        let prompt = prompts::readme_prompt(&context);

        let readme = self.generator.generate(&prompt).await?;
        if readme.trim().is_empty() {
            return Err(ReadmeError::EmptyReadme);
        }

        info!(
            "Generated README for {} with {} ({} chars)",
            repository.info.name,
            self.generator.name(),
            readme.len()
        );

        Ok(GeneratedReadme {
            readme,
            repo_name: repository.info.name,
            file_count: repository.files.len(),
        })
    }
}

async fn emit(events: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<()> {
    events.send(event).await.map_err(|_| ReadmeError::Cancelled)
}
