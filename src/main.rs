use clap::Parser;
use colored::*;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info};
use readmegen::{
    error::{ReadmeError, Result},
    logging, Config, FrameDecoder, GenerateRequest, ReadmePipeline, RepositoryReference,
    StreamEvent,
};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::sync::mpsc;
use yansi::Paint;

#[derive(Parser)]
#[command(author, version, about = "Generate a README for a public GitHub repository", long_about = None)]
struct Cli {
    /// GitHub repository URL, e.g. https://github.com/owner/repo
    repo_url: String,

    /// Write the README to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use a running readmegen server instead of calling the APIs directly
    #[arg(short, long)]
    server: Option<String>,

    /// Log level (error, warn, info, debug, trace, off)
    #[arg(short, long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("{} {}", Paint::yellow("[WARNING]"), e);
    }

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("{} {}", "[ERROR]".bright_red().bold(), e.user_message());
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let reference = RepositoryReference::parse(&cli.repo_url)?;
    info!("Generating README for {}", reference);

    let pb = create_progress_bar();
    pb.set_message(format!("Preparing {}", reference));

    let outcome = match &cli.server {
        Some(server) => generate_remote(server, &cli.repo_url, &pb).await,
        None => generate_local(reference, &pb).await,
    };

    let (repo_name, readme) = match outcome {
        Ok(generated) => generated,
        Err(e) => {
            pb.finish_with_message(format!("{} {}", Paint::red("[FAILED]"), e.user_message()));
            return Err(e);
        }
    };

    pb.finish_with_message(format!(
        "{} {}",
        Paint::green("[OK]"),
        Paint::blue(format!("README generated for {}", repo_name))
    ));

    match cli.output {
        Some(path) => {
            tokio::fs::write(&path, &readme).await?;
            println!("\n{} README saved to {}", "[OK]".bright_green(), path.display().to_string().bright_white());
        }
        None => println!("\n{}", readme),
    }

    Ok(())
}

/// Runs the pipeline in-process, reporting progress on the spinner
async fn generate_local(reference: RepositoryReference, pb: &ProgressBar) -> Result<(String, String)> {
    let config = Config::load()?;
    config.validate()?;
    let pipeline = ReadmePipeline::from_config(&config)?;

    let (tx, mut rx) = mpsc::channel(8);
    let driver = pipeline.stream(reference, tx);
    let consumer = async {
        let mut terminal = None;
        while let Some(event) = rx.recv().await {
            show_progress(pb, &event);
            if event.is_terminal() {
                terminal = Some(event);
            }
        }
        terminal
    };

    let (_, terminal) = tokio::join!(driver, consumer);
    finish(terminal)
}

/// Posts to a readmegen server's streaming endpoint and decodes its frames
async fn generate_remote(server: &str, repo_url: &str, pb: &ProgressBar) -> Result<(String, String)> {
    let endpoint = url::Url::parse(server)?.join("/api/generate/stream")?;
    debug!("Streaming from {}", endpoint);

    let response = reqwest::Client::new()
        .post(endpoint)
        .json(&GenerateRequest {
            repo_url: repo_url.to_string(),
        })
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body: serde_json::Value = response.json().await.unwrap_or_default();
        let message = body
            .get("error")
            .and_then(|e| e.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Server responded with {}", status));
        return Err(ReadmeError::Message(message));
    }

    let mut decoder = FrameDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        for event in decoder.push(&chunk?) {
            let event = event?;
            show_progress(pb, &event);
            if event.is_terminal() {
                return finish(Some(event));
            }
        }
    }

    let trailing = decoder.finish().transpose()?;
    finish(trailing.filter(StreamEvent::is_terminal))
}

fn show_progress(pb: &ProgressBar, event: &StreamEvent) {
    debug!("Received {} event", event.status());
    match event {
        StreamEvent::Analyzing { message } | StreamEvent::Processing { message } => {
            pb.set_message(message.clone());
        }
        StreamEvent::Complete { .. } | StreamEvent::Error { .. } => {}
    }
}

fn finish(terminal: Option<StreamEvent>) -> Result<(String, String)> {
    match terminal {
        Some(StreamEvent::Complete { readme, repo_name }) => Ok((repo_name, readme)),
        Some(StreamEvent::Error { error }) => Err(ReadmeError::Message(error)),
        _ => Err(ReadmeError::new("Stream ended before the README was generated")),
    }
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style.tick_strings(&["-", "\\", "|", "/", "-", "\\", "|", "/"]));
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
