//! Repository data model and context assembly.
//!
//! The assembler turns repository metadata and the fetched file list into the
//! single text blob handed to the prompt builder. Selection is a fixed
//! heuristic: manifests, docs and likely entry points, in traversal order.

use crate::config::ContextLimits;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write;

const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "dockerfile",
    "docker-compose.yml",
    ".env.example",
    "setup.py",
    "cargo.toml",
    "go.mod",
];
const DOC_EXTENSIONS: &[&str] = &[".md", ".txt"];
const ENTRY_POINT_MARKERS: &[&str] = &["main.", "index.", "app."];
const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// A fetched file, immutable once produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path relative to the repository root
    pub path: String,
    /// Decoded file body
    pub content: String,
    /// Size reported by the hosting API, in bytes
    pub size: u64,
}

/// Licence block of the repository metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Human-readable licence name
    pub name: String,
}

/// Repository metadata as returned by the hosting API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Repository name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: Option<String>,
    /// Primary language
    #[serde(default)]
    pub language: Option<String>,
    /// Star count
    #[serde(default)]
    pub stargazers_count: u64,
    /// Fork count
    #[serde(default)]
    pub forks_count: u64,
    /// Project homepage
    #[serde(default)]
    pub homepage: Option<String>,
    /// Repository topics
    #[serde(default)]
    pub topics: Vec<String>,
    /// Licence, when one is detected
    #[serde(default)]
    pub license: Option<License>,
}

/// Everything known about a repository for one generation request
#[derive(Debug, Clone)]
pub struct RepositoryContext {
    /// Repository metadata
    pub info: RepositoryInfo,
    /// Files in traversal order
    pub files: Vec<FileEntry>,
}

impl RepositoryContext {
    /// Bundles metadata and files
    pub fn new(info: RepositoryInfo, files: Vec<FileEntry>) -> Self {
        Self { info, files }
    }

    /// Renders the bounded text blob for the prompt
    pub fn assemble(&self, limits: &ContextLimits) -> String {
        assemble(&self.info, &self.files, limits)
    }
}

/// Checks whether a path is worth including verbatim
pub fn is_important(path: &str) -> bool {
    let lower = path.to_lowercase();
    MANIFEST_FILES.contains(&lower.as_str())
        || DOC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
        || ENTRY_POINT_MARKERS.iter().any(|marker| path.contains(marker))
}

/// First `max_chars` characters of `content`, plus a marker when cut
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{}", &content[..byte_index], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

/// Distinct first path components, in first-seen order
pub fn top_level_entries(files: &[FileEntry], limit: usize) -> Vec<&str> {
    let mut seen = HashSet::new();
    files
        .iter()
        .filter_map(|file| file.path.split('/').next())
        .filter(|segment| seen.insert(*segment))
        .take(limit)
        .collect()
}

/// Builds the context text from metadata and the fetched files
pub fn assemble(info: &RepositoryInfo, files: &[FileEntry], limits: &ContextLimits) -> String {
    let mut context = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(context, "Repository: {}", info.name);
    let _ = writeln!(
        context,
        "Description: {}",
        info.description.as_deref().unwrap_or("No description provided")
    );
    let _ = writeln!(context, "Language: {}", info.language.as_deref().unwrap_or("Unknown"));
    let _ = writeln!(context, "Stars: {}", info.stargazers_count);
    let _ = writeln!(context, "Forks: {}", info.forks_count);
    let _ = writeln!(
        context,
        "Homepage: {}",
        info.homepage.as_deref().filter(|h| !h.is_empty()).unwrap_or("None")
    );
    let topics = if info.topics.is_empty() {
        "None".to_string()
    } else {
        info.topics.join(", ")
    };
    let _ = writeln!(context, "Topics: {}", topics);
    let _ = writeln!(
        context,
        "License: {}",
        info.license.as_ref().map(|l| l.name.as_str()).unwrap_or("Not specified")
    );
    context.push_str("\nFile Structure and Key Contents:\n");

    for file in files
        .iter()
        .filter(|file| is_important(&file.path))
        .take(limits.max_important_files)
    {
        let _ = write!(context, "\n--- {} ---\n", file.path);
        context.push_str(&truncate_content(&file.content, limits.max_file_chars));
    }

    context.push_str("\n\nDirectory Structure:\n");
    for entry in top_level_entries(files, limits.max_top_level_entries) {
        let _ = writeln!(context, "- {}", entry);
    }

    context
}
