//! CLI argument definitions for the Tome application.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// Tome — ask questions against a folder of indexed documents.
#[derive(Parser, Debug)]
#[command(name = "tome", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Folder of source documents to index and query.
    #[arg(short = 'd', long = "docs-dir")]
    pub docs_dir: Option<PathBuf>,

    /// Location of the persisted vector index.
    #[arg(long = "index-path")]
    pub index_path: Option<PathBuf>,

    /// Number of passages retrieved per question.
    #[arg(short = 'k', long = "top-k")]
    pub top_k: Option<usize>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TOME_CONFIG env var > ~/.tome/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TOME_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the document folder.
    ///
    /// Priority: --docs-dir flag > TOME_DOCS_DIR env var > config file value.
    pub fn resolve_docs_dir(&self, config_dir: &PathBuf) -> PathBuf {
        if let Some(ref p) = self.docs_dir {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TOME_DOCS_DIR") {
            return PathBuf::from(p);
        }
        config_dir.clone()
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".tome").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".tome").join("config.toml");
    }
    PathBuf::from("config.toml")
}
