//! The external packaging toolkit.
//!
//! Every operation names the toolkit project it acts on. The toolkit infers
//! its project from the working directory, so implementations run each
//! command inside `root`. The process working directory is never changed.

mod cordova;
pub mod process;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use cordova::{CordovaCli, CordovaCommand};

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}){}", format_stderr(.stderr))]
    Failed {
        command: String,
        status: String,
        /// Last lines the command wrote to stderr.
        stderr: Vec<String>,
    },

    #[error("I/O error while running toolkit command: {0}")]
    Io(#[from] std::io::Error),
}

fn format_stderr(lines: &[String]) -> String {
    if lines.is_empty() {
        String::new()
    } else {
        format!(":\n{}", lines.join("\n"))
    }
}

/// Options for `build`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOptions {
    pub release: bool,
    /// Platforms to build. Empty builds every installed platform.
    pub platforms: Vec<String>,
    /// Extra options passed through to the platform build scripts.
    pub options: Vec<String>,
}

impl BuildOptions {
    pub fn release() -> Self {
        Self {
            release: true,
            ..Self::default()
        }
    }
}

/// Commands the task runner issues against a toolkit project.
///
/// Failures are returned unchanged; nothing here retries.
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Scaffold a new project at `target_dir`. When `link_www` is given the
    /// project's `www` refers to that directory instead of a copy.
    async fn create(
        &self,
        target_dir: &Path,
        app_id: &str,
        app_name: &str,
        link_www: Option<&Path>,
    ) -> Result<(), ToolkitError>;

    async fn prepare(&self, root: &Path, platform: Option<&str>) -> Result<(), ToolkitError>;

    async fn build(&self, root: &Path, options: &BuildOptions) -> Result<(), ToolkitError>;

    async fn run(
        &self,
        root: &Path,
        platforms: &[String],
        options: &[String],
    ) -> Result<(), ToolkitError>;

    async fn emulate(&self, root: &Path, platforms: &[String]) -> Result<(), ToolkitError>;

    /// Add platforms from local package directories.
    async fn add_platforms(&self, root: &Path, dirs: &[PathBuf]) -> Result<(), ToolkitError>;

    async fn add_plugins(&self, root: &Path, plugins: &[String]) -> Result<(), ToolkitError>;
}
