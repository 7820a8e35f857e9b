//! JavaScript linting through the external `jshint` program.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::toolkit::process::run_command;

/// Result of one lint run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    pub files: Vec<PathBuf>,
    /// False when jshint reported problems.
    pub clean: bool,
}

pub struct Linter {
    program: String,
}

impl Linter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Lint the `*.js` files directly inside `dir`.
    ///
    /// Findings are printed by jshint and reported through [`LintReport`];
    /// only failing to run jshint at all is an error.
    pub async fn lint_dir(&self, dir: &Path) -> Result<LintReport> {
        let files = js_files(dir)?;
        if files.is_empty() {
            tracing::info!(dir = %dir.display(), "No JavaScript files to lint");
            return Ok(LintReport { files, clean: true });
        }

        let args: Vec<OsString> = files.iter().map(OsString::from).collect();
        let finished = run_command(&self.program, &args, dir).await?;
        let clean = finished.status.success();

        if clean {
            tracing::info!(files = files.len(), "jshint found no problems");
        } else {
            tracing::warn!(files = files.len(), status = %finished.status, "jshint reported problems");
        }

        Ok(LintReport { files, clean })
    }
}

/// `dir/*.js`, sorted. A missing directory has no files.
fn js_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", dir.display())),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "js") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
