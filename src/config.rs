//! Per-project settings.
//!
//! Loaded from `cdvtask.json` in the project directory, falling back to
//! defaults for missing fields or a missing file. A few values can be
//! overridden from the environment:
//! - `CDVTASK_EXPRESS_PORT` - port of the static dev server
//! - `CDVTASK_LIVERELOAD_PORT` - port of the live-reload server
//! - `CDVTASK_TOOLKIT` - program used to run toolkit commands

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE: &str = "cdvtask.json";

/// Platforms cordova knows about, in the order it enumerates them.
pub const SUPPORTED_PLATFORMS: &[&str] = &[
    "ios",
    "android",
    "ubuntu",
    "amazon-fireos",
    "wp8",
    "blackberry10",
    "firefoxos",
    "windows8",
    "windows",
    "browser",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },

    #[error("build_dir {build_dir:?} would delete {protected}; pick a directory of its own")]
    UnsafeBuildDir {
        build_dir: PathBuf,
        protected: PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdvConfig {
    /// Plugins to add, in order. These come from the plugin registry rather
    /// than npm and don't declare their plugin dependencies, so they can't be
    /// derived from `package.json`.
    pub plugins: Vec<String>,
    /// Platform targeted by `run` and `emulate`.
    pub test_platform: String,
    /// Extra toolkit options for `run`.
    pub run_options: Vec<String>,
    /// Platform prepared by `prepare` and served by `server`.
    pub serve_platform: String,
    /// App id handed to the toolkit's `create`.
    pub app_id: String,
    /// Build directory, relative to the project directory.
    pub build_dir: PathBuf,
    /// Source directory holding `config.xml` and `www/`.
    pub src_dir: PathBuf,
    pub express_port: u16,
    pub livereload_port: u16,
    pub toolkit_program: String,
    pub jshint_program: String,
    /// Platform identifiers scanned against the manifest's dependencies.
    pub platforms: Vec<String>,
}

impl Default for CdvConfig {
    fn default() -> Self {
        Self {
            plugins: vec!["org.apache.cordova.device".to_string()],
            test_platform: "android".to_string(),
            run_options: vec!["--device".to_string()],
            serve_platform: "browser".to_string(),
            app_id: "org.apache.cordova.example.HelloGulp".to_string(),
            build_dir: PathBuf::from("build"),
            src_dir: PathBuf::from("src"),
            express_port: 4000,
            livereload_port: 35729,
            toolkit_program: "cordova".to_string(),
            jshint_program: "jshint".to_string(),
            platforms: SUPPORTED_PLATFORMS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl CdvConfig {
    /// Load `cdvtask.json` from `project_dir` and apply environment overrides.
    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(&project_dir.join(CONFIG_FILE))?;
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate(project_dir)?;
        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production).
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(port) = parse_port(&lookup, "CDVTASK_EXPRESS_PORT")? {
            self.express_port = port;
        }
        if let Some(port) = parse_port(&lookup, "CDVTASK_LIVERELOAD_PORT")? {
            self.livereload_port = port;
        }
        if let Some(program) = lookup("CDVTASK_TOOLKIT") {
            self.toolkit_program = program;
        }
        Ok(())
    }

    /// Reject a build directory that contains the project or source
    /// directory, which `clean` would delete along with it.
    pub fn validate(&self, project_dir: &Path) -> Result<(), ConfigError> {
        let base = normalize(project_dir);
        let build = normalize(&project_dir.join(&self.build_dir));
        let src = normalize(&project_dir.join(&self.src_dir));

        for protected in [base, src] {
            if protected.starts_with(&build) {
                return Err(ConfigError::UnsafeBuildDir {
                    build_dir: self.build_dir.clone(),
                    protected,
                });
            }
        }
        Ok(())
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn parse_port(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u16>, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { var, value }),
        None => Ok(None),
    }
}
