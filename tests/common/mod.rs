//! Shared fixtures for the integration specs.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use cdvtask::config::CdvConfig;
use cdvtask::models::Manifest;
use cdvtask::project::Project;
use cdvtask::toolkit::{BuildOptions, Toolkit, ToolkitError};
use cdvtask::workspace::Layout;

/// A toolkit call as seen by [`RecordingToolkit`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create {
        target_dir: PathBuf,
        app_id: String,
        app_name: String,
        link_www: Option<PathBuf>,
    },
    Prepare {
        root: PathBuf,
        platform: Option<String>,
    },
    Build {
        root: PathBuf,
        options: BuildOptions,
    },
    Run {
        root: PathBuf,
        platforms: Vec<String>,
        options: Vec<String>,
    },
    Emulate {
        root: PathBuf,
        platforms: Vec<String>,
    },
    AddPlatforms {
        root: PathBuf,
        dirs: Vec<PathBuf>,
    },
    AddPlugins {
        root: PathBuf,
        plugins: Vec<String>,
    },
}

impl Call {
    pub fn op(&self) -> &'static str {
        match self {
            Call::Create { .. } => "create",
            Call::Prepare { .. } => "prepare",
            Call::Build { .. } => "build",
            Call::Run { .. } => "run",
            Call::Emulate { .. } => "emulate",
            Call::AddPlatforms { .. } => "add_platforms",
            Call::AddPlugins { .. } => "add_plugins",
        }
    }
}

/// Records every call; fails the operation named by `fail_on`.
#[derive(Default)]
pub struct RecordingToolkit {
    calls: Mutex<Vec<Call>>,
    fail_on: Option<&'static str>,
}

impl RecordingToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(op: &'static str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_on: Some(op),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ops(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::op).collect()
    }

    fn record(&self, call: Call) -> Result<(), ToolkitError> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);

        if self.fail_on == Some(op) {
            return Err(ToolkitError::Failed {
                command: format!("cordova {}", op),
                status: "exit status: 1".to_string(),
                stderr: vec![format!("{} exploded", op)],
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Toolkit for RecordingToolkit {
    async fn create(
        &self,
        target_dir: &Path,
        app_id: &str,
        app_name: &str,
        link_www: Option<&Path>,
    ) -> Result<(), ToolkitError> {
        self.record(Call::Create {
            target_dir: target_dir.to_path_buf(),
            app_id: app_id.to_string(),
            app_name: app_name.to_string(),
            link_www: link_www.map(Path::to_path_buf),
        })
    }

    async fn prepare(&self, root: &Path, platform: Option<&str>) -> Result<(), ToolkitError> {
        self.record(Call::Prepare {
            root: root.to_path_buf(),
            platform: platform.map(str::to_string),
        })
    }

    async fn build(&self, root: &Path, options: &BuildOptions) -> Result<(), ToolkitError> {
        self.record(Call::Build {
            root: root.to_path_buf(),
            options: options.clone(),
        })
    }

    async fn run(
        &self,
        root: &Path,
        platforms: &[String],
        options: &[String],
    ) -> Result<(), ToolkitError> {
        self.record(Call::Run {
            root: root.to_path_buf(),
            platforms: platforms.to_vec(),
            options: options.to_vec(),
        })
    }

    async fn emulate(&self, root: &Path, platforms: &[String]) -> Result<(), ToolkitError> {
        self.record(Call::Emulate {
            root: root.to_path_buf(),
            platforms: platforms.to_vec(),
        })
    }

    async fn add_platforms(&self, root: &Path, dirs: &[PathBuf]) -> Result<(), ToolkitError> {
        self.record(Call::AddPlatforms {
            root: root.to_path_buf(),
            dirs: dirs.to_vec(),
        })
    }

    async fn add_plugins(&self, root: &Path, plugins: &[String]) -> Result<(), ToolkitError> {
        self.record(Call::AddPlugins {
            root: root.to_path_buf(),
            plugins: plugins.to_vec(),
        })
    }
}

pub const MANIFEST: &str = r#"{
    "name": "hello-gulp",
    "dependencies": {
        "cordova-android": "^3.6.0",
        "cordova-browser": "^3.6.0",
        "del": "^1.1.0"
    }
}"#;

/// A checkout with `package.json`, `src/config.xml` and `src/www/`, and no
/// build directory.
pub fn checkout() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let src = dir.path().join("src");
    fs::create_dir_all(src.join("www").join("js")).unwrap();
    fs::write(src.join("config.xml"), "<widget id=\"org.example\"/>").unwrap();
    fs::write(src.join("www").join("index.html"), "<html><body></body></html>").unwrap();
    fs::write(dir.path().join("package.json"), MANIFEST).unwrap();
    dir
}

pub fn layout(dir: &TempDir) -> Layout {
    Layout::new(dir.path(), &CdvConfig::default())
}

/// A project over `dir` driving `toolkit`.
pub fn project(dir: &TempDir, toolkit: Arc<RecordingToolkit>) -> Arc<Project> {
    let config = CdvConfig::default();
    let layout = Layout::new(dir.path(), &config);
    let manifest = Manifest::from_json(MANIFEST).unwrap();
    Arc::new(Project::new(config, layout, manifest, toolkit))
}
