//! Everything a task needs to know about the app being built.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::CdvConfig;
use crate::models::{Manifest, PlatformEntry};
use crate::toolkit::{CordovaCli, Toolkit};
use crate::workspace::{missing_platform_dirs, resolve_platforms, Layout};

pub struct Project {
    pub config: CdvConfig,
    pub layout: Layout,
    pub manifest: Manifest,
    /// Platforms declared in the manifest, resolved once at startup.
    pub platforms: Vec<PlatformEntry>,
    pub toolkit: Arc<dyn Toolkit>,
}

impl Project {
    /// Load config and manifest from `project_dir` and drive the configured
    /// cordova program.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let base_dir = std::fs::canonicalize(project_dir)
            .with_context(|| format!("Project directory not found: {}", project_dir.display()))?;

        let config = CdvConfig::load(&base_dir)?;
        let layout = Layout::new(&base_dir, &config);
        let manifest = Manifest::load(&layout.manifest_path())?;
        let toolkit = Arc::new(CordovaCli::new(config.toolkit_program.clone()));

        let project = Self::new(config, layout, manifest, toolkit);

        for entry in missing_platform_dirs(&project.platforms) {
            tracing::warn!(
                platform = %entry.id,
                dir = %entry.dir.display(),
                "Platform package not installed, run `npm install`"
            );
        }
        if project.platforms.is_empty() {
            tracing::warn!("package.json declares no cordova platform packages");
        }

        Ok(project)
    }

    pub fn new(
        config: CdvConfig,
        layout: Layout,
        manifest: Manifest,
        toolkit: Arc<dyn Toolkit>,
    ) -> Self {
        let platforms = resolve_platforms(&manifest, &config.platforms, &layout.node_modules);
        tracing::debug!(
            platforms = ?platforms.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
            "Resolved platforms"
        );

        Self {
            config,
            layout,
            manifest,
            platforms,
            toolkit,
        }
    }

    /// Platforms `run` and `emulate` target.
    pub fn test_platforms(&self) -> Vec<String> {
        vec![self.config.test_platform.clone()]
    }
}
