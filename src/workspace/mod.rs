//! Project layout and platform resolution.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::CdvConfig;
use crate::models::{platform_package, Manifest, PlatformEntry};

/// Every path the task runner touches, derived from the project directory and
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub base_dir: PathBuf,
    /// Disposable toolkit project. Also the project root of every toolkit
    /// command except `create`.
    pub build_dir: PathBuf,
    pub src_dir: PathBuf,
    pub node_modules: PathBuf,
    /// Directory served by the dev server.
    pub serve_root: PathBuf,
}

impl Layout {
    pub fn new(base_dir: impl Into<PathBuf>, config: &CdvConfig) -> Self {
        let base_dir = base_dir.into();
        let build_dir = base_dir.join(&config.build_dir);
        let serve_root = build_dir
            .join("platforms")
            .join(&config.serve_platform)
            .join("www");

        Self {
            src_dir: base_dir.join(&config.src_dir),
            node_modules: base_dir.join("node_modules"),
            build_dir,
            serve_root,
            base_dir,
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_dir.join("package.json")
    }

    pub fn src_config_xml(&self) -> PathBuf {
        self.src_dir.join("config.xml")
    }

    pub fn src_www(&self) -> PathBuf {
        self.src_dir.join("www")
    }

    /// Directory whose `*.js` files are linted.
    pub fn lint_dir(&self) -> PathBuf {
        self.src_www().join("js")
    }
}

/// Platforms declared by `manifest`, in the order of `supported`.
///
/// A platform `p` is declared when the manifest depends on `cordova-p`. A
/// manifest without dependencies yields no platforms.
pub fn resolve_platforms<S: AsRef<str>>(
    manifest: &Manifest,
    supported: &[S],
    node_modules: &Path,
) -> Vec<PlatformEntry> {
    let mut seen = HashSet::new();

    supported
        .iter()
        .map(|platform| platform_package(platform.as_ref()))
        .filter(|package| manifest.depends_on(package))
        .filter(|package| seen.insert(package.clone()))
        .map(|package| PlatformEntry {
            dir: node_modules.join(&package),
            id: package,
        })
        .collect()
}

/// Entries whose package directory hasn't been installed yet.
pub fn missing_platform_dirs(entries: &[PlatformEntry]) -> Vec<&PlatformEntry> {
    entries.iter().filter(|entry| !entry.dir.is_dir()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_derives_paths_from_config() {
        let layout = Layout::new("/work/app", &CdvConfig::default());

        assert_eq!(layout.build_dir, PathBuf::from("/work/app/build"));
        assert_eq!(layout.src_config_xml(), PathBuf::from("/work/app/src/config.xml"));
        assert_eq!(layout.src_www(), PathBuf::from("/work/app/src/www"));
        assert_eq!(
            layout.serve_root,
            PathBuf::from("/work/app/build/platforms/browser/www")
        );
        assert_eq!(layout.lint_dir(), PathBuf::from("/work/app/src/www/js"));
    }
}
