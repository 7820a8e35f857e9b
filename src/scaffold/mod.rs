//! Creating and deleting the build directory.
//!
//! The build directory is a disposable toolkit project. `clean` removes it,
//! and the two `recreate_*` functions rebuild it from `src/` plus the
//! configured plugins and the platforms declared in `package.json`.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::PlatformEntry;
use crate::toolkit::{Toolkit, ToolkitError};
use crate::workspace::Layout;

#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("Build directory already exists: {0} (run `clean` first)")]
    BuildDirExists(PathBuf),

    #[error("{action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error(transparent)]
    Toolkit(#[from] ToolkitError),
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> ScaffoldError {
    let path = path.to_path_buf();
    move |source| ScaffoldError::Io {
        action,
        path,
        source,
    }
}

/// Delete the build directory and everything under it. Succeeds when there is
/// nothing to delete.
pub async fn clean(build_dir: &Path) -> Result<(), ScaffoldError> {
    match tokio::fs::remove_dir_all(build_dir).await {
        Ok(()) => {
            tracing::info!(dir = %build_dir.display(), "Removed build directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(dir = %build_dir.display(), "Build directory already absent");
            Ok(())
        }
        Err(e) => Err(io_error("Failed to remove", build_dir)(e)),
    }
}

/// Build a toolkit project by linking `config.xml` and `www/` from the source
/// tree into a fresh build directory.
///
/// Plugins are added before platforms: the toolkit expects the `plugins`
/// directory to exist when adding platforms and only creates it while adding
/// plugins. Platforms are not added if adding plugins fails.
pub async fn recreate_linked(
    layout: &Layout,
    plugins: &[String],
    platforms: &[PlatformEntry],
    toolkit: &dyn Toolkit,
) -> Result<(), ScaffoldError> {
    let root = &layout.build_dir;
    ensure_absent(root).await?;

    let config_xml = layout.src_config_xml();
    let www = layout.src_www();
    ensure_source(&config_xml).await?;
    ensure_source(&www).await?;

    tokio::fs::create_dir(root)
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => ScaffoldError::BuildDirExists(root.clone()),
            _ => io_error("Failed to create", root)(e),
        })?;
    tracing::info!(dir = %root.display(), "Created build directory");

    symlink_file(&config_xml, &root.join("config.xml")).await?;
    symlink_dir(&www, &root.join("www")).await?;

    toolkit.add_plugins(root, plugins).await?;
    toolkit.add_platforms(root, &platform_dirs(platforms)).await?;

    tracing::info!(
        plugins = plugins.len(),
        platforms = platforms.len(),
        "Build directory recreated"
    );
    Ok(())
}

/// Build a toolkit project with the toolkit's own `create`, linking the source
/// `www/` so edits show up without copying.
///
/// Platforms are added before plugins here since `create` already made the
/// `plugins` directory.
pub async fn recreate_scaffolded(
    layout: &Layout,
    app_id: &str,
    app_name: &str,
    plugins: &[String],
    platforms: &[PlatformEntry],
    toolkit: &dyn Toolkit,
) -> Result<(), ScaffoldError> {
    let root = &layout.build_dir;
    ensure_absent(root).await?;

    let www = layout.src_www();
    toolkit.create(root, app_id, app_name, Some(&www)).await?;

    toolkit.add_platforms(root, &platform_dirs(platforms)).await?;
    toolkit.add_plugins(root, plugins).await?;

    tracing::info!(
        plugins = plugins.len(),
        platforms = platforms.len(),
        "Build directory scaffolded"
    );
    Ok(())
}

fn platform_dirs(platforms: &[PlatformEntry]) -> Vec<PathBuf> {
    platforms.iter().map(|p| p.dir.clone()).collect()
}

async fn ensure_absent(dir: &Path) -> Result<(), ScaffoldError> {
    match tokio::fs::symlink_metadata(dir).await {
        Ok(_) => Err(ScaffoldError::BuildDirExists(dir.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error("Failed to inspect", dir)(e)),
    }
}

/// Symlinks happily point at nothing, so check the target first.
async fn ensure_source(path: &Path) -> Result<(), ScaffoldError> {
    tokio::fs::metadata(path)
        .await
        .map(|_| ())
        .map_err(io_error("Missing source", path))
}

#[cfg(unix)]
async fn symlink_file(target: &Path, link: &Path) -> Result<(), ScaffoldError> {
    tokio::fs::symlink(target, link)
        .await
        .map_err(io_error("Failed to link", link))
}

#[cfg(unix)]
async fn symlink_dir(target: &Path, link: &Path) -> Result<(), ScaffoldError> {
    tokio::fs::symlink(target, link)
        .await
        .map_err(io_error("Failed to link", link))
}

#[cfg(windows)]
async fn symlink_file(target: &Path, link: &Path) -> Result<(), ScaffoldError> {
    tokio::fs::symlink_file(target, link)
        .await
        .map_err(io_error("Failed to link", link))
}

#[cfg(windows)]
async fn symlink_dir(target: &Path, link: &Path) -> Result<(), ScaffoldError> {
    tokio::fs::symlink_dir(target, link)
        .await
        .map_err(io_error("Failed to link", link))
}
