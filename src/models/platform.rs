use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Prefix shared by every Cordova platform package on npm.
pub const PLATFORM_PACKAGE_PREFIX: &str = "cordova-";

/// A platform the project builds for.
///
/// `id` is the npm package name (e.g. `cordova-android`), `dir` is where npm
/// installed it. The toolkit is handed `dir` so it never downloads platform
/// files itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformEntry {
    pub id: String,
    pub dir: PathBuf,
}

impl PlatformEntry {
    /// Platform name without the package prefix (`android` for `cordova-android`).
    pub fn platform_name(&self) -> &str {
        self.id
            .strip_prefix(PLATFORM_PACKAGE_PREFIX)
            .unwrap_or(&self.id)
    }
}

/// Package name for a platform identifier.
pub fn platform_package(platform: &str) -> String {
    format!("{}{}", PLATFORM_PACKAGE_PREFIX, platform)
}
