//! Domain models for cdvtask.
//!
//! - [`Manifest`]: the app's `package.json`, loaded once and never mutated.
//! - [`PlatformEntry`]: a supported platform package declared by the manifest,
//!   paired with the directory npm installed it into.

mod manifest;
mod platform;

pub use manifest::*;
pub use platform::*;
