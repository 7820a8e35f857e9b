//! Task runner for a Cordova app whose native project lives in a disposable
//! build directory.
//!
//! The crate resolves the project's platform packages from `package.json`,
//! recreates the build directory, drives the `cordova` toolkit against it and
//! serves the browser platform with live-reload during development.

pub mod config;
pub mod lint;
pub mod models;
pub mod project;
pub mod scaffold;
pub mod server;
pub mod tasks;
pub mod toolkit;
pub mod workspace;
