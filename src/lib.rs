//! mediaprobe - Media container probing tool
//!
//! This library crate exposes the CLI's building blocks for integration testing.

pub mod config;
pub mod loader;
pub mod report;
