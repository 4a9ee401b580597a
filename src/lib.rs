//! Nalscope - HEVC elementary stream inspector
//!
//! This library crate exposes the file-level scanning and reporting used by
//! the CLI, for integration testing.

pub mod config;
pub mod inspect;
pub mod report;
pub mod source;
