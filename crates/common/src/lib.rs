//! Sheetanim Common Utilities
//!
//! Shared infrastructure for all Sheetanim crates:
//! - Error taxonomy and result aliases
//! - Injectable clock used for artifact timestamps and retention
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
