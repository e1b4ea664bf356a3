//! Sheetanim Engine
//!
//! The conversion pipeline as callers see it:
//! - **ops:** stateless `analyze`, `slice` and `encode` on raw bytes
//! - **job:** one conversion request moving through its states
//! - **service:** the two-step analyze-then-convert flow, with results
//!   handed between calls through an artifact store

pub mod job;
pub mod ops;
pub mod service;

pub use job::{ConversionJob, JobFailure, JobState};
pub use ops::{analyze, encode, slice, AnalysisReport, ImageSize};
pub use service::{ConversionService, ConvertRequest};
