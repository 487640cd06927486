//! Tapis v3 adapters for remote storage and job execution.

mod client;
mod files;
mod jobs;

pub use client::{TapisClient, TapisError};
pub use files::TapisFiles;
pub use jobs::TapisJobs;
