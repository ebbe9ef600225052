//! Long-running batch services, separated from UI concerns.

mod download;

pub use download::{DownloadConfig, DownloadEvent, DownloadService, DownloadSummary};
