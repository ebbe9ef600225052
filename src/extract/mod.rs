//! Pure extraction over already-fetched archive pages.
//!
//! Nothing in this module touches the network; the crawler and downloader
//! hand in page bodies and interpret the typed results.

mod catalog;
mod media;

pub use catalog::{
    extract_page_items, extract_profile_id, extract_video_catalog, CatalogItem, PageItems,
};
pub use media::extract_media_candidates;

use thiserror::Error;

/// A page's shape did not match expectations. Always localized to the single
/// page being parsed; callers decide whether that ends the crawl or just the
/// page.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("page missing {0}")]
    MissingElement(&'static str),

    #[error("malformed metadata: {0}")]
    Json(#[from] serde_json::Error),
}
