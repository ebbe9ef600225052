//! Wayback Machine snapshot URL construction.
//!
//! All plays.tv pages are reached through archived captures of the form
//! `{archive_base}/web/{timestamp}/{original_url}`. Page discovery uses the
//! site's `ws/module` endpoint, captured separately from the profile pages,
//! so the locator carries two snapshot timestamps.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Wayback Machine base URL.
pub const ARCHIVE_BASE_URL: &str = "https://web.archive.org";

/// Original site base URL.
pub const SITE_BASE_URL: &str = "https://plays.tv";

/// Snapshot timestamp covering profile and embed pages.
pub const DEFAULT_SNAPSHOT: &str = "20191210043532";

/// Snapshot timestamp covering the `ws/module` pagination endpoint.
pub const DEFAULT_MODULE_SNAPSHOT: &str = "20191210164839";

/// Builds archived URLs for one crawl.
#[derive(Debug, Clone)]
pub struct ArchiveLocator {
    archive_base: String,
    snapshot: String,
    module_snapshot: String,
}

impl ArchiveLocator {
    /// Create a locator for the given snapshot timestamps.
    pub fn new(snapshot: impl Into<String>, module_snapshot: impl Into<String>) -> Self {
        Self {
            archive_base: ARCHIVE_BASE_URL.to_string(),
            snapshot: snapshot.into(),
            module_snapshot: module_snapshot.into(),
        }
    }

    /// Override the archive base URL (for testing or mirror instances).
    pub fn with_archive_base(mut self, base: impl Into<String>) -> Self {
        self.archive_base = base.into();
        self
    }

    /// Archived profile page: `.../web/{snapshot}/https://plays.tv/u/{username}`.
    pub fn profile_url(&self, username: &str) -> String {
        format!(
            "{}/web/{}/{}/u/{}",
            self.archive_base, self.snapshot, SITE_BASE_URL, username
        )
    }

    /// Archived embed (detail) page for a video id.
    pub fn embed_url(&self, video_id: &str) -> String {
        format!(
            "{}/web/{}/{}/embeds/{}",
            self.archive_base, self.snapshot, SITE_BASE_URL, video_id
        )
    }

    /// Archived pagination query for one slice of a profile's video list.
    ///
    /// Parameter order matches the original site client; `last_id` is the
    /// continuation token the endpoint needs to compute the next slice.
    pub fn module_query_url(&self, profile_id: &str, page_num: u32, last_id: &str) -> String {
        format!(
            "{}/web/{}/{}/ws/module?section=videos&page_num={}&target_user_id={}&infinite_scroll=true&last_id={}&custom_loading_module_state=appending&infinite_scroll_fire_only=true&format={}&id=UserVideosMod",
            self.archive_base,
            self.module_snapshot,
            SITE_BASE_URL,
            page_num,
            urlencoding::encode(profile_id),
            urlencoding::encode(last_id),
            urlencoding::encode("application/json"),
        )
    }
}

impl Default for ArchiveLocator {
    fn default() -> Self {
        Self::new(DEFAULT_SNAPSHOT, DEFAULT_MODULE_SNAPSHOT)
    }
}

/// Parse a snapshot timestamp (`YYYYMMDDhhmmss`) into `DateTime<Utc>`.
/// Used to reject malformed timestamp overrides before any request is made.
pub fn parse_snapshot_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    if ts.len() < 14 {
        return None;
    }
    NaiveDateTime::parse_from_str(&ts[..14], "%Y%m%d%H%M%S")
        .ok()
        .map(|dt| dt.and_utc())
}
