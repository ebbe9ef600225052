//! Media source resolution for archived embed pages.

use std::cmp::Reverse;

use scraper::{Html, Selector};
use tracing::warn;

use crate::models::MediaCandidate;

/// Normalize a source URL from an archived page. Archived markup carries
/// scheme-relative URLs; everything else is taken as-is.
fn normalize_source_url(src: &str) -> String {
    if let Some(rest) = src.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        src.to_string()
    }
}

/// Rank of a quality tag: preferred tags first in list order, the remainder
/// by descending numeric value, non-numeric tags last.
fn quality_rank(quality: &str, preference: &[String]) -> (usize, Reverse<i64>) {
    let pref_index = preference
        .iter()
        .position(|p| p == quality)
        .unwrap_or(preference.len());
    let numeric = quality.parse::<i64>().unwrap_or(-1);
    (pref_index, Reverse(numeric))
}

/// Extract the ordered media candidates from an archived embed page.
///
/// Looks for the page's `video` element and its `source` variants, each
/// tagged with a `res` quality. Returns an empty list when the page has no
/// usable media - the caller interprets that as "unavailable", not an error.
pub fn extract_media_candidates(html: &str, preference: &[String]) -> Vec<MediaCandidate> {
    let Ok(source_selector) = Selector::parse("video source") else {
        warn!("media source selector failed to parse");
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut candidates: Vec<MediaCandidate> = document
        .select(&source_selector)
        .filter_map(|el| {
            let src = el.value().attr("src")?;
            let quality = el.value().attr("res").unwrap_or_default();
            Some(MediaCandidate {
                quality: quality.to_string(),
                url: normalize_source_url(src),
            })
        })
        .collect();

    candidates.sort_by_key(|c| quality_rank(&c.quality, preference));
    candidates
}
