//! Profile discovery: seeded from the archived profile page, then an
//! explicit page loop over the pagination endpoint.
//!
//! The loop replaces the site client's recursive fetch-next-then-recurse
//! shape so termination is a loop invariant: discovery stops on an empty
//! page, on a page with zero net-new ids (a server echoing stale pages must
//! not spin us forever), or on a transport failure. Everything discovered
//! before a failure is kept.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::archive::ArchiveLocator;
use crate::extract::{self, PageItems};
use crate::http_client::Fetch;
use crate::models::{ProfileCrawlState, VideoRecord};

/// Terminal crawl failure. Per-page problems never surface here; only a
/// profile that cannot be resolved at all ends the run.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("profile {username} unavailable: {reason}")]
    ProfileUnavailable { username: String, reason: String },
}

/// Drives discovery for one profile through the fetch seam.
pub struct ProfileCrawler<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    locator: &'a ArchiveLocator,
}

impl<'a, F: Fetch + ?Sized> ProfileCrawler<'a, F> {
    pub fn new(fetcher: &'a F, locator: &'a ArchiveLocator) -> Self {
        Self { fetcher, locator }
    }

    /// Discover all of a profile's video records.
    ///
    /// Pages are fetched in strictly increasing cursor order; each query
    /// carries the previous page's continuation token, so pagination is
    /// inherently sequential.
    pub async fn crawl(&self, username: &str) -> Result<ProfileCrawlState, CrawlError> {
        let profile_url = self.locator.profile_url(username);
        let html = self.fetcher.get_text(&profile_url).await.map_err(|e| {
            CrawlError::ProfileUnavailable {
                username: username.to_string(),
                reason: e.to_string(),
            }
        })?;

        let profile_id = extract::extract_profile_id(&html).map_err(|e| {
            CrawlError::ProfileUnavailable {
                username: username.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut state = ProfileCrawlState::new(username, profile_id);

        // A broken metadata block means "no videos", not a dead profile.
        match extract::extract_video_catalog(&html) {
            Ok(items) => {
                for item in items {
                    state.admit(VideoRecord::new(item.id, username, item.title));
                }
            }
            Err(e) => {
                info!("profile page for {} had no video metadata: {}", username, e);
            }
        }

        state.page_cursor = 1;
        info!("seeded {} videos from profile page", state.len());

        self.paginate(&mut state).await;
        Ok(state)
    }

    /// Run the page loop until the catalog is exhausted.
    async fn paginate(&self, state: &mut ProfileCrawlState) {
        loop {
            let Some(last_id) = state.last_seen_id.clone() else {
                debug!("no continuation token, nothing to paginate");
                return;
            };

            let next_page = state.page_cursor + 1;
            let url = self
                .locator
                .module_query_url(&state.profile_id, next_page, &last_id);

            let body = match self.fetcher.get_text(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(
                        "pagination fetch failed on page {} ({}), keeping {} discovered records",
                        next_page,
                        e,
                        state.len()
                    );
                    return;
                }
            };

            let items = match extract::extract_page_items(&body) {
                Ok(PageItems::Items(items)) => items,
                Ok(PageItems::Empty) => {
                    debug!("page {} returned an empty body, catalog exhausted", next_page);
                    return;
                }
                Err(e) => {
                    warn!("pagination page {} did not parse: {}", next_page, e);
                    return;
                }
            };

            let owner = state.username.clone();
            let mut fresh = 0usize;
            for item in items {
                if state.admit(VideoRecord::new(item.id, owner.clone(), item.title)) {
                    fresh += 1;
                }
            }

            if fresh == 0 {
                debug!("page {} added no new records, stopping", next_page);
                return;
            }

            state.page_cursor = next_page;
            debug!("page {} added {} records", next_page, fresh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::{FetchError, HttpResponse};

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    /// Fetcher serving canned bodies keyed by URL, counting every call.
    struct PageMap {
        pages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl PageMap {
        fn new(pages: Vec<(String, String)>) -> Self {
            Self {
                pages: pages.into_iter().collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Fetch for PageMap {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or(FetchError::Status(reqwest::StatusCode::NOT_FOUND))
        }

        async fn get_media(&self, _url: &str) -> Result<HttpResponse, FetchError> {
            unimplemented!("discovery never fetches media")
        }
    }

    fn profile_page(profile_id: &str, entries: &[(&str, &str)]) -> String {
        let videos: Vec<String> = entries
            .iter()
            .map(|(id, title)| {
                format!(
                    r#"{{"name": "user - {}", "embedURL": "https://plays.tv/embeds/{}"}}"#,
                    title, id
                )
            })
            .collect();
        format!(
            r#"<html><body>
              <button title="Add Friend" data-obj-id="{}"></button>
              <script type="application/ld+json">{{"video": [{}]}}</script>
            </body></html>"#,
            profile_id,
            videos.join(",")
        )
    }

    fn pagination_body(entries: &[(&str, &str)]) -> String {
        let items: Vec<String> = entries
            .iter()
            .map(|(id, title)| {
                format!(
                    r#"<li class="video-item" data-feed-id="{}"><a class="title">{}</a></li>"#,
                    id, title
                )
            })
            .collect();
        serde_json::json!({ "body": items.join("") }).to_string()
    }

    fn empty_page() -> String {
        r#"{"body": ""}"#.to_string()
    }

    #[tokio::test]
    async fn test_dedup_across_pages_and_bounded_fetches() {
        let locator = ArchiveLocator::default();
        // Profile lists a1+a2; page 2 repeats a2 and adds a3; page 3 is empty.
        let fetcher = PageMap::new(vec![
            (
                locator.profile_url("user"),
                profile_page("77", &[("a1", "one"), ("a2", "two")]),
            ),
            (
                locator.module_query_url("77", 2, "a2"),
                pagination_body(&[("a2", "two"), ("a3", "three")]),
            ),
            (locator.module_query_url("77", 3, "a3"), empty_page()),
        ]);

        let crawler = ProfileCrawler::new(&fetcher, &locator);
        let state = crawler.crawl("user").await.unwrap();

        let ids: Vec<&str> = state.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
        // Exactly 3 fetches: profile + 2 pagination queries.
        assert_eq!(fetcher.call_count(), 3);
    }

    #[tokio::test]
    async fn test_stale_page_with_no_new_ids_terminates() {
        let locator = ArchiveLocator::default();
        let fetcher = PageMap::new(vec![
            (
                locator.profile_url("user"),
                profile_page("77", &[("a1", "one")]),
            ),
            // Server keeps echoing the same slice.
            (
                locator.module_query_url("77", 2, "a1"),
                pagination_body(&[("a1", "one")]),
            ),
        ]);

        let crawler = ProfileCrawler::new(&fetcher, &locator);
        let state = crawler.crawl("user").await.unwrap();

        assert_eq!(state.len(), 1);
        assert_eq!(fetcher.call_count(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_discovered_records() {
        let locator = ArchiveLocator::default();
        // No pagination page registered: the page-2 fetch 404s.
        let fetcher = PageMap::new(vec![(
            locator.profile_url("user"),
            profile_page("77", &[("a1", "one"), ("a2", "two")]),
        )]);

        let crawler = ProfileCrawler::new(&fetcher, &locator);
        let state = crawler.crawl("user").await.unwrap();
        assert_eq!(state.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_profile_is_fatal() {
        let locator = ArchiveLocator::default();
        let fetcher = PageMap::new(vec![]);

        let crawler = ProfileCrawler::new(&fetcher, &locator);
        let err = crawler.crawl("ghost").await.unwrap_err();
        assert!(matches!(err, CrawlError::ProfileUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_profile_page_without_id_is_fatal() {
        let locator = ArchiveLocator::default();
        let fetcher = PageMap::new(vec![(
            locator.profile_url("user"),
            "<html><body>nothing here</body></html>".to_string(),
        )]);

        let crawler = ProfileCrawler::new(&fetcher, &locator);
        assert!(crawler.crawl("user").await.is_err());
    }

    #[tokio::test]
    async fn test_profile_without_metadata_is_empty_catalog() {
        let locator = ArchiveLocator::default();
        let fetcher = PageMap::new(vec![(
            locator.profile_url("user"),
            r#"<html><body><button title="Add Friend" data-obj-id="77"></button></body></html>"#
                .to_string(),
        )]);

        let crawler = ProfileCrawler::new(&fetcher, &locator);
        let state = crawler.crawl("user").await.unwrap();
        assert!(state.is_empty());
        // No continuation token, so no pagination fetch happened.
        assert_eq!(fetcher.call_count(), 1);
    }
}
