//! Profile page and pagination response extraction.

use scraper::{Html, Selector};
use tracing::debug;

use super::ExtractError;

/// One video entry as listed in a catalog page, before it becomes a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub id: String,
    pub title: String,
}

/// Result of parsing one pagination response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageItems {
    /// Candidate entries from the page's HTML fragment. May include ids the
    /// caller has already seen; dedup happens at admission.
    Items(Vec<CatalogItem>),
    /// The envelope's `body` was empty - the catalog is exhausted.
    Empty,
}

fn selector(source: &str) -> Result<Selector, ExtractError> {
    Selector::parse(source).map_err(|e| ExtractError::Selector(format!("{:?}", e)))
}

/// Collapse runs of whitespace and trim. Listing titles arrive with layout
/// indentation baked in.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean a JSON-LD display name: the site prefixes titles with the owner and
/// a dash, so drop the first dash-delimited segment and rejoin the rest.
fn clean_listing_title(name: &str) -> String {
    let cleaned = name.split('-').skip(1).collect::<Vec<_>>().join(" ");
    let cleaned = normalize_whitespace(&cleaned);
    if cleaned.is_empty() {
        normalize_whitespace(name)
    } else {
        cleaned
    }
}

/// Extract the opaque profile identifier from an archived profile page.
///
/// The id hangs off the "Add Friend" control and is required by every
/// pagination query; without it the profile cannot be crawled at all.
pub fn extract_profile_id(html: &str) -> Result<String, ExtractError> {
    let document = Html::parse_document(html);
    let friend_button = selector(r#"button[title="Add Friend"]"#)?;
    document
        .select(&friend_button)
        .find_map(|el| el.value().attr("data-obj-id"))
        .map(|id| id.to_string())
        .ok_or(ExtractError::MissingElement("profile id"))
}

/// Extract the initial video entries from an archived profile page's JSON-LD
/// metadata block. Each entry's id is the last path segment of its embed URL.
pub fn extract_video_catalog(html: &str) -> Result<Vec<CatalogItem>, ExtractError> {
    let document = Html::parse_document(html);
    let metadata_block = selector(r#"script[type="application/ld+json"]"#)?;
    let raw = document
        .select(&metadata_block)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or(ExtractError::MissingElement("video metadata block"))?;

    let metadata: serde_json::Value = serde_json::from_str(&raw)?;
    let videos = metadata
        .get("video")
        .and_then(|v| v.as_array())
        .ok_or(ExtractError::MissingElement("video metadata list"))?;

    let mut items = Vec::new();
    for entry in videos {
        let Some(embed_url) = entry.get("embedURL").and_then(|v| v.as_str()) else {
            debug!("skipping metadata entry without embedURL");
            continue;
        };
        let Some(id) = embed_url.rsplit('/').next().filter(|s| !s.is_empty()) else {
            debug!("skipping metadata entry with unusable embedURL {}", embed_url);
            continue;
        };
        let name = entry.get("name").and_then(|v| v.as_str()).unwrap_or("");
        items.push(CatalogItem {
            id: id.to_string(),
            title: clean_listing_title(name),
        });
    }

    Ok(items)
}

/// Extract candidate entries from one pagination response.
///
/// The endpoint answers with a JSON envelope whose `body` field carries an
/// HTML fragment of list items. An empty `body` signals the end of the
/// catalog. Items lacking a feed id or title are skipped, not fatal.
pub fn extract_page_items(json_body: &str) -> Result<PageItems, ExtractError> {
    let envelope: serde_json::Value = serde_json::from_str(json_body)?;
    let body = envelope
        .get("body")
        .and_then(|v| v.as_str())
        .ok_or(ExtractError::MissingElement("body field"))?;

    if body.is_empty() {
        return Ok(PageItems::Empty);
    }

    let fragment = Html::parse_fragment(body);
    let item_selector = selector("li.video-item")?;
    let title_selector = selector("a.title")?;

    let mut items = Vec::new();
    for element in fragment.select(&item_selector) {
        let Some(id) = element.value().attr("data-feed-id") else {
            debug!("skipping video item without data-feed-id");
            continue;
        };
        let Some(title_el) = element.select(&title_selector).next() else {
            debug!("skipping video item {} without title link", id);
            continue;
        };
        let title = normalize_whitespace(&title_el.text().collect::<String>());
        items.push(CatalogItem {
            id: id.to_string(),
            title,
        });
    }

    Ok(PageItems::Items(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_PAGE: &str = r#"
        <html><body>
          <button title="Add Friend" data-obj-id="4242">Add Friend</button>
          <script type="application/ld+json">
            {"video": [
              {"name": "rockettvc - first clip", "embedURL": "https://plays.tv/embeds/a1"},
              {"name": "rockettvc - second clip", "embedURL": "https://plays.tv/embeds/a2"}
            ]}
          </script>
        </body></html>"#;

    #[test]
    fn test_extract_profile_id() {
        assert_eq!(extract_profile_id(PROFILE_PAGE).unwrap(), "4242");
    }

    #[test]
    fn test_extract_profile_id_missing() {
        let html = r#"<html><body><p>gone</p></body></html>"#;
        assert!(matches!(
            extract_profile_id(html),
            Err(ExtractError::MissingElement("profile id"))
        ));
    }

    #[test]
    fn test_extract_video_catalog() {
        let items = extract_video_catalog(PROFILE_PAGE).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "a1");
        assert_eq!(items[0].title, "first clip");
        assert_eq!(items[1].id, "a2");
        assert_eq!(items[1].title, "second clip");
    }

    #[test]
    fn test_extract_video_catalog_missing_metadata() {
        let html = r#"<html><body>
            <button title="Add Friend" data-obj-id="4242"></button>
        </body></html>"#;
        assert!(matches!(
            extract_video_catalog(html),
            Err(ExtractError::MissingElement("video metadata block"))
        ));
    }

    #[test]
    fn test_extract_video_catalog_skips_entries_without_embed_url() {
        let html = r#"<html><body>
            <script type="application/ld+json">
              {"video": [
                {"name": "no embed url here"},
                {"name": "u - kept", "embedURL": "https://plays.tv/embeds/b7"}
              ]}
            </script>
        </body></html>"#;
        let items = extract_video_catalog(html).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "b7");
    }

    #[test]
    fn test_clean_listing_title_without_dash() {
        assert_eq!(clean_listing_title("plain  title"), "plain title");
    }

    #[test]
    fn test_extract_page_items() {
        let json = serde_json::json!({
            "body": "<ul>\
                <li class=\"video-item\" data-feed-id=\"a3\">\
                  <a class=\"title\" href=\"#\">  triple\n kill </a>\
                </li>\
                <li class=\"video-item\" data-feed-id=\"a4\">\
                  <a class=\"title\" href=\"#\">ace</a>\
                </li>\
            </ul>"
        })
        .to_string();

        let PageItems::Items(items) = extract_page_items(&json).unwrap() else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0],
            CatalogItem {
                id: "a3".to_string(),
                title: "triple kill".to_string()
            }
        );
        assert_eq!(items[1].id, "a4");
    }

    #[test]
    fn test_extract_page_items_empty_body() {
        let json = r#"{"body": ""}"#;
        assert_eq!(extract_page_items(json).unwrap(), PageItems::Empty);
    }

    #[test]
    fn test_extract_page_items_skips_incomplete_items() {
        let json = serde_json::json!({
            "body": "<ul>\
                <li class=\"video-item\"><a class=\"title\">no feed id</a></li>\
                <li class=\"video-item\" data-feed-id=\"a5\">no title link</li>\
                <li class=\"video-item\" data-feed-id=\"a6\">\
                  <a class=\"title\">kept</a>\
                </li>\
            </ul>"
        })
        .to_string();

        let PageItems::Items(items) = extract_page_items(&json).unwrap() else {
            panic!("expected items");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "a6");
    }

    #[test]
    fn test_extract_page_items_malformed_envelope() {
        assert!(extract_page_items("not json").is_err());
        assert!(matches!(
            extract_page_items(r#"{"other": 1}"#),
            Err(ExtractError::MissingElement("body field"))
        ));
    }
}
