//! Detail-link extraction from listing pages

use scraper::{Html, Selector};
use url::Url;

/// Elements that carry a detail-page path on listing pages
const LINK_SELECTOR: &str = "div.hide[data-link-to-view]";
const LINK_ATTRIBUTE: &str = "data-link-to-view";

/// Extracts vehicle detail URLs from a listing page
///
/// This is a filter, not a validator: anything that does not look like a
/// detail link is skipped, and an empty result simply means the page had no
/// listings.
#[derive(Debug, Clone)]
pub struct LinkFetcher {
    base_url: Url,
    detail_marker: String,
}

impl LinkFetcher {
    /// Creates a link fetcher resolving paths against `base_url`
    pub fn new(base_url: Url, detail_marker: impl Into<String>) -> Self {
        Self {
            base_url,
            detail_marker: detail_marker.into(),
        }
    }

    /// Returns absolute detail URLs in document order
    ///
    /// # Example
    ///
    /// ```
    /// use ria_cars::crawler::LinkFetcher;
    /// use url::Url;
    ///
    /// let fetcher = LinkFetcher::new(Url::parse("https://auto.ria.com").unwrap(), "/auto_");
    /// let html = r#"<div class="hide" data-link-to-view="/uk/auto_bmw_x5_1.html"></div>"#;
    /// assert_eq!(
    ///     fetcher.extract_links(html),
    ///     vec!["https://auto.ria.com/uk/auto_bmw_x5_1.html".to_string()]
    /// );
    /// ```
    pub fn extract_links(&self, html: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(LINK_SELECTOR) else {
            return Vec::new();
        };
        let document = Html::parse_document(html);

        document
            .select(&selector)
            .filter_map(|element| element.value().attr(LINK_ATTRIBUTE))
            .filter(|href| href.contains(self.detail_marker.as_str()))
            .filter_map(|href| self.resolve(href))
            .collect()
    }

    fn resolve(&self, href: &str) -> Option<String> {
        match self.base_url.join(href.trim()) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::debug!("Skipping unresolvable detail link {}: {}", href, e);
                None
            }
        }
    }
}
