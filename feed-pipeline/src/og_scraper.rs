use crate::document::{DocumentParser, Element};
use crate::fetcher::Fetcher;
use crate::rss_utils::url::{is_placeholder, resolve_url};
use crate::types::Article;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Meta keys in preference order, matched against `property` or `name`.
const IMAGE_META_KEYS: &[&str] = &["og:image", "og:image:url", "twitter:image"];

/// Batching for a scrape pass over many articles. Articles flagged
/// `needs_scraping` are always selected; placeholder images only when
/// `include_placeholders` is set, which is opt-in.
#[derive(Debug, Clone, Copy)]
pub struct ScrapePolicy {
    pub batch_size: usize,
    pub batch_pause: Duration,
    pub include_placeholders: bool,
}

impl Default for ScrapePolicy {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_pause: Duration::from_millis(500),
            include_placeholders: false,
        }
    }
}

pub struct OgImageScraper {
    fetcher: Arc<Fetcher>,
    documents: Arc<dyn DocumentParser>,
}

impl OgImageScraper {
    pub fn new(fetcher: Arc<Fetcher>, documents: Arc<dyn DocumentParser>) -> Self {
        Self { fetcher, documents }
    }

    /// Image advertised by an article page, resolved against the page URL.
    /// Any failure is `None`.
    pub async fn scrape_og_image(&self, page_url: &str) -> Option<String> {
        let result = self.fetcher.fetch_page(page_url).await;
        if !result.success {
            warn!("Scrape fetch failed for {}: {}", page_url, result.error_summary());
            return None;
        }
        let body = result.body?;

        let document = self.documents.parse_html(&body);
        let found = find_og_image(&document)?;
        let resolved = resolve_url(&found, page_url);
        if resolved.is_none() {
            debug!("Scraped image {:?} on {} did not resolve", found, page_url);
        }
        resolved
    }

    /// Replace images for selected articles in place. Returns how many
    /// articles received a scraped image.
    pub async fn scrape_pass(&self, articles: &mut [Article], policy: &ScrapePolicy) -> usize {
        let selected: Vec<usize> = articles
            .iter()
            .enumerate()
            .filter(|(_, article)| {
                article.needs_scraping || (policy.include_placeholders && is_placeholder(&article.image_url))
            })
            .map(|(index, _)| index)
            .collect();

        if selected.is_empty() {
            return 0;
        }

        let batch_size = policy.batch_size.max(1);
        let batch_count = selected.len().div_ceil(batch_size);
        info!("Scraping images for {} articles in {} batch(es)", selected.len(), batch_count);

        let mut scraped = 0;
        for (batch_number, batch) in selected.chunks(batch_size).enumerate() {
            let links: Vec<String> = batch.iter().map(|&i| articles[i].link.clone()).collect();
            let images = join_all(links.iter().map(|link| self.scrape_og_image(link))).await;

            for (&index, image) in batch.iter().zip(images) {
                let article = &mut articles[index];
                if let Some(image_url) = image {
                    article.image_url = image_url;
                    scraped += 1;
                }
                article.needs_scraping = false;
            }

            if batch_number + 1 < batch_count {
                tokio::time::sleep(policy.batch_pause).await;
            }
        }

        info!("Scrape pass replaced {}/{} images", scraped, selected.len());
        scraped
    }
}

/// First match in [`IMAGE_META_KEYS`] order, regardless of document order.
pub fn find_og_image(document: &Element) -> Option<String> {
    let metas = document.find_all("meta");
    IMAGE_META_KEYS.iter().find_map(|key| {
        metas.iter().find_map(|meta| {
            let named = ["property", "name"]
                .iter()
                .filter_map(|attr| meta.attr(attr))
                .any(|value| value.trim().eq_ignore_ascii_case(key));
            if !named {
                return None;
            }
            meta.attr("content")
                .map(str::trim)
                .filter(|content| !content.is_empty())
                .map(str::to_string)
        })
    })
}
