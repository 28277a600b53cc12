use crate::document::{DocumentParser, Element};
use crate::rewrites::rewrite_image_url;
use crate::rss_utils::url::{placeholder_url, resolve_url};
use crate::types::{FeedConfig, RawItem};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResolution {
    pub image_url: String,
    pub needs_scraping: bool,
}

/// Picks one image per item: enclosure, thumbnail, media:thumbnail,
/// media:content, inline `<img>`, in that order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageResolver;

impl ImageResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, item: &RawItem, feed: &FeedConfig) -> ImageResolution {
        let resolved = candidate(item).and_then(|raw| {
            let resolved = resolve_url(raw, &item.link);
            if resolved.is_none() {
                debug!("Discarding unresolvable image {:?} for {}", raw, item.link);
            }
            resolved
        });

        match resolved {
            Some(url) => ImageResolution {
                image_url: rewrite_image_url(&url, &feed.display_name),
                needs_scraping: false,
            },
            // The placeholder stays as the interim value until a scrape replaces it
            None => ImageResolution {
                image_url: placeholder_url(&feed.display_name),
                needs_scraping: feed.requires_scrape_fallback,
            },
        }
    }
}

fn candidate(item: &RawItem) -> Option<&str> {
    let hints = &item.images;
    hints
        .enclosure
        .as_ref()
        .filter(|enclosure| enclosure.is_image())
        .map(|enclosure| enclosure.url.as_str())
        .or(hints.thumbnail.as_deref())
        .or(hints.media_thumbnail.as_deref())
        .or(hints.media_content.as_deref())
        .or(hints.inline_image.as_deref())
        .filter(|url| !url.trim().is_empty())
}

/// Explicit 1x1 dimensions, or either side under 2px.
pub fn is_tracking_pixel(img: &Element) -> bool {
    let dimension = |name: &str| {
        img.attr(name).and_then(|raw| {
            raw.trim()
                .trim_end_matches("px")
                .trim()
                .parse::<f64>()
                .ok()
        })
    };

    match (dimension("width"), dimension("height")) {
        (Some(w), Some(h)) if w == 1.0 && h == 1.0 => true,
        (Some(w), _) if w < 2.0 => true,
        (_, Some(h)) if h < 2.0 => true,
        _ => false,
    }
}

/// `src` of the first non-tracking `<img>` in an HTML fragment.
pub fn first_inline_image(documents: &dyn DocumentParser, html: &str) -> Option<String> {
    if !html.as_bytes().windows(4).any(|w| w.eq_ignore_ascii_case(b"<img")) {
        return None;
    }
    let document = documents.parse_html(html);
    document
        .find_all("img")
        .into_iter()
        .filter(|img| !is_tracking_pixel(img))
        .filter_map(|img| img.attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}
