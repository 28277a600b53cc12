use crate::document::{decode_entities, DocumentParser, Element};
use crate::image_resolver::first_inline_image;
use crate::rss_utils::time::parse_timestamp;
use crate::types::{AggregatorError, Dialect, Enclosure, ImageHints, RawItem, Result};
use crate::utils::text::{collapse_whitespace, strip_html};
use std::sync::Arc;
use tracing::{debug, info};

/// Feed parser over an injected [`DocumentParser`].
#[derive(Clone)]
pub struct FeedParser {
    documents: Arc<dyn DocumentParser>,
}

impl FeedParser {
    pub fn new(documents: Arc<dyn DocumentParser>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &Arc<dyn DocumentParser> {
        &self.documents
    }

    /// Parse a document, taking the dialect from its root element.
    pub fn parse_feed(&self, content: &str) -> Result<Vec<RawItem>> {
        debug!("Parsing feed content ({} bytes) with {} parser", content.len(), self.documents.name());

        let root = self.documents.parse_xml(content)?;
        self.parse_root(&root, detect_dialect(&root))
    }

    /// Parse with the dialect fixed by the caller, whatever the root says.
    pub fn parse_feed_as(&self, content: &str, dialect: Dialect) -> Result<Vec<RawItem>> {
        let root = self.documents.parse_xml(content)?;
        self.parse_root(&root, dialect)
    }

    fn parse_root(&self, root: &Element, dialect: Dialect) -> Result<Vec<RawItem>> {
        let elements: Vec<&Element> = match dialect {
            Dialect::Atom => root.children_named("entry").collect(),
            // RSS 2.0 nests items in <channel>; RSS 1.0 puts them under the root
            Dialect::Rss => root.find_all("item"),
        };

        if elements.is_empty() {
            return Err(AggregatorError::Parse("no items".to_string()));
        }

        let total = elements.len();
        let items: Vec<RawItem> = elements
            .into_iter()
            .filter_map(|element| match dialect {
                Dialect::Rss => self.parse_rss_item(element),
                Dialect::Atom => self.parse_atom_entry(element),
            })
            .collect();

        info!("Parsed {:?} feed: {} of {} items kept", dialect, items.len(), total);
        Ok(items)
    }

    fn parse_rss_item(&self, item: &Element) -> Option<RawItem> {
        let title = clean_title(item.child_text("title"));
        let guid = item.child_text("guid");

        let link = item
            .child_text("link")
            .or_else(|| item.child("link").and_then(|l| l.attr("href")).map(str::to_string))
            .or_else(|| {
                // A permalink guid is as good as a link
                let guid_element = item.child("guid")?;
                let permalink = guid_element
                    .attr("isPermaLink")
                    .map(|v| !v.trim().eq_ignore_ascii_case("false"))
                    .unwrap_or(true);
                guid.clone().filter(|g| permalink && g.starts_with("http"))
            });

        let published_at_raw = item.child_text("pubDate").or_else(|| item.child_text("dc:date"));

        let description_html = item.child("description").and_then(markup_of);
        let content_html = item.child("content:encoded").and_then(markup_of);

        let enclosure = item.child("enclosure").and_then(|enclosure| {
            let url = enclosure.attr("url")?.trim();
            (!url.is_empty()).then(|| Enclosure {
                url: url.to_string(),
                mime_type: enclosure.attr("type").map(str::to_string),
            })
        });

        self.finish_item(title, link, published_at_raw, guid, description_html, content_html, enclosure, item)
    }

    fn parse_atom_entry(&self, entry: &Element) -> Option<RawItem> {
        let title = clean_title(entry.child_text("title"));

        let links: Vec<&Element> = entry.children_named("link").collect();
        let link = links
            .iter()
            .find(|l| l.attr("rel").map(|rel| rel.eq_ignore_ascii_case("alternate")).unwrap_or(false))
            .or_else(|| links.first())
            .and_then(|l| l.attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty());

        let published_at_raw = entry
            .child_text("published")
            .or_else(|| entry.child_text("updated"));
        let guid = entry.child_text("id");

        let description_html = entry.child("summary").and_then(markup_of);
        let content_html = entry.child("content").and_then(|content| {
            let is_xhtml = content
                .attr("type")
                .map(|t| t.eq_ignore_ascii_case("xhtml"))
                .unwrap_or(false);
            if is_xhtml {
                Some(content.inner_markup()).filter(|markup| !markup.trim().is_empty())
            } else {
                markup_of(content)
            }
        });

        let enclosure = links
            .iter()
            .find(|l| l.attr("rel").map(|rel| rel.eq_ignore_ascii_case("enclosure")).unwrap_or(false))
            .and_then(|l| {
                let url = l.attr("href")?.trim();
                (!url.is_empty()).then(|| Enclosure {
                    url: url.to_string(),
                    mime_type: l.attr("type").map(str::to_string),
                })
            });

        self.finish_item(title, link, published_at_raw, guid, description_html, content_html, enclosure, entry)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_item(
        &self,
        title: Option<String>,
        link: Option<String>,
        published_at_raw: Option<String>,
        guid: Option<String>,
        description_html: Option<String>,
        content_html: Option<String>,
        enclosure: Option<Enclosure>,
        element: &Element,
    ) -> Option<RawItem> {
        let (Some(title), Some(link)) = (title, link) else {
            debug!("Skipping item without title or link");
            return None;
        };
        let Some(published_at_raw) = published_at_raw else {
            debug!("Skipping '{}': no timestamp", title);
            return None;
        };
        let Some(published_at) = parse_timestamp(&published_at_raw) else {
            debug!("Skipping '{}': unparseable timestamp {:?}", title, published_at_raw);
            return None;
        };

        let inline_image = content_html
            .as_deref()
            .and_then(|html| first_inline_image(self.documents.as_ref(), html))
            .or_else(|| {
                description_html
                    .as_deref()
                    .and_then(|html| first_inline_image(self.documents.as_ref(), html))
            });

        let images = ImageHints {
            enclosure,
            thumbnail: thumbnail_hint(element),
            media_thumbnail: element
                .find("media:thumbnail")
                .and_then(|thumb| thumb.attr("url"))
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            media_content: media_content_hint(element),
            inline_image,
        };

        Some(RawItem {
            title,
            link,
            published_at_raw,
            published_at,
            guid,
            description_html,
            content_html,
            images,
        })
    }
}

/// `feed` roots are Atom; anything else is read as RSS and rejected later
/// if it holds no items.
pub fn detect_dialect(root: &Element) -> Dialect {
    if root.local_name().eq_ignore_ascii_case("feed") {
        Dialect::Atom
    } else {
        Dialect::Rss
    }
}

fn clean_title(raw: Option<String>) -> Option<String> {
    // Titles are often escaped twice, so entities survive the XML pass
    raw.map(|title| {
        if title.contains('<') {
            strip_html(&title)
        } else {
            collapse_whitespace(&decode_entities(&title, true))
        }
    })
    .filter(|title| !title.is_empty())
}

/// Body text, or re-serialized markup when the publisher embedded raw tags.
fn markup_of(element: &Element) -> Option<String> {
    let body = if element.has_elements() {
        element.inner_markup()
    } else {
        element.text()
    };
    let body = body.trim().to_string();
    (!body.is_empty()).then_some(body)
}

fn thumbnail_hint(element: &Element) -> Option<String> {
    let thumbnail = element.child("thumbnail")?;
    thumbnail
        .attr("url")
        .map(str::to_string)
        .or_else(|| Some(thumbnail.text()))
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

fn media_content_hint(element: &Element) -> Option<String> {
    element
        .find_all("media:content")
        .into_iter()
        .find(|media| {
            let medium_image = media
                .attr("medium")
                .map(|m| m.eq_ignore_ascii_case("image"))
                .unwrap_or(false);
            let type_image = media
                .attr("type")
                .map(|t| t.trim().to_ascii_lowercase().starts_with("image"))
                .unwrap_or(false);
            medium_image || type_image
        })
        .and_then(|media| media.attr("url"))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}
