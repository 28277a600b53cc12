/// Text processing utilities
pub mod text {
    use crate::document::decode_entities;
    use once_cell::sync::Lazy;
    use regex::Regex;

    static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("tag pattern"));

    /// Maximum length of a dedup key, in characters.
    pub const TITLE_KEY_MAX_CHARS: usize = 80;

    /// Collapse all runs of whitespace into single spaces
    pub fn collapse_whitespace(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Remove markup and entities, leaving plain single-spaced text
    pub fn strip_html(html: &str) -> String {
        let without_tags = TAG.replace_all(html, " ");
        collapse_whitespace(&decode_entities(&without_tags, true))
    }

    /// Truncate to `max_chars` at a word boundary, appending "..." when
    /// anything was cut. A single word longer than the limit is cut hard.
    pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let cut = text
            .char_indices()
            .nth(max_chars)
            .map(|(index, _)| index)
            .unwrap_or(text.len());
        let head = &text[..cut];
        let next_is_break = text[cut..].starts_with(char::is_whitespace);

        let kept = if next_is_break {
            head
        } else {
            match head.rfind(char::is_whitespace) {
                Some(space) if space > 0 => &head[..space],
                _ => head,
            }
        };
        format!("{}...", kept.trim_end())
    }

    pub fn strip_html_and_truncate(html: &str, max_chars: usize) -> String {
        truncate_at_word(&strip_html(html), max_chars)
    }

    /// Dedup key for a title: lowercased, alphanumerics only, bounded length
    pub fn normalize_title(title: &str) -> String {
        title
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .take(TITLE_KEY_MAX_CHARS)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::text::*;

    #[test]
    fn strips_tags_and_entities() {
        assert_eq!(
            strip_html("<p>Tom &amp; Jerry</p>\n<br/><b>return</b>"),
            "Tom & Jerry return"
        );
    }

    #[test]
    fn decodes_the_full_html_entity_table() {
        assert_eq!(
            strip_html("<p>&Eacute;xito en &Aacute;frica &ccedil;a &agrave; &trade; &deg;C</p>"),
            "Éxito en África ça à ™ °C"
        );
    }

    #[test]
    fn truncates_on_word_boundary() {
        let html = format!("<p>{}</p>", "word ".repeat(60));
        let summary = strip_html_and_truncate(&html, 150);

        assert!(summary.chars().count() <= 153);
        assert!(summary.ends_with("..."));
        let body = summary.trim_end_matches("...");
        assert!(body.split(' ').all(|w| w == "word"));
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate_at_word("short text", 150), "short text");
    }

    #[test]
    fn normalizes_titles_for_dedup() {
        assert_eq!(normalize_title("Breaking: ¡Última Hora!"), "breakingúltimahora");
        assert_eq!(normalize_title(&"a".repeat(200)).len(), TITLE_KEY_MAX_CHARS);
    }
}
