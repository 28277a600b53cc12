/// Feed-specific utility functions

/// URL utilities for feed items and image candidates
pub mod url {
    use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
    use url::Url;

    /// Characters left alone by JavaScript's `encodeURIComponent`.
    const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'!')
        .remove(b'~')
        .remove(b'*')
        .remove(b'\'')
        .remove(b'(')
        .remove(b')');

    const PLACEHOLDER_BASE: &str = "https://placehold.co/600x400?text=";

    pub fn encode_component(value: &str) -> String {
        utf8_percent_encode(value, COMPONENT).to_string()
    }

    /// Resolve a possibly relative candidate against `base`. Only http(s)
    /// results are accepted.
    pub fn resolve_url(candidate: &str, base: &str) -> Option<String> {
        let candidate = candidate.trim();
        if candidate.is_empty() || candidate.starts_with("data:") {
            return None;
        }

        let resolved = match Url::parse(candidate) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(candidate).ok()?,
            Err(_) => return None,
        };

        match resolved.scheme() {
            "http" | "https" => Some(resolved.to_string()),
            _ => None,
        }
    }

    /// Lowercased host of a URL
    pub fn host(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// True when `host` is `domain` or one of its subdomains
    pub fn host_matches(host: &str, domain: &str) -> bool {
        host == domain || host.ends_with(&format!(".{}", domain))
    }

    /// Deterministic placeholder image naming the publisher
    pub fn placeholder_url(display_name: &str) -> String {
        format!("{}{}", PLACEHOLDER_BASE, encode_component(display_name))
    }

    pub fn is_placeholder(image_url: &str) -> bool {
        image_url.contains("placehold")
    }

    /// Validate feed URL format
    pub fn is_valid_feed_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}

/// Timestamp parsing for the many date formats feeds actually emit
pub mod time {
    use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
    ];

    // Obsolete RFC 822 zones chrono's RFC 2822 parser rejects.
    const NAMED_ZONES: &[(&str, &str)] = &[
        ("UT", "+0000"),
        ("UTC", "+0000"),
        ("Z", "+0000"),
        ("EST", "-0500"),
        ("EDT", "-0400"),
        ("CST", "-0600"),
        ("CDT", "-0500"),
        ("MST", "-0700"),
        ("MDT", "-0600"),
        ("PST", "-0800"),
        ("PDT", "-0700"),
        ("CET", "+0100"),
        ("CEST", "+0200"),
        ("BST", "+0100"),
    ];

    /// Parse a feed timestamp into UTC. Returns `None` when nothing matches.
    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Some(dt) = parse_rfc2822_lenient(raw) {
            return Some(dt.with_timezone(&Utc));
        }

        // Zone-less ISO-ish forms are taken as UTC
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
        if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
        None
    }

    /// RFC 2822 without the weekday, with a named zone, or with the
    /// weekday and day-of-month disagreeing.
    fn parse_rfc2822_lenient(raw: &str) -> Option<DateTime<FixedOffset>> {
        let without_weekday = match raw.split_once(',') {
            Some((_, rest)) => rest.trim(),
            None => raw,
        };

        let mut parts: Vec<&str> = without_weekday.split_whitespace().collect();
        let zone = parts.last().copied()?;
        let offset = NAMED_ZONES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(zone))
            .map(|(_, offset)| *offset);
        if let Some(offset) = offset {
            parts.pop();
            parts.push(offset);
        }
        let normalized = parts.join(" ");

        DateTime::parse_from_str(&normalized, "%d %b %Y %H:%M:%S %z")
            .or_else(|_| DateTime::parse_from_str(&normalized, "%d %b %Y %H:%M %z"))
            .or_else(|_| DateTime::parse_from_str(&normalized, "%d %B %Y %H:%M:%S %z"))
            .ok()
    }
}
