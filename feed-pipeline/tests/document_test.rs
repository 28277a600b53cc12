use feed_pipeline::document::{decode_entities, DocumentParser, DomDocumentParser, Element, Node, RegexDocumentParser};
use feed_pipeline::og_scraper::find_og_image;

const WELL_FORMED: &str = r#"<?xml version="1.0"?>
<!-- leading comment -->
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Tom &amp; Jerry &#233;dition</title>
    <item>
      <title><![CDATA[Raw <b>markup</b> & all]]></title>
      <media:thumbnail url="https://img.example.com/a.jpg?w=1&amp;h=2" />
      <empty></empty>
    </item>
  </channel>
</rss>"#;

#[test]
fn both_realizations_build_the_same_xml_tree() {
    let dom = DomDocumentParser::new().parse_xml(WELL_FORMED).unwrap();
    let scan = RegexDocumentParser::new().parse_xml(WELL_FORMED).unwrap();
    assert_eq!(dom, scan);

    assert!(dom.is("RSS"));
    assert_eq!(dom.attr("version"), Some("2.0"));
    let channel = dom.child("channel").unwrap();
    assert_eq!(channel.child_text("title").as_deref(), Some("Tom & Jerry édition"));

    let item = channel.child("item").unwrap();
    assert_eq!(item.child_text("title").as_deref(), Some("Raw <b>markup</b> & all"));
    let thumbnail = item.find("media:thumbnail").unwrap();
    assert_eq!(thumbnail.local_name(), "thumbnail");
    assert_eq!(thumbnail.attr("url"), Some("https://img.example.com/a.jpg?w=1&h=2"));
    assert_eq!(item.child_text("empty"), None);
}

#[test]
fn inner_markup_reescapes_text() {
    let root = DomDocumentParser::new()
        .parse_xml(r#"<content><div class="x"><p>a &lt; b</p><br/></div></content>"#)
        .unwrap();
    assert_eq!(root.inner_markup(), r#"<div class="x"><p>a &lt; b</p><br/></div>"#);
}

#[test]
fn html_queries_agree_across_realizations() {
    let page = r#"<!DOCTYPE html>
<html>
<head>
  <title>Story</title>
  <META PROPERTY="og:image" CONTENT="https://cdn.example.com/og.jpg">
  <script>var x = "<meta property='og:image' content='fake.jpg'>";</script>
</head>
<body><p>Unclosed paragraph <img src="/a.jpg"><p>Another</body>
</html>"#;

    let parsers: Vec<Box<dyn DocumentParser>> =
        vec![Box::new(DomDocumentParser::new()), Box::new(RegexDocumentParser::new())];
    for parser in parsers {
        let document = parser.parse_html(page);
        assert!(document.is("#document"), "parser {}", parser.name());
        assert_eq!(document.find_all("meta").len(), 1, "parser {}", parser.name());
        assert_eq!(
            find_og_image(&document).as_deref(),
            Some("https://cdn.example.com/og.jpg"),
            "parser {}",
            parser.name()
        );
        let images = document.find_all("img");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].attr("src"), Some("/a.jpg"));
    }
}

#[test]
fn og_image_keys_are_tried_in_preference_order() {
    let mut head = Element::new("head");
    for (attr, key, content) in [
        ("name", "twitter:image", "https://img.example.com/twitter.jpg"),
        ("property", "og:image:url", "https://img.example.com/og-url.jpg"),
        ("property", "og:image", "   "),
    ] {
        let mut meta = Element::new("meta");
        meta.attrs.push((attr.to_string(), key.to_string()));
        meta.attrs.push(("content".to_string(), content.to_string()));
        head.children.push(Node::Element(meta));
    }

    // Empty og:image is ignored, og:image:url outranks twitter:image
    assert_eq!(
        find_og_image(&head).as_deref(),
        Some("https://img.example.com/og-url.jpg")
    );

    let mut bare = Element::new("head");
    bare.children.push(Node::Text("nothing".to_string()));
    assert_eq!(find_og_image(&bare), None);
}

#[test]
fn entity_decoding_modes() {
    assert_eq!(decode_entities("a &amp; b &#x41;&#66;", false), "a & b AB");
    assert_eq!(decode_entities("caf&eacute;&hellip;", true), "café…");
    assert_eq!(decode_entities("&Oslash;resund &frac12; &bogus;", true), "Øresund ½ &bogus;");

    // HTML names leaking into XML text still decode
    assert_eq!(decode_entities("&lt;b&gt;&Eacute;xito&lt;/b&gt;", false), "<b>Éxito</b>");
    assert_eq!(decode_entities("caf&eacute;&nbsp;bar", false), "café\u{a0}bar");
}

#[test]
fn both_realizations_decode_html_entities_in_feed_text() {
    let xml = "<rss><channel><title>&Ccedil;a &amp; l&agrave; &mdash; 5&deg;C</title></channel></rss>";
    let dom = DomDocumentParser::new().parse_xml(xml).unwrap();
    let scan = RegexDocumentParser::new().parse_xml(xml).unwrap();
    assert_eq!(dom, scan);
    assert_eq!(
        dom.child("channel").unwrap().child_text("title").as_deref(),
        Some("Ça & là — 5°C")
    );
}
