//! Result feed markup parsing.
//!
//! The feed renders image results in two encodings:
//!
//! - `<div class="rg_meta">{"ou": "...", "ity": "jpg", ...}</div>` where the
//!   element text is a JSON object and `ou` is the original image URL
//! - `<a href="/imgres?imgurl=...&imgrefurl=...">` links on the basic HTML feed
//!
//! Anything that does not yield an http(s) URL is skipped.

use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};
use url::Url;

use crate::models::ResultRecord;

const RESULT_SELECTOR: &str = "div.rg_meta, a[href*='imgurl=']";

/// Parse the feed markup into result records, in document order.
///
/// Pure: no I/O, same input gives the same output. Malformed entries are skipped.
pub fn parse_results(markup: &str) -> Vec<ResultRecord> {
    let Ok(selector) = Selector::parse(RESULT_SELECTOR) else {
        return Vec::new();
    };

    let document = Html::parse_document(markup);
    document
        .select(&selector)
        .filter_map(|elem| match elem.value().name() {
            "div" => parse_meta_block(&elem),
            "a" => parse_imgres_link(&elem),
            _ => None,
        })
        .collect()
}

fn parse_meta_block(elem: &ElementRef) -> Option<ResultRecord> {
    let text = elem.text().collect::<String>();
    let meta: Value = serde_json::from_str(text.trim()).ok()?;
    let locator = meta.get("ou")?.as_str()?;
    if !is_web_url(locator) {
        return None;
    }

    ResultRecord::new(locator, meta.clone())
}

fn parse_imgres_link(elem: &ElementRef) -> Option<ResultRecord> {
    let href = elem.value().attr("href")?;
    let base = Url::parse("https://localhost/").ok()?;
    let link = base.join(href).ok()?;

    let mut locator = None;
    let mut meta = serde_json::Map::new();
    for (key, value) in link.query_pairs() {
        match key.as_ref() {
            "imgurl" => locator = Some(value.into_owned()),
            "imgrefurl" => {
                meta.insert("ru".to_string(), json!(value));
            }
            "w" => {
                meta.insert("ow".to_string(), json!(value));
            }
            "h" => {
                meta.insert("oh".to_string(), json!(value));
            }
            _ => {}
        }
    }

    let locator = locator.filter(|l| is_web_url(l))?;
    ResultRecord::new(locator, Value::Object(meta))
}

fn is_web_url(candidate: &str) -> bool {
    Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meta_blocks_in_order() {
        let html = r#"
            <html><body>
            <div class="rg_meta">{"ou":"https://a.example/1.jpg","ity":"jpg","pt":"One"}</div>
            <div class="other">noise</div>
            <div class="rg_meta">{"ou":"https://b.example/2.png","ity":"png"}</div>
            </body></html>
        "#;

        let records = parse_results(html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].locator(), "https://a.example/1.jpg");
        assert_eq!(records[0].title(), Some("One"));
        assert_eq!(records[1].locator(), "https://b.example/2.png");
        assert_eq!(records[1].declared_type(), Some("png"));
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let html = r#"
            <div class="rg_meta">{"ou": "https://ok.example/1.jpg"}</div>
            <div class="rg_meta">{not json</div>
            <div class="rg_meta">{"ity":"jpg"}</div>
            <div class="rg_meta">{"ou":""}</div>
            <div class="rg_meta">{"ou":"javascript:alert(1)"}</div>
            <div class="rg_meta">{"ou":"https://ok.example/2.jpg"
        "#;

        let records = parse_results(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].locator(), "https://ok.example/1.jpg");
    }

    #[test]
    fn test_parse_imgres_links() {
        let html = r#"
            <a href="/imgres?imgurl=https%3A%2F%2Fc.example%2Fcat.gif&imgrefurl=https%3A%2F%2Fc.example%2F&w=640&h=480">x</a>
            <a href="/imgres?imgrefurl=https%3A%2F%2Fc.example%2F&imgurl=">empty</a>
            <a href="/search?q=cats">not a result</a>
        "#;

        let records = parse_results(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].locator(), "https://c.example/cat.gif");
        assert_eq!(records[0].raw_metadata["ru"], "https://c.example/");
        assert_eq!(records[0].raw_metadata["ow"], "640");
    }

    #[test]
    fn test_mixed_encodings_keep_document_order() {
        let html = r#"
            <a href="/imgres?imgurl=https://x.example/1.jpg">1</a>
            <div class="rg_meta">{"ou":"https://x.example/2.jpg"}</div>
            <a href="/imgres?imgurl=https://x.example/3.jpg">3</a>
        "#;

        let locators: Vec<String> = parse_results(html)
            .iter()
            .map(|r| r.locator().to_string())
            .collect();
        assert_eq!(
            locators,
            vec![
                "https://x.example/1.jpg",
                "https://x.example/2.jpg",
                "https://x.example/3.jpg"
            ]
        );
    }

    #[test]
    fn test_parse_is_pure() {
        let html = r#"<div class="rg_meta">{"ou":"https://a.example/1.jpg"}</div>"#;
        assert_eq!(parse_results(html), parse_results(html));
        assert!(parse_results("").is_empty());
    }
}
