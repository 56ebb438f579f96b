use scraper::Html;

/// Strips tags, decodes entities and collapses whitespace.
pub(crate) fn clean_html(fragment: &str) -> String {
    let parsed = Html::parse_fragment(fragment);
    let text: String = parsed.root_element().text().collect();
    collapse_ws(&text)
}

pub(crate) fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decodes the body of a JSON string literal; returns it untouched if it is not valid JSON.
pub(crate) fn unescape_json_str(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}
