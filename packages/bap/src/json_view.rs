//! Raw JSON window helpers: text, syntax highlighting and download link.

use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::{Captures, Regex};

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"("(\\u[a-zA-Z0-9]{4}|\\[^u]|[^\\"])*"(\s*:)?|\b(true|false|null)\b|-?\d+(?:\.\d*)?(?:[eE][+\-]?\d+)?)"#,
    )
    .expect("valid regex")
});

/// Serializes `value` compactly or pretty-printed.
#[must_use]
pub fn to_text(value: &serde_json::Value, pretty: bool) -> String {
    let text = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    text.unwrap_or_default()
}

/// Pretty-printed JSON with every token wrapped in a classed `<span>`.
///
/// Classes are `key`, `string`, `boolean`, `null` and `number`.
#[must_use]
pub fn highlight(value: &serde_json::Value) -> String {
    let escaped = to_text(value, true)
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    TOKEN
        .replace_all(&escaped, |caps: &Captures<'_>| {
            let token = &caps[0];
            let class = if token.starts_with('"') {
                if token.ends_with(':') { "key" } else { "string" }
            } else if token == "true" || token == "false" {
                "boolean"
            } else if token == "null" {
                "null"
            } else {
                "number"
            };
            format!("<span class=\"{class}\">{token}</span>")
        })
        .into_owned()
}

/// `data:` URL that downloads `value` as a JSON file.
#[must_use]
pub fn download_link(value: &serde_json::Value) -> String {
    format!(
        "data:text/json;base64,{}",
        STANDARD.encode(to_text(value, false))
    )
}
