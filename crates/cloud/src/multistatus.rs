//! Minimal reader for WebDAV `207 Multi-Status` responses.
//!
//! Only `<response>/<href>` leaves are consulted. Namespace prefixes vary
//! between servers (`d:`, `D:`, none), so elements are matched by local
//! name.

use std::sync::LazyLock;

use regex::Regex;

static RESPONSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:[a-z][\w.-]*:)?response\b[^>]*>(.*?)</(?:[a-z][\w.-]*:)?response\s*>")
        .expect("valid regex")
});

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:[a-z][\w.-]*:)?href\b[^>]*>(.*?)</(?:[a-z][\w.-]*:)?href\s*>")
        .expect("valid regex")
});

/// The `href` of every `response` element, in document order.
pub fn response_hrefs(body: &str) -> Vec<String> {
    RESPONSE_RE
        .captures_iter(body)
        .filter_map(|response| {
            let inner = response.get(1)?.as_str();
            let href = HREF_RE.captures(inner)?.get(1)?.as_str();
            Some(unescape_xml(href.trim()))
        })
        .collect()
}

/// Resolve the predefined XML entities and numeric character references.
fn unescape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .map(|hex| u32::from_str_radix(hex, 16).ok())
                .unwrap_or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
