//! Content shaping - display fields derived from a Markdown body.

use lazy_static::lazy_static;
use regex::Regex;

/// Excerpts longer than this are cut and suffixed with `...`.
pub const EXCERPT_MAX_CHARS: usize = 180;
const EXCERPT_ELLIPSIS: &str = "...";

lazy_static! {
    static ref MD_IMAGE_URL: Regex =
        Regex::new(r#"!\[[^\]]*\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#).unwrap();
    static ref HTML_IMAGE_URL: Regex =
        Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).unwrap();
    static ref CODE_FENCE: Regex = Regex::new(r"(?s)```.*?```").unwrap();
    static ref INLINE_CODE: Regex = Regex::new(r"`[^`]*`").unwrap();
    static ref MD_IMAGE: Regex = Regex::new(r"!\[[^\]]*\]\([^)]+\)").unwrap();
    static ref MD_LINK: Regex = Regex::new(r"\[([^\]]+)\]\([^)]+\)").unwrap();
    static ref MARKUP_CHARS: Regex = Regex::new(r"[#>*_~\-]").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref LEADING_H1: Regex = Regex::new(r"^#\s+(.+)\r?\n?").unwrap();
}

/// URL of the first image in the text, Markdown or raw `<img>`, whichever comes first.
pub fn extract_cover_image_url(content_md: &str) -> String {
    let markdown = MD_IMAGE_URL
        .captures(content_md)
        .and_then(|c| c.get(1))
        .map(|m| (m.start(), m.as_str()));
    let html = HTML_IMAGE_URL
        .captures(content_md)
        .and_then(|c| c.get(1))
        .map(|m| (m.start(), m.as_str()));

    match (markdown, html) {
        (Some((md_at, md_url)), Some((html_at, html_url))) => {
            if html_at < md_at {
                html_url.to_string()
            } else {
                md_url.to_string()
            }
        }
        (Some((_, url)), None) | (None, Some((_, url))) => url.to_string(),
        (None, None) => String::new(),
    }
}

/// Plain-text summary of a Markdown body, capped at [`EXCERPT_MAX_CHARS`].
pub fn build_excerpt(content_md: &str) -> String {
    let plain = CODE_FENCE.replace_all(content_md, " ");
    let plain = INLINE_CODE.replace_all(&plain, " ");
    let plain = MD_IMAGE.replace_all(&plain, " ");
    let plain = MD_LINK.replace_all(&plain, "$1");
    let plain = MARKUP_CHARS.replace_all(&plain, " ");
    let plain = WHITESPACE.replace_all(&plain, " ");
    let plain = plain.trim();

    if plain.chars().count() <= EXCERPT_MAX_CHARS {
        return plain.to_string();
    }

    let keep = EXCERPT_MAX_CHARS - EXCERPT_ELLIPSIS.len();
    let cut: String = plain.chars().take(keep).collect();
    format!("{}{EXCERPT_ELLIPSIS}", cut.trim_end())
}

/// Drop a first-line `# Title` heading that repeats the post title.
///
/// Only the very first line is considered; later headings are never touched.
pub fn strip_leading_title_heading(content_md: &str, title: &str) -> String {
    let wanted = title.trim().to_lowercase();
    if wanted.is_empty() {
        return content_md.to_string();
    }

    match LEADING_H1.captures(content_md) {
        Some(caps) if caps[1].trim().to_lowercase() == wanted => {
            content_md[caps[0].len()..].to_string()
        }
        _ => content_md.to_string(),
    }
}

/// Comma-separated tag input: trimmed, lower-cased, unique, in first-seen order.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(|t| t.trim().to_lowercase()) {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}
