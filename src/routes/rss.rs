/**
 * RSS Routes
 * RSS 2.0 feed of the latest published content
 */
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use crate::config::SiteSettings;
use crate::content::{ContentCard, ContentItem};
use crate::error::AppResult;
use crate::repo::ContentRepo;
use crate::state::AppState;

const FEED_SIZE: i64 = 50;

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

/// Site-relative hrefs are anchored at the site URL; external sources pass through.
fn absolute_link(site_url: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{site_url}{href}")
    } else {
        href.to_string()
    }
}

fn render_item(site: &SiteSettings, item: &ContentItem) -> String {
    let card = ContentCard::from(item);
    let link = absolute_link(&site.url, &card.href);

    let mut xml = String::from("    <item>\n");
    xml.push_str(&format!("      <title>{}</title>\n", escape_xml(&card.title)));
    xml.push_str(&format!("      <link>{}</link>\n", escape_xml(&link)));
    xml.push_str(&format!(
        "      <description>{}</description>\n",
        escape_xml(&card.excerpt)
    ));
    if let Some(published_at) = item.published_at {
        xml.push_str(&format!("      <pubDate>{}</pubDate>\n", rfc822(&published_at)));
    }
    for tag in &card.tags {
        xml.push_str(&format!("      <category>{}</category>\n", escape_xml(tag)));
    }
    xml.push_str(&format!("      <guid isPermaLink=\"false\">{}</guid>\n", item.id));
    xml.push_str("    </item>\n");
    xml
}

pub fn render_feed(site: &SiteSettings, items: &[ContentItem]) -> String {
    let feed_url = format!("{}/rss.xml", site.url);
    let blog_url = format!("{}/blog", site.url);
    let last_build = items
        .iter()
        .find_map(|item| item.published_at)
        .map(|dt| rfc822(&dt))
        .unwrap_or_default();
    let body: String = items.iter().map(|item| render_item(site, item)).collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>en-us</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>
    <lastBuildDate>{}</lastBuildDate>
{}  </channel>
</rss>"#,
        escape_xml(&site.title),
        escape_xml(&blog_url),
        escape_xml(&site.description),
        escape_xml(&feed_url),
        last_build,
        body,
    )
}

/// GET /rss.xml
pub async fn rss_feed(State(state): State<AppState>) -> AppResult<Response> {
    let items = state.content.published_items(Some(FEED_SIZE)).await?;
    let xml = render_feed(&state.settings.site, &items);

    Ok((
        [
            (header::CONTENT_TYPE, "application/rss+xml; charset=utf-8"),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600, stale-while-revalidate=600",
            ),
        ],
        xml,
    )
        .into_response())
}
