use std::fmt::Write;

use sqlx::SqlitePool;

use crate::{
    config::Config,
    error::Result,
    models::PostListItem,
    services::{community_service, post_service},
};

const FEED_ITEMS: i64 = 50;
const DESCRIPTION_CHARS: usize = 500;

pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            // Not representable in XML 1.0, even as character references
            '\u{0}'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}' => {}
            '\u{fffe}' | '\u{ffff}' => {}
            _ => escaped.push(c),
        }
    }
    escaped
}

struct Channel<'a> {
    title: &'a str,
    description: &'a str,
    link: String,
    with_category: bool,
}

fn render(base_url: &str, channel: &Channel<'_>, posts: &[PostListItem]) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n  <channel>\n");
    let _ = writeln!(xml, "    <title>{}</title>", escape_xml(channel.title));
    let _ = writeln!(xml, "    <description>{}</description>", escape_xml(channel.description));
    let _ = writeln!(xml, "    <link>{}</link>", escape_xml(&channel.link));
    xml.push_str("    <language>ar</language>\n");

    for post in posts {
        let link = format!("{}/p/{}", base_url, post.id);
        let description: String = post
            .body
            .as_deref()
            .unwrap_or_default()
            .chars()
            .take(DESCRIPTION_CHARS)
            .collect();

        xml.push_str("    <item>\n");
        let _ = writeln!(xml, "      <title>{}</title>", escape_xml(&post.title));
        let _ = writeln!(xml, "      <description>{}</description>", escape_xml(&description));
        let _ = writeln!(xml, "      <link>{}</link>", escape_xml(&link));
        let _ = writeln!(xml, "      <author>{}</author>", escape_xml(&post.username));
        if channel.with_category {
            let _ = writeln!(xml, "      <category>{}</category>", escape_xml(&post.community_name));
        }
        let _ = writeln!(xml, "      <pubDate>{}</pubDate>", post.created_at.to_rfc2822());
        let _ = writeln!(xml, "      <guid>{}</guid>", escape_xml(&link));
        xml.push_str("    </item>\n");
    }

    xml.push_str("  </channel>\n</rss>\n");
    xml
}

/// RSS 2.0 document with the latest posts across the site.
pub async fn site_feed(db: &SqlitePool, config: &Config) -> Result<String> {
    let posts = post_service::get_latest_posts(db, None, FEED_ITEMS).await?;
    let channel = Channel {
        title: &config.app_name,
        description: &config.app_description,
        link: config.base_url.clone(),
        with_category: true,
    };

    Ok(render(&config.base_url, &channel, &posts))
}

/// RSS 2.0 document with the latest posts of one community.
pub async fn community_feed(db: &SqlitePool, config: &Config, community_id: i64) -> Result<String> {
    let community = community_service::require_community(db, community_id).await?;
    let posts = post_service::get_latest_posts(db, Some(community.id), FEED_ITEMS).await?;
    let channel = Channel {
        title: &community.name,
        description: community.description.as_deref().unwrap_or_default(),
        link: format!("{}/c/{}", config.base_url, community.id),
        with_category: false,
    };

    Ok(render(&config.base_url, &channel, &posts))
}
