//! Open Graph metadata extraction from fetched HTML.
//!
//! Pages are not parsed as a DOM. `<meta>` and `<link>` tags are picked out
//! with regular expressions and their attributes read in any order, which is
//! enough for the `og:*`, `twitter:*` and icon tags link cards need.
//!
//! | Field | Sources, first non-empty wins |
//! |---|---|
//! | title | `og:title`, `twitter:title`, `<title>` |
//! | description | `og:description`, `twitter:description`, `description` |
//! | image | `og:image`, `twitter:image` (resolved against the page URL) |
//! | site name | `og:site_name`, hostname |
//! | favicon | `<link rel="icon">` / `rel="shortcut icon"`, `{origin}/favicon.ico` |

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use url::Url;

use crate::escape::decode_entities;
use crate::store::OgpRecord;

static META_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());
static LINK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").unwrap());
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>([^<]*)</title>").unwrap());
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#)
        .unwrap()
});

/// Attributes of one tag, names lowercased, values as written.
type Attributes = HashMap<String, String>;

fn attributes(tag: &str) -> Attributes {
    ATTRIBUTE
        .captures_iter(tag)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (name, value.to_string())
        })
        .collect()
}

/// The `<meta>` tags of a page.
struct MetaTags(Vec<Attributes>);

impl MetaTags {
    fn parse(html: &str) -> Self {
        Self(
            META_TAG
                .find_iter(html)
                .map(|m| attributes(m.as_str()))
                .collect(),
        )
    }

    /// Decoded `content` of the first tag whose `property` or `name` is
    /// `key` (case-insensitive), if non-empty.
    fn content(&self, key: &str) -> Option<String> {
        self.0
            .iter()
            .filter(|attrs| {
                ["property", "name"].iter().any(|a| {
                    attrs
                        .get(*a)
                        .is_some_and(|v| v.trim().eq_ignore_ascii_case(key))
                })
            })
            .filter_map(|attrs| attrs.get("content"))
            .map(|raw| clean(raw))
            .find(|v| !v.is_empty())
    }

    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.content(k))
    }
}

/// Decode entities and collapse runs of whitespace.
fn clean(raw: &str) -> String {
    decode_entities(raw)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_element(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .map(|caps| clean(&caps[1]))
        .filter(|t| !t.is_empty())
}

fn icon_href(html: &str) -> Option<String> {
    LINK_TAG
        .find_iter(html)
        .map(|m| attributes(m.as_str()))
        .find(|attrs| {
            attrs.get("rel").is_some_and(|rel| {
                let rel = rel.trim().to_ascii_lowercase();
                rel == "icon" || rel == "shortcut icon"
            })
        })
        .and_then(|attrs| attrs.get("href").map(|h| decode_entities(h.trim())))
        .filter(|h| !h.is_empty())
}

/// `reference` resolved against `base`, or as written if that fails.
fn resolve(base: &Url, reference: &str) -> String {
    base.join(reference)
        .map(String::from)
        .unwrap_or_else(|_| reference.to_string())
}

fn default_favicon(page: &Url) -> Option<String> {
    page.join("/favicon.ico").ok().map(String::from)
}

/// Build a record for `url` from its page's HTML.
///
/// The record keeps `url` exactly as written so it stays the cache key.
pub fn parse_ogp_from_html(html: &str, url: &str, fetched_at: i64) -> OgpRecord {
    let page = Url::parse(url).ok();
    let meta = MetaTags::parse(html);
    let host = host_of(page.as_ref());

    let title = meta
        .first(&["og:title", "twitter:title"])
        .or_else(|| title_element(html))
        .unwrap_or_default();
    let description = meta.first(&["og:description", "twitter:description", "description"]);
    let image = meta
        .first(&["og:image", "twitter:image"])
        .map(|img| match &page {
            Some(page) if !img.starts_with("http") => resolve(page, &img),
            _ => img,
        });
    let site_name = meta.first(&["og:site_name"]).unwrap_or(host);
    let favicon = match (icon_href(html), &page) {
        (Some(href), Some(page)) => Some(resolve(page, &href)),
        (Some(href), None) => Some(href),
        (None, Some(page)) => default_favicon(page),
        (None, None) => None,
    };

    OgpRecord {
        url: url.to_string(),
        title,
        description,
        image,
        site_name: Some(site_name),
        favicon,
        fetched_at,
    }
}

/// Record used when a page cannot be fetched: the hostname stands in for
/// title and site name.
pub fn fallback_record(url: &str, fetched_at: i64) -> OgpRecord {
    let page = Url::parse(url).ok();
    let host = host_of(page.as_ref());
    OgpRecord {
        url: url.to_string(),
        title: host.clone(),
        description: None,
        image: None,
        site_name: Some(host),
        favicon: page.as_ref().and_then(default_favicon),
        fetched_at,
    }
}

fn host_of(page: Option<&Url>) -> String {
    page.and_then(Url::host_str).unwrap_or_default().to_string()
}
