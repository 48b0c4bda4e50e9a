//! Link card HTML.
//!
//! The card is emitted on a single line so it replaces exactly one Markdown
//! line. Every interpolated value is escaped for `& < > " '` and has its line
//! breaks flattened.

use maud::{PreEscaped, html};
use url::Url;

use crate::escape::escape_html;
use crate::store::OgpRecord;

/// Render the card for `record`.
///
/// An empty title or site name falls back to the URL's hostname.
/// Description, favicon and image elements are omitted when empty.
pub fn render_card(record: &OgpRecord) -> String {
    let host = hostname(&record.url);
    let title = non_empty(Some(&record.title)).unwrap_or(&host);
    let site_name = non_empty(record.site_name.as_ref()).unwrap_or(&host);
    let description = non_empty(record.description.as_ref());
    let favicon = non_empty(record.favicon.as_ref());
    let image = non_empty(record.image.as_ref());

    html! {
        div class="link-card" {
            a href=(text(&record.url)) target="_blank" rel="noopener noreferrer" class="link-card-anchor" {
                div class="link-card-content" {
                    div class="link-card-text" {
                        span class="link-card-title" { (text(title)) }
                        @if let Some(description) = description {
                            span class="link-card-description" { (text(description)) }
                        }
                        span class="link-card-meta" {
                            @if let Some(favicon) = favicon {
                                img src=(text(favicon)) alt="" class="link-card-favicon"
                                    loading="lazy" decoding="async" width="16" height="16"
                                    onerror="this.style.display='none'";
                            }
                            span class="link-card-site-name" { (text(site_name)) }
                        }
                    }
                    @if let Some(image) = image {
                        div class="link-card-image-container" {
                            img src=(text(image)) alt="" class="link-card-image"
                                loading="lazy" decoding="async";
                        }
                    }
                }
            }
        }
    }
    .into_string()
}

/// Hostname of `url`, or the URL itself if it does not parse.
pub fn hostname(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.trim().is_empty())
}

fn text(value: &str) -> PreEscaped<String> {
    let flat: String = value
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    PreEscaped(escape_html(&flat))
}
