//! Card layout: where each piece of an OGP image goes.
//!
//! The image is a fixed 1200×630 canvas with the base image stretched over
//! it and four text blocks on the left edge:
//!
//! | Block | Top | Size | Color | Notes |
//! |---|---|---|---|---|
//! | title | 180 | 48px bold | `#ffffff` | wraps at 800px, line height 1.3, max 3 lines |
//! | tags | 480 | 16px | `#fca605` | `#a  #b`, only when tags exist |
//! | date | 520 | 14px | `#b1c9ee` | ISO dates shown as `YYYY-MM-DD` |
//! | site name | 560 | 18px | `#a5a6f2` | constant |

use chrono::{DateTime, NaiveDate};

use crate::content::{PostAttributes, SkipReason};
use crate::front_matter::FrontMatter;

pub const WIDTH: u32 = 1200;
pub const HEIGHT: u32 = 630;

const LEFT: f32 = 80.0;
const NORMAL_LINE_HEIGHT: f32 = 1.2;

/// Post fields that appear on an OGP image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OgpImageSpec {
    pub title: String,
    pub slug: String,
    pub date: String,
    pub tags: Vec<String>,
}

impl OgpImageSpec {
    /// Requires a title and a usable slug.
    pub fn from_front_matter(front_matter: &FrontMatter) -> Result<Self, SkipReason> {
        let post = PostAttributes::from_front_matter(front_matter)?;
        Ok(Self {
            title: post.title,
            slug: post.slug,
            date: post.date,
            tags: post.tags,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.slug)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: &'static str,
    pub bold: bool,
    /// Multiple of `font_size`.
    pub line_height: f32,
}

/// A block of text anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub x: f32,
    pub y: f32,
    /// Wrap width; `None` keeps the text on one line.
    pub max_width: Option<f32>,
    /// Lines kept after wrapping; the last one gets an ellipsis.
    pub max_lines: Option<usize>,
    pub style: TextStyle,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        href: String,
    },
    Text(TextNode),
}

/// Positioned nodes, painted in order.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree {
    pub width: u32,
    pub height: u32,
    pub children: Vec<LayoutNode>,
}

impl LayoutTree {
    pub fn texts(&self) -> impl Iterator<Item = &TextNode> {
        self.children.iter().filter_map(|node| match node {
            LayoutNode::Text(text) => Some(text),
            LayoutNode::Image { .. } => None,
        })
    }
}

const TITLE: TextStyle = TextStyle {
    font_size: 48.0,
    color: "#ffffff",
    bold: true,
    line_height: 1.3,
};
const TAGS: TextStyle = TextStyle {
    font_size: 16.0,
    color: "#fca605",
    bold: false,
    line_height: NORMAL_LINE_HEIGHT,
};
const DATE: TextStyle = TextStyle {
    font_size: 14.0,
    color: "#b1c9ee",
    bold: false,
    line_height: NORMAL_LINE_HEIGHT,
};
const SITE_NAME: TextStyle = TextStyle {
    font_size: 18.0,
    color: "#a5a6f2",
    bold: false,
    line_height: NORMAL_LINE_HEIGHT,
};

fn line(y: f32, style: TextStyle, text: String) -> LayoutNode {
    LayoutNode::Text(TextNode {
        x: LEFT,
        y,
        max_width: None,
        max_lines: None,
        style,
        text,
    })
}

/// Lay out the card for `spec` over the background at `background_href`.
pub fn build_layout(spec: &OgpImageSpec, background_href: &str, site_name: &str) -> LayoutTree {
    let mut children = vec![
        LayoutNode::Image {
            x: 0.0,
            y: 0.0,
            width: WIDTH as f32,
            height: HEIGHT as f32,
            href: background_href.to_string(),
        },
        LayoutNode::Text(TextNode {
            x: LEFT,
            y: 180.0,
            max_width: Some(800.0),
            max_lines: Some(3),
            style: TITLE,
            text: spec.title.clone(),
        }),
    ];

    let tags = format_tags(&spec.tags);
    if !tags.is_empty() {
        children.push(line(480.0, TAGS, tags));
    }
    let date = display_date(&spec.date);
    if !date.is_empty() {
        children.push(line(520.0, DATE, date));
    }
    children.push(line(560.0, SITE_NAME, site_name.to_string()));

    LayoutTree {
        width: WIDTH,
        height: HEIGHT,
        children,
    }
}

/// `#a  #b` for tags `[a, b]`; empty when there are none.
pub fn format_tags(tags: &[String]) -> String {
    tags.iter()
        .filter(|t| !t.is_empty())
        .map(|t| format!("#{t}"))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Dates and RFC 3339 timestamps as `YYYY-MM-DD`; anything else verbatim.
pub fn display_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return timestamp.date_naive().format("%Y-%m-%d").to_string();
    }
    raw.to_string()
}
