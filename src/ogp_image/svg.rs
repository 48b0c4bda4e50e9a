//! SVG rendering of a [`LayoutTree`].
//!
//! SVG has no text wrapping, so wrapped blocks are broken into lines here,
//! one `<text>` element per line. Line breaks are chosen from an estimated
//! advance per character rather than real glyph metrics: wide (CJK,
//! fullwidth, emoji) characters count as one em, everything else as 0.6 em.
//! That is close enough for a bold sans-serif and keeps layout independent of
//! the font bytes.
//!
//! Latin text breaks between words; wide characters may break anywhere; a
//! single token wider than the box is split by character.

use super::layout::{LayoutNode, LayoutTree, TextNode};
use crate::escape::escape_html;

const ELLIPSIS: char = '…';
const NARROW_EM: f32 = 0.6;
const WIDE_EM: f32 = 1.0;
/// Ascent as a fraction of font size, used to place the baseline.
const ASCENT: f32 = 0.88;

fn is_wide(c: char) -> bool {
    matches!(c as u32,
        0x1100..=0x115F
        | 0x2E80..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1F64F
        | 0x1F900..=0x1F9FF
        | 0x20000..=0x3FFFD)
}

fn advance(c: char) -> f32 {
    if is_wide(c) { WIDE_EM } else { NARROW_EM }
}

/// Estimated rendered width of `text` at `font_size`.
pub fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(advance).sum::<f32>() * font_size
}

enum Token {
    Word(String),
    Space,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            if !word.is_empty() {
                tokens.push(Token::Word(std::mem::take(&mut word)));
            }
            if !matches!(tokens.last(), Some(Token::Space)) {
                tokens.push(Token::Space);
            }
        } else if is_wide(c) {
            if !word.is_empty() {
                tokens.push(Token::Word(std::mem::take(&mut word)));
            }
            tokens.push(Token::Word(c.to_string()));
        } else {
            word.push(c);
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}

fn finish_line(lines: &mut Vec<String>, line: &mut String) {
    let trimmed = line.trim_end();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
    line.clear();
}

/// Break `text` into lines no wider than `max_width`, keeping at most
/// `max_lines`. A clamped last line ends with `…`.
pub fn wrap_text(text: &str, font_size: f32, max_width: f32, max_lines: usize) -> Vec<String> {
    let fits = |s: &str| estimate_width(s, font_size) <= max_width;
    let mut lines = Vec::new();
    let mut line = String::new();

    for token in tokenize(text) {
        let word = match token {
            Token::Space => {
                if !line.is_empty() {
                    line.push(' ');
                }
                continue;
            }
            Token::Word(word) => word,
        };

        if fits(&format!("{line}{word}")) {
            line.push_str(&word);
            continue;
        }
        finish_line(&mut lines, &mut line);
        if fits(&word) {
            line = word;
            continue;
        }
        for c in word.chars() {
            if !line.is_empty() && !fits(&format!("{line}{c}")) {
                finish_line(&mut lines, &mut line);
            }
            line.push(c);
        }
    }
    finish_line(&mut lines, &mut line);

    if lines.len() > max_lines {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            while !last.is_empty() && !fits(&format!("{last}{ELLIPSIS}")) {
                last.pop();
            }
            let kept = last.trim_end().len();
            last.truncate(kept);
            last.push(ELLIPSIS);
        }
    }
    lines
}

fn lines_of(node: &TextNode) -> Vec<String> {
    match node.max_width {
        Some(max_width) => wrap_text(
            &node.text,
            node.style.font_size,
            max_width,
            node.max_lines.unwrap_or(usize::MAX),
        ),
        None => vec![node.text.clone()],
    }
}

/// Baseline of line `index` of a block whose top is `top`.
fn baseline(node: &TextNode, index: usize) -> f32 {
    let size = node.style.font_size;
    let line_box = size * node.style.line_height;
    node.y + index as f32 * line_box + (line_box - size) / 2.0 + size * ASCENT
}

fn push_text(svg: &mut String, node: &TextNode, font_family: &str) {
    let weight = if node.style.bold { r#" font-weight="700""# } else { "" };
    for (i, text) in lines_of(node).iter().enumerate() {
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y:.1}" font-family="{family}" font-size="{size}"{weight} fill="{fill}" xml:space="preserve">{text}</text>"#,
            x = node.x,
            y = baseline(node, i),
            family = escape_html(font_family),
            size = node.style.font_size,
            fill = node.style.color,
            text = escape_html(text),
        ));
    }
}

/// Render `tree` as a standalone SVG document.
pub fn render_svg(tree: &LayoutTree, font_family: &str) -> String {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = tree.width,
        h = tree.height,
    );
    for node in &tree.children {
        match node {
            LayoutNode::Image {
                x,
                y,
                width,
                height,
                href,
            } => svg.push_str(&format!(
                r#"<image x="{x}" y="{y}" width="{width}" height="{height}" preserveAspectRatio="none" href="{href}"/>"#,
                href = escape_html(href),
            )),
            LayoutNode::Text(text) => push_text(&mut svg, text, font_family),
        }
    }
    svg.push_str("</svg>");
    svg
}
