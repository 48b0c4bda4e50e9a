//! Line scanner that finds standalone URLs and swaps them for cards.
//!
//! Both operations share one state machine over `\n`-separated lines:
//!
//! - The first and second lines whose trimmed text is exactly `---` open and
//!   close the front matter. Later `---` lines are ordinary text.
//! - Outside front matter, a line whose trimmed text starts with three
//!   backticks toggles a code fence.
//! - Outside both, a line whose trimmed text is one bare `http(s)` URL is a
//!   candidate.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::card::render_card;
use crate::store::OgpRecord;

static STANDALONE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://[^\s<>\[\]()]+$").unwrap());

const FENCE: &str = "```";

/// What a single line is, given everything before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind<'a> {
    /// A front-matter delimiter or a line inside the front matter.
    FrontMatter,
    /// A fence line or a line inside a fenced block.
    Code,
    /// A standalone URL (trimmed).
    Url(&'a str),
    Text,
}

#[derive(Debug, Default)]
struct Scanner {
    delimiters_seen: u8,
    in_front_matter: bool,
    in_code_block: bool,
}

impl Scanner {
    fn classify<'a>(&mut self, line: &'a str) -> LineKind<'a> {
        let trimmed = line.trim();

        if trimmed == "---" && self.delimiters_seen < 2 {
            self.delimiters_seen += 1;
            self.in_front_matter = self.delimiters_seen == 1;
            return LineKind::FrontMatter;
        }
        if self.in_front_matter {
            return LineKind::FrontMatter;
        }

        if trimmed.starts_with(FENCE) {
            self.in_code_block = !self.in_code_block;
            return LineKind::Code;
        }
        if self.in_code_block {
            return LineKind::Code;
        }

        if STANDALONE_URL.is_match(trimmed) {
            LineKind::Url(trimmed)
        } else {
            LineKind::Text
        }
    }
}

/// Standalone URLs outside front matter and code fences, in document order.
///
/// Duplicates are kept; callers dedupe when resolving.
pub fn extract_standalone_urls(content: &str) -> Vec<String> {
    let mut scanner = Scanner::default();
    content
        .split('\n')
        .filter_map(|line| match scanner.classify(line) {
            LineKind::Url(url) => Some(url.to_string()),
            _ => None,
        })
        .collect()
}

/// Replace every candidate line that has a record in `cards` with a blank
/// line, the card HTML on one line, and another blank line.
///
/// Candidates without a record and all other lines are kept byte-for-byte.
pub fn transform_content(content: &str, cards: &HashMap<String, OgpRecord>) -> String {
    let mut scanner = Scanner::default();
    let mut out: Vec<String> = Vec::new();

    for line in content.split('\n') {
        if let LineKind::Url(url) = scanner.classify(line)
            && let Some(record) = cards.get(url)
        {
            out.push(String::new());
            out.push(render_card(record));
            out.push(String::new());
            continue;
        }
        out.push(line.to_string());
    }

    out.join("\n")
}
