//! Front-matter splitting and the YAML-subset attribute parser.
//!
//! Posts start with a metadata block delimited by `---` lines:
//!
//! ```text
//! ---
//! title: "Hello World"
//! slug: hello-world
//! date: 2024-01-01
//! tags:
//!   - rust
//!   - blog
//! ---
//! Body starts here.
//! ```
//!
//! [`split_front_matter`] finds the block. [`parse`] turns it into a
//! [`FrontMatter`] attribute map using a deliberately small grammar:
//!
//! | Line | Meaning |
//! |---|---|
//! | `key: value` | scalar; surrounding `"`/`'` quotes are stripped |
//! | `key: [a, "b"]` | inline list |
//! | `key:` | opens a block list |
//! | `- item` | appends to the open block list (indentation allowed) |
//! | blank / `# comment` | ignored; closes an open block list |
//! | indented other line | continuation of an unsupported construct, ignored |
//!
//! A block list ends at the first line that is not a list item. That line is
//! not swallowed: it is parsed as the next entry, so
//!
//! ```text
//! tags:
//!   - a
//! slug: x
//! ```
//!
//! yields both `tags = [a]` and `slug = x`.
//!
//! The parser never returns a half-filled map: it either succeeds with every
//! attribute, or returns every [`ParseError`] it found with its line number.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// The line that opens and closes a front-matter block.
pub const DELIMITER: &str = "---";

static ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z0-9_-]+):(?:\s+(.*)|\s*)$").unwrap());

/// A front-matter attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(String),
    List(Vec<String>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::Scalar(_) => None,
            Value::List(items) => Some(items),
        }
    }
}

/// Parsed front-matter attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    attributes: BTreeMap<String, Value>,
}

impl FrontMatter {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Scalar value for `key`; `None` if absent or a list.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// List value for `key`; `None` if absent or a scalar.
    pub fn list(&self, key: &str) -> Option<&[String]> {
        self.get(key).and_then(Value::as_list)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("file does not start with a `---` front-matter block")]
    MissingBlock,
    #[error("front-matter block is never closed with `---`")]
    Unterminated,
    #[error("expected `key: value`, found `{0}`")]
    UnrecognizedLine(String),
    #[error("list item `{0}` does not belong to a list")]
    OrphanListItem(String),
    #[error("duplicate key `{0}`")]
    DuplicateKey(String),
}

/// A parse problem and the 1-based file line it occurred on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

/// Display helper for a batch of parse errors: `line 2: ...; line 5: ...`.
pub struct ParseErrors<'a>(pub &'a [ParseError]);

impl fmt::Display for ParseErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// A file split into its front-matter block and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    /// Text between the delimiters (without the delimiter lines).
    pub block: &'a str,
    /// Everything after the closing delimiter line.
    pub body: &'a str,
}

/// Locate the front-matter block at the very top of `content`.
///
/// The first line must be exactly `---` (a UTF-8 BOM and trailing whitespace
/// are tolerated); the block ends at the next `---` line. LF and CRLF line
/// endings both work.
pub fn split_front_matter(content: &str) -> Result<Split<'_>, ParseError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content.split_inclusive('\n');

    let opening = lines.next().unwrap_or_default();
    if opening.trim_end() != DELIMITER {
        return Err(ParseError {
            line: 1,
            kind: ParseErrorKind::MissingBlock,
        });
    }

    let block_start = opening.len();
    let mut offset = block_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            return Ok(Split {
                block: &content[block_start..offset],
                body: &content[offset + line.len()..],
            });
        }
        offset += line.len();
    }

    Err(ParseError {
        line: 1,
        kind: ParseErrorKind::Unterminated,
    })
}

/// Split and parse the front matter of a whole file.
pub fn parse(content: &str) -> Result<FrontMatter, Vec<ParseError>> {
    let split = split_front_matter(content).map_err(|e| vec![e])?;
    // Block line 1 is file line 2 (after the opening delimiter)
    parse_block(split.block, 2)
}

/// Classification of a single block line.
enum Line<'a> {
    Blank,
    Comment,
    Continuation,
    Item(&'a str),
    Entry { key: &'a str, value: &'a str },
    Unrecognized(&'a str),
}

fn classify(raw: &str) -> Line<'_> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if trimmed.starts_with('#') {
        return Line::Comment;
    }
    if trimmed == "-" {
        return Line::Item("");
    }
    if let Some(item) = trimmed.strip_prefix("- ") {
        return Line::Item(item.trim());
    }
    if raw.starts_with([' ', '\t']) {
        return Line::Continuation;
    }
    match ENTRY.captures(trimmed) {
        Some(caps) => Line::Entry {
            key: caps.get(1).map_or("", |m| m.as_str()),
            value: caps.get(2).map_or("", |m| m.as_str().trim()),
        },
        None => Line::Unrecognized(trimmed),
    }
}

/// A block list waiting for its items.
struct OpenList<'a> {
    key: &'a str,
    line: usize,
    items: Vec<String>,
}

/// Parse the text of a front-matter block.
///
/// `first_line` is the file line number of the block's first line, used to
/// report errors against the original file.
pub fn parse_block(block: &str, first_line: usize) -> Result<FrontMatter, Vec<ParseError>> {
    let mut attributes = BTreeMap::new();
    let mut errors = Vec::new();
    let mut open: Option<OpenList<'_>> = None;

    let mut insert = |key: &str, value: Value, line: usize, errors: &mut Vec<ParseError>| {
        if attributes.contains_key(key) {
            errors.push(ParseError {
                line,
                kind: ParseErrorKind::DuplicateKey(key.to_string()),
            });
        } else {
            attributes.insert(key.to_string(), value);
        }
    };

    for (i, raw) in block.lines().enumerate() {
        let line_no = first_line + i;
        let line = classify(raw);

        // Anything but an item closes the open list before being handled
        if !matches!(line, Line::Item(_))
            && let Some(list) = open.take()
        {
            insert(list.key, Value::List(list.items), list.line, &mut errors);
        }

        match line {
            Line::Item(item) => match open.as_mut() {
                Some(list) => list.items.push(unquote(item).to_string()),
                None => errors.push(ParseError {
                    line: line_no,
                    kind: ParseErrorKind::OrphanListItem(item.to_string()),
                }),
            },
            Line::Entry { key, value } if value.is_empty() => {
                open = Some(OpenList {
                    key,
                    line: line_no,
                    items: Vec::new(),
                });
            }
            Line::Entry { key, value } => {
                insert(key, parse_value(value), line_no, &mut errors);
            }
            Line::Unrecognized(text) => errors.push(ParseError {
                line: line_no,
                kind: ParseErrorKind::UnrecognizedLine(text.to_string()),
            }),
            Line::Blank | Line::Comment | Line::Continuation => {}
        }
    }

    if let Some(list) = open.take() {
        insert(list.key, Value::List(list.items), list.line, &mut errors);
    }

    if errors.is_empty() {
        Ok(FrontMatter { attributes })
    } else {
        Err(errors)
    }
}

/// Parse a non-empty value: inline `[a, b]` list or scalar.
fn parse_value(value: &str) -> Value {
    if let Some(inner) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        let items = inner
            .split(',')
            .map(|item| unquote(item.trim()))
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
        return Value::List(items);
    }
    Value::Scalar(unquote(value).to_string())
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalars(fm: &FrontMatter) -> Vec<(&str, &str)> {
        fm.keys()
            .filter_map(|k| fm.scalar(k).map(|v| (k, v)))
            .collect()
    }

    // =========================================================================
    // split_front_matter
    // =========================================================================

    #[test]
    fn split_finds_block_and_body() {
        let split = split_front_matter("---\ntitle: A\n---\nBody\n").unwrap();
        assert_eq!(split.block, "title: A\n");
        assert_eq!(split.body, "Body\n");
    }

    #[test]
    fn split_handles_crlf() {
        let split = split_front_matter("---\r\nslug: a\r\n---\r\nBody").unwrap();
        assert_eq!(split.block, "slug: a\r\n");
        assert_eq!(split.body, "Body");
    }

    #[test]
    fn split_accepts_empty_block_and_eof_delimiter() {
        let split = split_front_matter("---\n---").unwrap();
        assert_eq!(split.block, "");
        assert_eq!(split.body, "");
    }

    #[test]
    fn split_skips_bom() {
        let split = split_front_matter("\u{feff}---\nslug: a\n---\n").unwrap();
        assert_eq!(split.block, "slug: a\n");
    }

    #[test]
    fn split_missing_block() {
        let err = split_front_matter("# Just a heading\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingBlock);
    }

    #[test]
    fn split_unterminated_block() {
        let err = split_front_matter("---\ntitle: A\nBody\n").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Unterminated);
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    #[test]
    fn parse_scalars_and_strip_quotes() {
        let fm = parse("---\ntitle: \"Hello World\"\nslug: 'hello-world'\ndate: 2024-01-01\n---\n")
            .unwrap();
        assert_eq!(
            scalars(&fm),
            vec![
                ("date", "2024-01-01"),
                ("slug", "hello-world"),
                ("title", "Hello World"),
            ]
        );
    }

    #[test]
    fn mismatched_quotes_are_kept() {
        let fm = parse("---\ntitle: \"It's\n---\n").unwrap();
        assert_eq!(fm.scalar("title"), Some("\"It's"));
    }

    #[test]
    fn value_may_contain_colons() {
        let fm = parse("---\ntitle: Rust: the good parts\n---\n").unwrap();
        assert_eq!(fm.scalar("title"), Some("Rust: the good parts"));
    }

    // =========================================================================
    // Lists
    // =========================================================================

    #[test]
    fn parse_block_list() {
        let fm = parse("---\ntags:\n  - rust\n  - \"web dev\"\n---\n").unwrap();
        assert_eq!(
            fm.list("tags"),
            Some(&["rust".to_string(), "web dev".to_string()][..])
        );
    }

    #[test]
    fn line_after_list_is_parsed_as_entry() {
        let fm = parse("---\ntags:\n  - a\n  - b\nslug: after-list\n---\n").unwrap();
        assert_eq!(fm.list("tags").unwrap().len(), 2);
        assert_eq!(fm.scalar("slug"), Some("after-list"));
    }

    #[test]
    fn blank_line_closes_list() {
        let result = parse("---\ntags:\n  - a\n\n  - b\n---\n");
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line, 5);
        assert_eq!(errors[0].kind, ParseErrorKind::OrphanListItem("b".into()));
    }

    #[test]
    fn empty_value_without_items_is_empty_list() {
        let fm = parse("---\ntags:\nslug: x\n---\n").unwrap();
        assert_eq!(fm.list("tags"), Some(&[][..]));
        assert_eq!(fm.scalar("tags"), None);
    }

    #[test]
    fn trailing_list_is_kept() {
        let fm = parse("---\nslug: x\ntags:\n- one\n---\n").unwrap();
        assert_eq!(fm.list("tags"), Some(&["one".to_string()][..]));
    }

    #[test]
    fn parse_inline_list() {
        let fm = parse("---\ntags: [\"a\", 'b', c]\n---\n").unwrap();
        assert_eq!(
            fm.list("tags"),
            Some(&["a".to_string(), "b".to_string(), "c".to_string()][..])
        );
    }

    #[test]
    fn parse_empty_inline_list() {
        let fm = parse("---\ntags: []\n---\n").unwrap();
        assert_eq!(fm.list("tags"), Some(&[][..]));
    }

    // =========================================================================
    // Ignored lines and errors
    // =========================================================================

    #[test]
    fn comments_and_continuations_are_ignored() {
        let fm = parse("---\n# draft\ndescription: >\n  folded text\nslug: x\n---\n").unwrap();
        assert_eq!(fm.scalar("description"), Some(">"));
        assert_eq!(fm.scalar("slug"), Some("x"));
    }

    #[test]
    fn unrecognized_line_reports_line_number() {
        let errors = parse("---\nslug: x\nnot yaml at all\n---\n").unwrap_err();
        assert_eq!(
            errors,
            vec![ParseError {
                line: 3,
                kind: ParseErrorKind::UnrecognizedLine("not yaml at all".into()),
            }]
        );
    }

    #[test]
    fn duplicate_key_is_error() {
        let errors = parse("---\nslug: a\nslug: b\n---\n").unwrap_err();
        assert_eq!(errors[0].kind, ParseErrorKind::DuplicateKey("slug".into()));
    }

    #[test]
    fn all_errors_are_collected() {
        let errors = parse("---\n- orphan\n???\nslug: a\nslug: b\n---\n").unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(
            ParseErrors(&errors).to_string(),
            "line 2: list item `orphan` does not belong to a list; \
             line 3: expected `key: value`, found `???`; \
             line 5: duplicate key `slug`"
        );
    }

    #[test]
    fn missing_block_is_error() {
        let errors = parse("title: no delimiters\n").unwrap_err();
        assert_eq!(errors[0].kind, ParseErrorKind::MissingBlock);
    }
}
