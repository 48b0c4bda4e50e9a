//! Content directory discovery and the rules every post must satisfy.
//!
//! All three pipelines walk the same flat directory of Markdown posts and
//! share the slug rules:
//!
//! - `slug` must be present, a string, and non-empty, or the post is skipped.
//! - A slug that would escape the output directory (`/`, `\`, `.`, `..`) is
//!   skipped as unsafe.
//! - A slug not in canonical `lowercase-hyphenated` form
//!   (`^[a-z0-9]+(-[a-z0-9]+)*$`) is only a warning.
//!
//! Skips are values ([`Skipped`]) collected into each pipeline's report; they
//! never abort a run.

use crate::front_matter::{FrontMatter, ParseError, ParseErrors, Value};
use regex::Regex;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

static CANONICAL_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap());

/// A Markdown post read from the content directory.
#[derive(Debug, Clone)]
pub struct ContentFile {
    pub path: PathBuf,
    /// File name, used for reporting (`2024-01-01-hello.md`).
    pub file_name: String,
    /// Full original text.
    pub raw: String,
}

impl ContentFile {
    pub fn read(path: &Path) -> io::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file_name: file_name(path),
            raw,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// List the `.md` files directly inside `dir`, sorted by file name.
///
/// Subdirectories are not descended into. Fails if `dir` cannot be read.
pub fn list_markdown_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("not a directory: {}", dir.display()),
        ));
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        let is_markdown = entry.file_type().is_file()
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("md"))
                .unwrap_or(false);
        if is_markdown {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Why a post was left out of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be read as UTF-8 text.
    Unreadable(String),
    /// The YAML-subset parser rejected the front matter.
    FrontMatter(Vec<ParseError>),
    /// A full YAML parser rejected the front matter.
    InvalidYaml(String),
    MissingSlug,
    SlugNotString,
    EmptySlug,
    UnsafeSlug(String),
    MissingTitle,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unreadable(e) => write!(f, "unreadable: {e}"),
            SkipReason::FrontMatter(errors) => {
                write!(f, "invalid front matter: {}", ParseErrors(errors))
            }
            SkipReason::InvalidYaml(e) => write!(f, "invalid front matter: {e}"),
            SkipReason::MissingSlug => f.write_str("no slug found in front matter"),
            SkipReason::SlugNotString => f.write_str("slug is not a string"),
            SkipReason::EmptySlug => f.write_str("slug is empty"),
            SkipReason::UnsafeSlug(slug) => {
                write!(f, "slug `{slug}` is not usable as a file name")
            }
            SkipReason::MissingTitle => f.write_str("missing title"),
        }
    }
}

/// A post left out of a pipeline, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub file: String,
    pub reason: SkipReason,
}

/// A slug that was accepted but is not in canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugWarning {
    pub file: String,
    pub slug: String,
}

impl fmt::Display for SlugWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: slug `{}` is not lowercase-hyphenated (expected ^[a-z0-9]+(-[a-z0-9]+)*$)",
            self.file, self.slug
        )
    }
}

/// Whether `slug` is in canonical `lowercase-hyphenated` form.
pub fn is_canonical_slug(slug: &str) -> bool {
    CANONICAL_SLUG.is_match(slug)
}

/// Check that a present, non-empty string slug can name an output file.
pub fn check_slug_path(slug: &str) -> Result<(), SkipReason> {
    if slug == "." || slug == ".." || slug.contains(['/', '\\']) {
        return Err(SkipReason::UnsafeSlug(slug.to_string()));
    }
    Ok(())
}

/// Extract and check the slug from parsed subset front matter.
pub fn slug_from(front_matter: &FrontMatter) -> Result<&str, SkipReason> {
    match front_matter.get("slug") {
        // `slug:` with nothing after it is a list that never got items
        None => Err(SkipReason::MissingSlug),
        Some(Value::List(items)) if items.is_empty() => Err(SkipReason::MissingSlug),
        Some(Value::List(_)) => Err(SkipReason::SlugNotString),
        Some(Value::Scalar(s)) if s.is_empty() => Err(SkipReason::EmptySlug),
        Some(Value::Scalar(s)) => {
            check_slug_path(s)?;
            Ok(s)
        }
    }
}

/// Typed post attributes, as the site's post model defines them.
///
/// Only `title` and `slug` are required; the rest default to empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAttributes {
    pub title: String,
    pub slug: String,
    pub date: String,
    pub tags: Vec<String>,
}

impl PostAttributes {
    /// Build post attributes from subset front matter.
    ///
    /// `tags` may be a list or a single scalar tag. The slug is checked
    /// first so a post missing both reports the slug.
    pub fn from_front_matter(front_matter: &FrontMatter) -> Result<Self, SkipReason> {
        let slug = slug_from(front_matter)?.to_string();
        let title = front_matter
            .scalar("title")
            .filter(|t| !t.trim().is_empty())
            .ok_or(SkipReason::MissingTitle)?
            .to_string();
        let tags = match front_matter.get("tags") {
            Some(Value::List(items)) => items.clone(),
            Some(Value::Scalar(tag)) if !tag.is_empty() => vec![tag.clone()],
            _ => Vec::new(),
        };
        Ok(Self {
            title,
            slug,
            date: front_matter.scalar("date").unwrap_or_default().to_string(),
            tags,
        })
    }
}
