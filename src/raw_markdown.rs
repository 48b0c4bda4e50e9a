//! Raw Markdown export: the front-matter validator & copier.
//!
//! Runs after the site build. Every post with a usable `slug` is copied
//! byte-for-byte to `{output_dir}/{slug}.md`, so the published site can serve
//! the Markdown source next to the rendered page.
//!
//! ## Validation
//!
//! Front matter is parsed as full YAML (`serde_yaml`) because the copy must
//! accept anything the site build accepts. The `slug` attribute decides the
//! outcome:
//!
//! | `slug` | Result |
//! |---|---|
//! | missing, or no front-matter block | skipped |
//! | not a string (`slug: 12`, a list, …) | skipped |
//! | empty string | skipped |
//! | contains a path separator, `.` or `..` | skipped |
//! | not `lowercase-hyphenated` (`My_Post`) | copied, with a warning |
//! | `hello-world` | copied |
//!
//! ## Preconditions
//!
//! The content directory and the build output directory must both exist;
//! otherwise the run fails before touching anything. The raw output
//! directory itself is created on demand.

use crate::content::{
    self, ContentFile, SkipReason, Skipped, SlugWarning, check_slug_path, is_canonical_slug,
};
use crate::front_matter;
use log::{info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Content directory not found: {0}")]
    ContentDirMissing(PathBuf),
    #[error("Build output directory not found: {0} (run the site build first)")]
    BuildDirMissing(PathBuf),
}

/// A post written to the raw output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Copied {
    pub file: String,
    pub slug: String,
    pub output: PathBuf,
}

/// Outcome of a raw Markdown export run.
#[derive(Debug, Default)]
pub struct CopyReport {
    pub copied: Vec<Copied>,
    pub skipped: Vec<Skipped>,
    pub warnings: Vec<SlugWarning>,
}

/// Extract a usable slug from a post using a full YAML parse.
pub fn validate_slug(raw: &str) -> Result<String, SkipReason> {
    let block = match front_matter::split_front_matter(raw) {
        Ok(split) => split.block,
        // No front matter means no attributes, so no slug
        Err(_) => return Err(SkipReason::MissingSlug),
    };
    if block.trim().is_empty() {
        return Err(SkipReason::MissingSlug);
    }

    let attributes: HashMap<String, serde_yaml::Value> =
        serde_yaml::from_str(block).map_err(|e| SkipReason::InvalidYaml(e.to_string()))?;

    match attributes.get("slug") {
        None | Some(serde_yaml::Value::Null) => Err(SkipReason::MissingSlug),
        Some(serde_yaml::Value::String(slug)) if slug.is_empty() => Err(SkipReason::EmptySlug),
        Some(serde_yaml::Value::String(slug)) => {
            check_slug_path(slug)?;
            Ok(slug.clone())
        }
        Some(_) => Err(SkipReason::SlugNotString),
    }
}

/// Copy every post with a valid slug into `output_dir`.
///
/// Fails without writing anything if `content_dir` or `build_dir` is absent.
pub fn copy_raw_markdown(
    content_dir: &Path,
    build_dir: &Path,
    output_dir: &Path,
) -> Result<CopyReport, CopyError> {
    if !content_dir.is_dir() {
        return Err(CopyError::ContentDirMissing(content_dir.to_path_buf()));
    }
    if !build_dir.is_dir() {
        return Err(CopyError::BuildDirMissing(build_dir.to_path_buf()));
    }

    let files = content::list_markdown_files(content_dir)?;
    let mut report = CopyReport::default();
    if files.is_empty() {
        info!("No Markdown files found in {}", content_dir.display());
        return Ok(report);
    }

    std::fs::create_dir_all(output_dir)?;

    for path in &files {
        let post = match ContentFile::read(path) {
            Ok(post) => post,
            Err(e) => {
                skip(&mut report, path_name(path), SkipReason::Unreadable(e.to_string()));
                continue;
            }
        };

        let slug = match validate_slug(&post.raw) {
            Ok(slug) => slug,
            Err(reason) => {
                skip(&mut report, post.file_name, reason);
                continue;
            }
        };

        if !is_canonical_slug(&slug) {
            let warning = SlugWarning {
                file: post.file_name.clone(),
                slug: slug.clone(),
            };
            warn!("{warning}");
            report.warnings.push(warning);
        }

        let output = output_dir.join(format!("{slug}.md"));
        std::fs::write(&output, &post.raw)?;
        info!("Copied: {} -> {slug}.md", post.file_name);
        report.copied.push(Copied {
            file: post.file_name,
            slug,
            output,
        });
    }

    Ok(report)
}

fn skip(report: &mut CopyReport, file: String, reason: SkipReason) {
    warn!("Skipping {file}: {reason}");
    report.skipped.push(Skipped { file, reason });
}

fn path_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
