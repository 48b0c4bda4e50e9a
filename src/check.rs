//! Read-only content check.
//!
//! Runs the same front-matter rules as the three pipelines over the content
//! directory without writing anything, so problems show up before a build.
//! A post is listed as publishable when the raw export would copy it; the
//! report also says whether the OGP generator would accept it, since that
//! parser is stricter (title required, YAML subset only).

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::content::{self, ContentFile, SkipReason, Skipped, SlugWarning, is_canonical_slug};
use crate::front_matter;
use crate::ogp_image::layout::OgpImageSpec;
use crate::raw_markdown::validate_slug;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Content directory not found: {0}")]
    ContentDirMissing(PathBuf),
}

/// A post with a usable slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckedPost {
    pub file: String,
    pub slug: String,
    /// Why the OGP generator would skip this post, if it would.
    pub ogp_image: Result<(), SkipReason>,
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub posts: Vec<CheckedPost>,
    pub warnings: Vec<SlugWarning>,
    pub skipped: Vec<Skipped>,
}

impl CheckReport {
    /// No post was skipped.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub fn check_content(content_dir: &Path) -> Result<CheckReport, CheckError> {
    if !content_dir.is_dir() {
        return Err(CheckError::ContentDirMissing(content_dir.to_path_buf()));
    }
    let mut report = CheckReport::default();

    for path in content::list_markdown_files(content_dir)? {
        let post = match ContentFile::read(&path) {
            Ok(post) => post,
            Err(e) => {
                let file = path
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                report.skipped.push(Skipped {
                    file,
                    reason: SkipReason::Unreadable(e.to_string()),
                });
                continue;
            }
        };

        let slug = match validate_slug(&post.raw) {
            Ok(slug) => slug,
            Err(reason) => {
                report.skipped.push(Skipped {
                    file: post.file_name,
                    reason,
                });
                continue;
            }
        };

        if !is_canonical_slug(&slug) {
            report.warnings.push(SlugWarning {
                file: post.file_name.clone(),
                slug: slug.clone(),
            });
        }

        let ogp_image = front_matter::parse(&post.raw)
            .map_err(SkipReason::FrontMatter)
            .and_then(|fm| OgpImageSpec::from_front_matter(&fm))
            .map(|_| ());

        report.posts.push(CheckedPost {
            file: post.file_name,
            slug,
            ogp_image,
        });
    }

    Ok(report)
}
