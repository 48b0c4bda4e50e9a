//! CLI output formatting for all pipelines.
//!
//! # Post-First Display
//!
//! Every line is about a post, identified by its slug, with the source file
//! as secondary context. Problems are listed after the successes so the
//! summary line at the bottom is the last thing on screen.
//!
//! # Output Format
//!
//! ## Raw Markdown
//!
//! ```text
//! Copied
//!     hello-world.md ← 2024-01-01-hello-world.md
//!     My_Post.md ← 2024-03-15-legacy.md
//! Warnings
//!     2024-03-15-legacy.md: slug `My_Post` is not lowercase-hyphenated (...)
//! Skipped
//!     2024-03-01-draft.md: no slug found in front matter
//!
//! Copied 2 file(s), skipped 1
//! ```
//!
//! ## Link Cards
//!
//! ```text
//! Rewritten
//!     2024-01-01-hello-world.md
//! Skipped
//!     2024-03-01-draft.md: no slug found in front matter
//!
//! 1 card(s) in 1 of 4 file(s); OGP: 0 cached, 1 fetched, 0 fallback
//! ```
//!
//! ## OGP Images
//!
//! ```text
//! Generated
//!     hello-world.png
//! Failed
//!     broken.png (broken.md): SVG parse error: ...
//!
//! 1 image(s): 0 cached, 1 rendered (1 total)
//! ```
//!
//! # Architecture
//!
//! Each pipeline has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::check::CheckReport;
use crate::content::{Skipped, SlugWarning};
use crate::link_cards::LinkCardReport;
use crate::ogp_image::OgpImageReport;
use crate::raw_markdown::CopyReport;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// A heading followed by indented lines; nothing when `items` is empty.
fn section(lines: &mut Vec<String>, heading: &str, items: impl IntoIterator<Item = String>) {
    let items: Vec<String> = items.into_iter().collect();
    if items.is_empty() {
        return;
    }
    lines.push(heading.to_string());
    lines.extend(items.into_iter().map(|item| format!("{}{item}", indent(1))));
}

fn skipped_lines(skipped: &[Skipped]) -> impl Iterator<Item = String> + '_ {
    skipped.iter().map(|s| format!("{}: {}", s.file, s.reason))
}

fn warning_lines(warnings: &[SlugWarning]) -> impl Iterator<Item = String> + '_ {
    warnings.iter().map(|w| w.to_string())
}

// ============================================================================
// Raw Markdown
// ============================================================================

pub fn format_copy_report(report: &CopyReport) -> Vec<String> {
    let mut lines = Vec::new();
    section(
        &mut lines,
        "Copied",
        report
            .copied
            .iter()
            .map(|c| format!("{}.md ← {}", c.slug, c.file)),
    );
    section(&mut lines, "Warnings", warning_lines(&report.warnings));
    section(&mut lines, "Skipped", skipped_lines(&report.skipped));
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Copied {} file(s), skipped {}",
        report.copied.len(),
        report.skipped.len()
    ));
    lines
}

pub fn print_copy_report(report: &CopyReport) {
    for line in format_copy_report(report) {
        println!("{line}");
    }
}

// ============================================================================
// Link cards
// ============================================================================

pub fn format_link_card_report(report: &LinkCardReport) -> Vec<String> {
    let mut lines = Vec::new();
    section(&mut lines, "Rewritten", report.rewritten.iter().cloned());
    section(&mut lines, "Skipped", skipped_lines(&report.skipped));
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} card(s) in {} of {} file(s); OGP: {} cached, {} fetched, {} fallback",
        report.cards,
        report.rewritten.len(),
        report.scanned,
        report.cached,
        report.fetched,
        report.fallback
    ));
    lines
}

pub fn print_link_card_report(report: &LinkCardReport) {
    for line in format_link_card_report(report) {
        println!("{line}");
    }
    if !report.rewritten.is_empty() {
        println!("Revert the rewritten posts with `git restore` after the build.");
    }
}

// ============================================================================
// OGP images
// ============================================================================

pub fn format_ogp_image_report(report: &OgpImageReport) -> Vec<String> {
    let mut lines = Vec::new();
    section(
        &mut lines,
        "Generated",
        report.generated.iter().map(|slug| format!("{slug}.png")),
    );
    section(&mut lines, "Skipped", skipped_lines(&report.skipped));
    section(
        &mut lines,
        "Failed",
        report
            .failed
            .iter()
            .map(|f| format!("{}.png ({}): {}", f.slug, f.file, f.error)),
    );
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} image(s): {}",
        report.generated.len(),
        report.cache
    ));
    lines
}

pub fn print_ogp_image_report(report: &OgpImageReport) {
    for line in format_ogp_image_report(report) {
        println!("{line}");
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_report(report: &CheckReport) -> Vec<String> {
    let mut lines = Vec::new();
    section(
        &mut lines,
        "Posts",
        report.posts.iter().map(|p| match &p.ogp_image {
            Ok(()) => format!("{} ({})", p.slug, p.file),
            Err(reason) => format!("{} ({}) [no OGP image: {reason}]", p.slug, p.file),
        }),
    );
    section(&mut lines, "Warnings", warning_lines(&report.warnings));
    section(&mut lines, "Skipped", skipped_lines(&report.skipped));
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "{} post(s), {} warning(s), {} skipped",
        report.posts.len(),
        report.warnings.len(),
        report.skipped.len()
    ));
    lines
}

pub fn print_check_report(report: &CheckReport) {
    for line in format_check_report(report) {
        println!("{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckedPost;
    use crate::content::SkipReason;
    use crate::ogp_image::Failed;
    use crate::ogp_image::cache::CacheStats;
    use crate::raw_markdown::Copied;
    use std::path::PathBuf;

    fn skipped() -> Skipped {
        Skipped {
            file: "draft.md".into(),
            reason: SkipReason::MissingSlug,
        }
    }

    #[test]
    fn copy_report_sections() {
        let report = CopyReport {
            copied: vec![Copied {
                file: "2024-01-01-hello.md".into(),
                slug: "hello-world".into(),
                output: PathBuf::from("out/hello-world.md"),
            }],
            skipped: vec![skipped()],
            warnings: Vec::new(),
        };
        assert_eq!(
            format_copy_report(&report),
            vec![
                "Copied",
                "    hello-world.md ← 2024-01-01-hello.md",
                "Skipped",
                "    draft.md: no slug found in front matter",
                "",
                "Copied 1 file(s), skipped 1",
            ]
        );
    }

    #[test]
    fn empty_copy_report_is_summary_only() {
        assert_eq!(
            format_copy_report(&CopyReport::default()),
            vec!["Copied 0 file(s), skipped 0"]
        );
    }

    #[test]
    fn link_card_summary() {
        let report = LinkCardReport {
            scanned: 4,
            rewritten: vec!["a.md".into()],
            cards: 2,
            cached: 1,
            fetched: 1,
            fallback: 0,
            skipped: Vec::new(),
        };
        let lines = format_link_card_report(&report);
        assert_eq!(lines[0], "Rewritten");
        assert_eq!(lines[1], "    a.md");
        assert_eq!(
            lines.last().unwrap(),
            "2 card(s) in 1 of 4 file(s); OGP: 1 cached, 1 fetched, 0 fallback"
        );
    }

    #[test]
    fn ogp_image_report_lists_failures() {
        let report = OgpImageReport {
            generated: vec!["hello-world".into()],
            cache: CacheStats { hits: 0, misses: 1 },
            skipped: Vec::new(),
            failed: vec![Failed {
                file: "broken.md".into(),
                slug: "broken".into(),
                error: "boom".into(),
            }],
        };
        let lines = format_ogp_image_report(&report);
        assert!(lines.contains(&"    hello-world.png".to_string()));
        assert!(lines.contains(&"    broken.png (broken.md): boom".to_string()));
        assert_eq!(lines.last().unwrap(), "1 image(s): 1 rendered");
    }

    #[test]
    fn check_report_marks_posts_without_image() {
        let report = CheckReport {
            posts: vec![
                CheckedPost {
                    file: "a.md".into(),
                    slug: "a".into(),
                    ogp_image: Ok(()),
                },
                CheckedPost {
                    file: "b.md".into(),
                    slug: "b".into(),
                    ogp_image: Err(SkipReason::MissingTitle),
                },
            ],
            warnings: Vec::new(),
            skipped: vec![skipped()],
        };
        let lines = format_check_report(&report);
        assert_eq!(lines[1], "    a (a.md)");
        assert_eq!(lines[2], "    b (b.md) [no OGP image: missing title]");
        assert_eq!(lines.last().unwrap(), "2 post(s), 0 warning(s), 1 skipped");
    }
}
