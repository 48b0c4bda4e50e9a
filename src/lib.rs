//! # blog-prep
//!
//! Build-time content processing for a Markdown blog. The posts directory is
//! the data source: one `.md` file per post, YAML front matter on top, and a
//! `slug` that names the post everywhere else.
//!
//! # Architecture: Three Independent Pipelines
//!
//! Each pipeline reads the content directory on its own and can run alone:
//!
//! ```text
//! 1. Link cards   content/*.md  →  content/*.md     (bare URL lines → card HTML, before build)
//! 2. OGP images   content/*.md  →  public/ogp/*.png  (one 1200×630 card per post, before build)
//! 3. Raw export   content/*.md  →  dist/raw/*.md     (copy by slug, after build)
//! ```
//!
//! The link-card pipeline rewrites sources in place. It is meant to run on a
//! throwaway checkout (CI) or be reverted with `git restore` after the build.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `blog-prep.toml` loading, stock defaults, path resolution |
//! | [`front_matter`] | Line-based YAML subset parser (scalars and string lists) |
//! | [`content`] | Post discovery, slug rules, skip reasons shared by every pipeline |
//! | [`escape`] | HTML escaping and entity decoding |
//! | [`http`] | `HttpClient` seam and its reqwest implementation |
//! | [`store`] | JSON-backed Open Graph metadata cache with TTL |
//! | [`link_cards`] | Standalone-URL scanner, metadata scraper, card renderer |
//! | [`ogp_image`] | Layout, SVG, rasterization, font fetch, render cache |
//! | [`raw_markdown`] | Post-build copy of sources to `{slug}.md` |
//! | [`check`] | Read-only validation of every post |
//! | [`output`] | CLI output formatting for all pipeline reports |
//!
//! # Design Decisions
//!
//! ## Two Front-Matter Parsers
//!
//! The raw export validates with a full YAML parser, so anything the site
//! generator accepts is accepted here. The link-card and OGP pipelines only
//! need a handful of flat keys and use the [`front_matter`] subset parser,
//! which reports line-numbered errors instead of YAML's positional ones.
//!
//! ## Network Behind a Trait
//!
//! Every HTTP request goes through [`http::HttpClient`]. The CLI passes a
//! reqwest client; tests pass a mock that serves canned pages, so no test
//! touches the network.
//!
//! ## Skip, Don't Abort
//!
//! A post with a missing or bad slug is reported and left out. Only problems
//! that make the whole run meaningless (missing content directory, missing
//! base image, no font) stop a pipeline.

pub mod check;
pub mod config;
pub mod content;
pub mod escape;
pub mod front_matter;
pub mod http;
pub mod link_cards;
pub mod ogp_image;
pub mod output;
pub mod raw_markdown;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
