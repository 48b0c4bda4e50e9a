//! Shared test utilities for the blog-prep test suite.
//!
//! Provides fixture setup, post builders and a recording HTTP mock.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let content = tmp.path().join("content");
//! write_post(&content, "extra.md", &post_source(&[("slug", "extra")], "Body"));
//!
//! let http = MockHttp::new().page("https://example.com/", OG_PAGE);
//! // ... run a pipeline against `http` ...
//! assert_eq!(http.requested_urls(), vec!["https://example.com/"]);
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tempfile::TempDir;

use crate::http::{FetchError, HttpClient, HttpRequest, HttpResponse};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/` to a temp directory and return it.
///
/// The copy has `content/` (sample posts), `assets/` (base image) and
/// `fonts/` (Tuffy, a public-domain TrueType font) at its root. Tests get an isolated copy they can mutate freely.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

/// Bytes of the fixture TrueType font (family `Tuffy`).
pub fn fixture_font() -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/fonts/Tuffy.ttf");
    std::fs::read(path).unwrap()
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Post builders
// =========================================================================

/// Build a post from `key: value` pairs and a body.
///
/// Values are written verbatim, so quote them yourself where needed.
pub fn post_source(attributes: &[(&str, &str)], body: &str) -> String {
    let mut out = String::from("---\n");
    for (key, value) in attributes {
        out.push_str(&format!("{key}: {value}\n"));
    }
    out.push_str("---\n");
    out.push_str(body);
    out
}

/// Write `source` to `dir/name`, creating `dir` if needed.
pub fn write_post(dir: &Path, name: &str, source: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), source).unwrap();
}

// =========================================================================
// HTTP mock
// =========================================================================

/// A page with a complete set of Open Graph tags.
pub const OG_PAGE: &str = r#"<!doctype html>
<html><head>
<title>Fallback Title</title>
<meta property="og:title" content="Example &amp; Co">
<meta property="og:description" content="An example page">
<meta property="og:image" content="/img/card.png">
<meta property="og:site_name" content="Example Site">
<link rel="icon" href="/static/icon.png">
</head><body></body></html>"#;

/// HTTP client that serves canned responses and records every request.
///
/// Unknown URLs fail with a transport error. Uses Mutex so it can be shared
/// by reference across awaits.
#[derive(Default)]
pub struct MockHttp {
    responses: HashMap<String, Result<HttpResponse, FetchError>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl MockHttp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with status 200 for `url`.
    pub fn page(self, url: &str, body: &str) -> Self {
        self.bytes(url, 200, body.as_bytes())
    }

    /// Serve `body` with `status` for `url`.
    pub fn bytes(mut self, url: &str, status: u16, body: &[u8]) -> Self {
        self.responses.insert(
            url.to_string(),
            Ok(HttpResponse {
                status,
                body: body.to_vec(),
            }),
        );
        self
    }

    /// Fail requests for `url` with `error`.
    pub fn error(mut self, url: &str, error: FetchError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    pub fn get_requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.get_requests().into_iter().map(|r| r.url).collect()
    }
}

impl HttpClient for MockHttp {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::Transport(format!("no route to {}", request.url))))
    }
}
