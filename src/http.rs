//! HTTP access behind a small trait.
//!
//! The link-card enricher and the font cache only ever issue plain `GET`
//! requests with a few headers. [`HttpClient`] captures exactly that, so the
//! pipelines can run against [`ReqwestClient`] in production and a recording
//! mock in tests.
//!
//! Redirects are followed (up to 10 hops). A response with a non-2xx status
//! is still a successful fetch at this layer; callers decide what a
//! `404` means for them.

use std::time::Duration;
use thiserror::Error;

/// Transport-level failure of a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_builder() {
            FetchError::InvalidUrl(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// A `GET` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub user_agent: Option<String>,
    pub accept: Option<String>,
    pub accept_language: Option<String>,
    /// Whole-request timeout; `None` uses the client default.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: None,
            accept: None,
            accept_language: None,
            timeout: None,
        }
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.user_agent = Some(value.into());
        self
    }

    pub fn accept(mut self, value: impl Into<String>) -> Self {
        self.accept = Some(value.into());
        self
    }

    pub fn accept_language(mut self, value: impl Into<String>) -> Self {
        self.accept_language = Some(value.into());
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = Some(value);
        self
    }
}

/// Status and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues `GET` requests.
#[allow(async_fn_in_trait)]
pub trait HttpClient {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// Production client backed by `reqwest` with rustls.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    async fn get(&self, request: &HttpRequest) -> Result<HttpResponse, FetchError> {
        use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

        let mut builder = self.client.get(&request.url);
        if let Some(ua) = &request.user_agent {
            builder = builder.header(USER_AGENT, ua);
        }
        if let Some(accept) = &request.accept {
            builder = builder.header(ACCEPT, accept);
        }
        if let Some(lang) = &request.accept_language {
            builder = builder.header(ACCEPT_LANGUAGE, lang);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse { status, body })
    }
}
