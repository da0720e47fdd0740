// API client module: a small blocking HTTP client that talks to the
// secret-post message store. The store answers three calls: POST a
// message to the base URL, GET it back at `<base>/<key>`, and DELETE the
// base URL to purge expired messages.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;

/// Message payload accepted by the store. `expire_date` and
/// `burn_after_read` are only interpreted by the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content: String,
    pub expire_date: String,
    pub burn_after_read: bool,
}

/// Errors raised while talking to the store.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL is unusable.
    #[error("invalid store URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Connection, timeout or body decoding failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The store answered with an unexpected status.
    #[error("{status}, {body}")]
    Status { status: u16, body: String },
}

/// Result of a GET for a stored key. Only transport problems are errors;
/// every HTTP answer maps to one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Found(serde_json::Value),
    /// 200 whose body is not JSON. The raw body is kept for display.
    NotJson(String),
    NotFound,
    Failed { status: u16, body: String },
}

/// Bytes that may not appear raw in an HTTP request path. `%` and `/`
/// are absent: the store looks keys up by raw path without decoding.
const KEY_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Blocking client bound to one store base URL.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

/// Parse and check a store base URL. Only absolute http(s) URLs are
/// accepted since keys are appended as path segments.
pub fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let invalid = |reason: String| ApiError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme `{other}`"))),
    }
    if url.cannot_be_a_base() {
        return Err(invalid("URL cannot carry a path".into()));
    }
    Ok(url)
}

/// Map a GET answer to a [`FetchOutcome`].
pub fn classify_fetch(status: StatusCode, body: String) -> FetchOutcome {
    match status {
        StatusCode::OK => match serde_json::from_str(&body) {
            Ok(value) => FetchOutcome::Found(value),
            Err(err) => {
                warn!(error = %err, "store returned 200 with a non-JSON body");
                FetchOutcome::NotJson(body)
            }
        },
        StatusCode::NOT_FOUND => FetchOutcome::NotFound,
        other => FetchOutcome::Failed {
            status: other.as_u16(),
            body,
        },
    }
}

impl ApiClient {
    /// Create a client for `base_url` with an explicit per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ApiClient { client, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(config.base_url.as_str(), config.timeout)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of a stored message: the key is appended after the base path.
    /// The key is never trimmed. Control bytes, whitespace, non-ASCII and
    /// the delimiters in `KEY_ESCAPE` are percent-encoded before the URL
    /// parser sees them; everything else, `%XX` and `/` included, is sent
    /// as is.
    pub fn message_url(&self, key: &str) -> Url {
        let mut url = self.base_url.clone();
        let path = format!(
            "{}/{}",
            self.base_url.path().trim_end_matches('/'),
            utf8_percent_encode(key, KEY_ESCAPE)
        );
        url.set_path(&path);
        url
    }

    /// POST a message and return the key from the response body. Any
    /// status other than 200 is reported as [`ApiError::Status`].
    pub fn store(&self, message: &Message) -> Result<String, ApiError> {
        debug!(url = %self.base_url, "submitting message");
        // `.json` sets `Content-Type: application/json`.
        let res = self
            .client
            .post(self.base_url.clone())
            .json(message)
            .send()?;
        let status = res.status();
        if status != StatusCode::OK {
            let body = res.text().unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let key = res.text()?;
        debug!(key = %key, "message stored");
        Ok(key)
    }

    /// GET the message stored under `key`.
    pub fn fetch(&self, key: &str) -> Result<FetchOutcome, ApiError> {
        let url = self.message_url(key);
        debug!(url = %url, "fetching message");
        let res = self.client.get(url).send()?;
        let status = res.status();
        let body = res.text()?;
        Ok(classify_fetch(status, body))
    }

    /// Ask the store to purge expired messages.
    pub fn cleanup(&self) -> Result<(), ApiError> {
        debug!(url = %self.base_url, "requesting cleanup of expired messages");
        let res = self.client.delete(self.base_url.clone()).send()?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
