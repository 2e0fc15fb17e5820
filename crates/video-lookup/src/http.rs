//! HTTP lookup against a `videos.list`-style endpoint
//!
//! Issues `GET <endpoint>?part=contentDetails,player&id=<id>&key=<credential>`
//! with a per-request timeout. Any status code is returned to the caller
//! verbatim; only transport failures (connect, timeout, body read) become
//! errors.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::{Lookup, LookupError, LookupResponse, Result};

/// Default metadata endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Resource parts requested on every lookup.
const PARTS: &str = "contentDetails,player";

/// Requested player width. Setting it makes the API report embed dimensions.
const MAX_EMBED_WIDTH: &str = "1280";

/// reqwest-backed lookup.
pub struct HttpLookup {
    client: reqwest::Client,
    endpoint_url: String,
    timeout: Duration,
}

impl HttpLookup {
    pub fn new(client: reqwest::Client, endpoint_url: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint_url,
            timeout,
        }
    }
}

impl Lookup for HttpLookup {
    fn id(&self) -> &str {
        "http"
    }

    fn fetch<'a>(
        &'a self,
        video_id: &'a str,
        credential: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<LookupResponse>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&self.endpoint_url)
                .query(&[
                    ("part", PARTS),
                    ("id", video_id),
                    ("key", credential),
                    ("maxWidth", MAX_EMBED_WIDTH),
                ])
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| self.map_error(e))?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| self.map_error(e))?;
            debug!(video_id, status, bytes = body.len(), "lookup response received");
            Ok(LookupResponse { status, body })
        })
    }
}

impl HttpLookup {
    fn map_error(&self, e: reqwest::Error) -> LookupError {
        if e.is_timeout() {
            LookupError::Timeout(self.timeout.as_secs())
        } else {
            // Strip the URL: it carries the credential in its query string.
            LookupError::Transport(e.without_url().to_string())
        }
    }
}
