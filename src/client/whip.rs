//! WHIP signaling exchange
//!
//! ```text
//! POST <ingest>            Content-Type: application/sdp, body = offer
//!   <- 2xx                 Location: <session resource>, body = answer
//! DELETE <resource>        (optional, on stop)
//! ```

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, ETAG, LOCATION};
use url::Url;

use crate::error::{Error, Result};

pub const SDP_CONTENT_TYPE: &str = "application/sdp";

/// Answer returned by the ingest endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhipAnswer {
    /// Raw SDP answer text
    pub sdp: String,

    /// Session resource, resolved against the ingest URL
    pub location: Option<Url>,

    pub etag: Option<String>,
}

/// HTTP client for WHIP endpoints
#[derive(Debug, Clone)]
pub struct WhipClient {
    http: reqwest::Client,
    bearer_token: Option<String>,
}

impl WhipClient {
    pub fn new(bearer_token: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(Error::network)?;

        Ok(Self { http, bearer_token })
    }

    /// POST the offer and return the answer.
    ///
    /// Non-success status: `PublishRejected`. Transport failure: `Network`.
    /// Empty answer body: `Negotiation`.
    pub async fn publish(&self, ingest_url: &Url, offer_sdp: &str) -> Result<WhipAnswer> {
        let mut request = self
            .http
            .post(ingest_url.clone())
            .header(CONTENT_TYPE, SDP_CONTENT_TYPE)
            .body(offer_sdp.to_owned());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(url = %ingest_url, offer_len = offer_sdp.len(), "Sending WHIP offer");
        let response = request.send().await.map_err(Error::network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %ingest_url, status = status.as_u16(), "WHIP publish rejected");
            return Err(Error::PublishRejected {
                status: status.as_u16(),
            });
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| ingest_url.join(v).ok());
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let sdp = response.text().await.map_err(Error::network)?;
        if sdp.trim().is_empty() {
            return Err(Error::Negotiation("Empty SDP answer".into()));
        }

        tracing::debug!(
            status = status.as_u16(),
            location = ?location.as_ref().map(Url::as_str),
            "Received WHIP answer"
        );

        Ok(WhipAnswer {
            sdp,
            location,
            etag,
        })
    }

    /// DELETE the session resource, ending the broadcast server-side.
    pub async fn terminate(&self, resource_url: &Url) -> Result<()> {
        let mut request = self.http.delete(resource_url.clone());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(Error::network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::PublishRejected {
                status: status.as_u16(),
            });
        }

        tracing::debug!(url = %resource_url, "WHIP session terminated");
        Ok(())
    }
}
