//! CORS relay
//!
//! Forwards `GET /fetch?url=<target>` to an allow-listed upstream host and
//! returns the upstream response with permissive CORS headers, so a browser
//! page can read character sheets it could not fetch cross-origin.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, warn};

/// Upstream headers never passed back to the browser
const STRIPPED_HEADERS: &[&str] = &[
    "content-security-policy",
    "content-security-policy-report-only",
    "clear-site-data",
    "connection",
    "transfer-encoding",
    "content-length",
];

/// Relay request failure, rendered as a plain-text response
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Missing url param")]
    MissingUrl,
    #[error("Bad target URL")]
    BadTarget,
    #[error("Target not allowed")]
    NotAllowed,
    #[error("Upstream request failed")]
    Upstream(#[source] reqwest::Error),
}

impl RelayError {
    fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingUrl | RelayError::BadTarget => StatusCode::BAD_REQUEST,
            RelayError::NotAllowed => StatusCode::FORBIDDEN,
            RelayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Allow-listed forwarding proxy
#[derive(Debug, Clone)]
pub struct Relay {
    client: Client,
    allowed_hosts: Vec<String>,
}

impl Relay {
    pub fn new(allowed_hosts: Vec<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.trim().to_lowercase())
                .collect(),
        })
    }

    /// Validate the `url` query parameter against the allow list
    pub fn target(&self, raw: Option<&str>) -> Result<Url, RelayError> {
        let raw = raw.filter(|r| !r.is_empty()).ok_or(RelayError::MissingUrl)?;
        let url = Url::parse(raw).map_err(|_| RelayError::BadTarget)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RelayError::BadTarget);
        }

        let host = url.host_str().ok_or(RelayError::BadTarget)?;
        if !self.allowed_hosts.iter().any(|h| h == host) {
            debug!("Relay refused host {}", host);
            return Err(RelayError::NotAllowed);
        }
        Ok(url)
    }

    /// GET the target and rewrap its response for the browser
    pub async fn forward(&self, target: Url) -> Result<Response, RelayError> {
        debug!("Relaying {}", target);
        let upstream = self.client.get(target).send().await.map_err(|e| {
            warn!("Relay upstream error: {}", e);
            RelayError::Upstream(e)
        })?;

        let status = upstream.status();
        let mut headers = upstream.headers().clone();
        let body = upstream.bytes().await.map_err(RelayError::Upstream)?;

        for name in STRIPPED_HEADERS {
            headers.remove(*name);
        }
        apply_cors(&mut headers);

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    /// Validate and forward in one step
    pub async fn handle(&self, raw: Option<&str>) -> Response {
        match self.target(raw) {
            Ok(target) => self
                .forward(target)
                .await
                .unwrap_or_else(IntoResponse::into_response),
            Err(e) => e.into_response(),
        }
    }
}

/// Headers that let any origin read the relayed response
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

/// Response to a CORS preflight on the relay
pub fn preflight() -> Response {
    let mut headers = HeaderMap::new();
    apply_cors(&mut headers);
    (StatusCode::NO_CONTENT, headers).into_response()
}
