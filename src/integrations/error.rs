use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to a third-party HTTP API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{service} credentials are not configured")]
    MissingCredentials { service: &'static str },
    #[error("failed to build {service} HTTP client")]
    ClientBuilder {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {service} failed")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// Non-success status returned by the remote API, body kept verbatim.
    #[error("{service} responded with status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode {service} response")]
    Decode {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected {service} payload: {message}")]
    Payload {
        service: &'static str,
        message: String,
    },
}

pub type UpstreamResult<T> = Result<T, UpstreamError>;

impl UpstreamError {
    /// HTTP status reported by the remote API, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            UpstreamError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Turn a non-success response into [`UpstreamError::Status`].
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> UpstreamResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(UpstreamError::Status {
        service,
        status,
        body,
    })
}
