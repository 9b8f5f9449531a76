use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NasneError {
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request {endpoint:?}: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request {endpoint:?}: status={status} body={body:?}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("decode {endpoint:?}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),
    #[error("no endpoints returned data")]
    NoEndpoints,
}

impl NasneError {
    pub(crate) fn invalid_base_url(url: &str, reason: impl Into<String>) -> Self {
        Self::InvalidBaseUrl {
            url: url.to_string(),
            reason: reason.into(),
        }
    }

    /// Endpoint the error was raised for, if it came from a sub-API call.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Request { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => Some(endpoint),
            _ => None,
        }
    }
}
