// Generic endpoint-set client: fetch whatever documents are configured and let the
// extractor find the fields. Individual endpoint failures are tolerated.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{NasneError, extract, http};
use crate::collector::SnapshotFetcher;
use crate::models::Snapshot;

pub const DEFAULT_GENERIC_ENDPOINTS: &[&str] = &["/status", "/storage", "/schedule"];

pub struct GenericClient {
    base: Url,
    endpoints: Vec<String>,
    http: Client,
}

impl GenericClient {
    pub fn new<S: AsRef<str>>(
        base_url: &str,
        endpoints: &[S],
        http_timeout: Duration,
    ) -> Result<Self, NasneError> {
        let base = http::parse_base_url(base_url)?;
        Ok(Self {
            base,
            endpoints: normalize_endpoints(endpoints),
            http: http::build_client(http_timeout)?,
        })
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Fetches every endpoint, keeps what succeeded, and extracts. Fails only when nothing did.
    #[instrument(skip(self), fields(repo = "nasne_generic", operation = "fetch_snapshot", device = %self.base))]
    pub async fn fetch_snapshot(&self) -> Result<Snapshot, NasneError> {
        let mut payload = Map::new();
        let mut last_err = None;

        for ep in &self.endpoints {
            let url = http::endpoint_url(&self.base, None, ep);
            // Only JSON objects count as documents; arrays and scalars are decode errors.
            match http::get_json::<Map<String, Value>>(&self.http, url, ep).await {
                Ok(doc) => {
                    payload.insert(payload_key(ep), Value::Object(doc));
                }
                Err(e) => {
                    debug!(endpoint = %ep, error = %e, "endpoint skipped");
                    last_err = Some(e);
                }
            }
        }

        if payload.is_empty() {
            return Err(last_err.unwrap_or(NasneError::NoEndpoints));
        }
        Ok(extract::extract_snapshot(&Value::Object(payload)))
    }
}

#[async_trait]
impl SnapshotFetcher for GenericClient {
    async fn fetch_snapshot(&self) -> Result<Snapshot, NasneError> {
        GenericClient::fetch_snapshot(self).await
    }
}

/// Trims, drops empties, forces a leading `/`. Falls back to the default set when nothing is left.
fn normalize_endpoints<S: AsRef<str>>(endpoints: &[S]) -> Vec<String> {
    let normalized: Vec<String> = endpoints
        .iter()
        .map(|e| e.as_ref().trim())
        .filter(|e| !e.is_empty())
        .map(|e| {
            if e.starts_with('/') {
                e.to_string()
            } else {
                format!("/{}", e)
            }
        })
        .collect();
    if normalized.is_empty() {
        DEFAULT_GENERIC_ENDPOINTS
            .iter()
            .map(|e| e.to_string())
            .collect()
    } else {
        normalized
    }
}

/// Last path segment, so `/api/status` lands under `status`.
fn payload_key(endpoint: &str) -> String {
    let path = endpoint.split('?').next().unwrap_or(endpoint);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("/")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_endpoints_trims_and_prefixes() {
        assert_eq!(
            normalize_endpoints(&[" status ", "", "/storage", "  "]),
            vec!["/status".to_string(), "/storage".to_string()]
        );
    }

    #[test]
    fn normalize_endpoints_defaults_when_empty() {
        let empty: [&str; 0] = [];
        assert_eq!(normalize_endpoints(&empty), DEFAULT_GENERIC_ENDPOINTS);
        assert_eq!(normalize_endpoints(&[" ", ""]), DEFAULT_GENERIC_ENDPOINTS);
    }

    #[test]
    fn payload_key_is_last_segment() {
        assert_eq!(payload_key("/status"), "status");
        assert_eq!(payload_key("/api/v1/schedule/"), "schedule");
        assert_eq!(payload_key("/storage?x=1"), "storage");
        assert_eq!(payload_key("/"), "/");
    }

    #[test]
    fn new_rejects_missing_scheme() {
        assert!(GenericClient::new("nasne.local", &["/status"], Duration::from_secs(1)).is_err());
    }
}
