// Shared GET-JSON plumbing for device clients

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use super::NasneError;
use crate::version;

/// Max bytes of a non-2xx body kept in the error for diagnostics.
const MAX_ERROR_BODY: usize = 2048;

/// Parses a device base address. Requires an http(s) scheme and a host.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, NasneError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(NasneError::invalid_base_url(raw, "base URL is required"));
    }
    let url = Url::parse(raw).map_err(|e| NasneError::invalid_base_url(raw, e.to_string()))?;
    if !url.has_host() || url.host_str().is_none_or(str::is_empty) {
        return Err(NasneError::invalid_base_url(
            raw,
            "base URL must include scheme and host",
        ));
    }
    if !matches!(url.scheme(), "http" | "https") {
        return Err(NasneError::invalid_base_url(
            raw,
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }
    Ok(url)
}

/// Whether the authority of `raw` spells out a port. `Url` drops a port equal to the
/// scheme default, so `http://host:80` would otherwise look portless.
pub(crate) fn has_explicit_port(raw: &str) -> bool {
    let rest = raw.trim().split_once("://").map_or(raw, |(_, r)| r);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let port = match host_port.rfind(']') {
        Some(end) => host_port[end + 1..].strip_prefix(':'),
        None => host_port.rsplit_once(':').map(|(_, p)| p),
    };
    port.is_some_and(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client, NasneError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(version::user_agent())
        .build()
        .map_err(NasneError::Client)
}

/// Joins `path_and_query` onto the base path and pins the port. `None` keeps the base port.
pub(crate) fn endpoint_url(base: &Url, port: Option<u16>, path_and_query: &str) -> Url {
    let (path, query) = match path_and_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_and_query, None),
    };
    let mut url = base.clone();
    if port.is_some() {
        // Host presence is checked in parse_base_url, so this cannot fail.
        let _ = url.set_port(port);
    }
    let joined = format!(
        "{}/{}",
        base.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(query);
    url
}

/// GET `url` and decode a JSON body. `endpoint` labels any error.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: Url,
    endpoint: &str,
) -> Result<T, NasneError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|source| NasneError::Request {
            endpoint: endpoint.to_string(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.bytes().await.unwrap_or_default();
        return Err(NasneError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    let body = resp.bytes().await.map_err(|source| NasneError::Request {
        endpoint: endpoint.to_string(),
        source,
    })?;
    serde_json::from_slice(&body).map_err(|source| NasneError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

fn truncate_body(body: &[u8]) -> String {
    let cut = &body[..body.len().min(MAX_ERROR_BODY)];
    String::from_utf8_lossy(cut).trim().to_string()
}
