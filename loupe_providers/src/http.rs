//! Blocking HTTP plumbing shared by the provider clients.

use std::time::Duration;

use loupe_provider_api::{ProviderError, ProviderKind, ProviderResult};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, LINK, RETRY_AFTER};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::ProviderEndpoints;

const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
const ERROR_BODY_LIMIT: usize = 300;

/// Thin wrapper around a blocking `reqwest` client bound to one backend.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: Client,
    backend: ProviderKind,
}

impl HttpClient {
    pub(crate) fn new(
        backend: ProviderKind,
        endpoints: &ProviderEndpoints,
        default_headers: HeaderMap,
    ) -> ProviderResult<Self> {
        let mut builder = Client::builder()
            .user_agent(endpoints.user_agent.clone())
            .default_headers(default_headers);
        if let Some(timeout) = endpoints.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|err| {
            ProviderError::invalid_configuration(format!("failed to build {backend} client: {err}"))
        })?;

        Ok(Self { client, backend })
    }

    pub(crate) fn get(&self, url: Url) -> RequestBuilder {
        self.client.get(url)
    }

    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send the request and turn non-success statuses into [`ProviderError`]s.
    pub(crate) fn send(&self, request: RequestBuilder) -> ProviderResult<Response> {
        let request = request.build().map_err(transport_error)?;
        debug!(
            backend = %self.backend,
            method = %request.method(),
            url = %request.url(),
            "sending request"
        );

        let response = self.client.execute(request).map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().unwrap_or_default();
        debug!(backend = %self.backend, %status, "request failed");
        Err(classify_status(status, &headers, &body))
    }

    pub(crate) fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ProviderResult<T> {
        decode_json(self.send(request)?)
    }
}

/// Decode a JSON body, reporting the serde path on failure.
pub(crate) fn decode_json<T: DeserializeOwned>(response: Response) -> ProviderResult<T> {
    let body = response.text().map_err(transport_error)?;
    serde_json::from_str(&body).map_err(|err| ProviderError::serialization(err.to_string()))
}

/// Map an unsuccessful HTTP status onto the shared error taxonomy.
pub(crate) fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> ProviderError {
    let detail = format!("HTTP {status}: {}", truncate(body, ERROR_BODY_LIMIT));
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited {
            retry_after: retry_after(headers),
        },
        StatusCode::FORBIDDEN if is_rate_limited(headers) => ProviderError::RateLimited {
            retry_after: retry_after(headers),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::AuthFailure { message: detail }
        }
        StatusCode::NOT_FOUND | StatusCode::GONE => ProviderError::NotFound { what: detail },
        // The backend rejected what the settings asked for, e.g. a bad search query.
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::InvalidConfiguration { message: detail }
        }
        status if status.is_server_error() => ProviderError::BackendUnavailable { message: detail },
        StatusCode::REQUEST_TIMEOUT => ProviderError::BackendUnavailable { message: detail },
        _ => ProviderError::Serialization { message: detail },
    }
}

pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_decode() {
        return ProviderError::serialization(err.to_string());
    }
    if err.is_builder() {
        return ProviderError::invalid_configuration(err.to_string());
    }
    ProviderError::unavailable(err.to_string())
}

fn is_rate_limited(headers: &HeaderMap) -> bool {
    headers.contains_key(RETRY_AFTER)
        || headers
            .get(RATE_LIMIT_REMAINING)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|remaining| remaining.trim() == "0")
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Target of the `rel="next"` entry of an RFC 8288 `Link` header.
pub(crate) fn next_link(headers: &HeaderMap) -> Option<Url> {
    let header = headers.get(LINK)?.to_str().ok()?;
    header.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|param| param.trim().trim_start_matches("rel=").trim_matches('"') == "next");
        if !is_next {
            return None;
        }
        let target = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(target).ok()
    })
}

/// Parse a configured base URL, forcing a trailing slash so `Url::join` appends.
pub(crate) fn base_url(raw: &str) -> ProviderResult<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|err| ProviderError::invalid_configuration(format!("invalid url '{raw}': {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ProviderError::invalid_configuration(format!(
            "unsupported url scheme '{}'",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Build a header value from a credential, flagging it sensitive.
pub(crate) fn secret_header(value: &str) -> ProviderResult<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| ProviderError::invalid_configuration("token contains invalid characters"))?;
    header.set_sensitive(true);
    Ok(header)
}

pub(crate) fn join(base: &Url, path: &str) -> ProviderResult<Url> {
    base.join(path)
        .map_err(|err| ProviderError::invalid_configuration(format!("invalid path '{path}': {err}")))
}

/// Append percent-encoded path segments to `base`.
pub(crate) fn with_segments(base: &Url, segments: &[&str]) -> ProviderResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| ProviderError::invalid_configuration(format!("'{base}' cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
