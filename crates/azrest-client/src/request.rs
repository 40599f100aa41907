//! HTTP request and response types shared by every client
//!
//! Requests are plain data so the pipeline can rebuild them for each retry
//! attempt. Responses are fully buffered except on the streaming path.

use std::sync::LazyLock;
use std::time::Duration;

use bytes::Bytes;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ClientError;
use crate::multipart::MultipartForm;

static UNRESOLVED_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[A-Za-z][A-Za-z0-9_-]*\}").expect("valid regex"));

/// Request body
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(Bytes),
    Multipart(MultipartForm),
}

/// An outgoing HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Body,
}

impl Request {
    pub fn new(method: Method, url: &str) -> Result<Self, ClientError> {
        let url = Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::Empty,
        })
    }

    pub fn get(url: &str) -> Result<Self, ClientError> {
        Self::new(Method::GET, url)
    }

    /// Set a query parameter, replacing any existing value for the same key.
    pub fn with_query(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.set_query(key, value.as_ref());
        self
    }

    /// Set a query parameter only when a value is present.
    pub fn with_optional_query<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with_query(key, v.to_string()),
            None => self,
        }
    }

    pub fn set_query(&mut self, key: &str, value: &str) {
        let retained: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(k, _)| k != key)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let mut pairs = self.url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &retained {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(key, value);
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Result<Self, ClientError> {
        let value = HeaderValue::from_str(value)
            .map_err(|e| ClientError::InvalidParameter(format!("header {name}: {e}")))?;
        self.headers.insert(HeaderName::from_static(name), value);
        Ok(self)
    }

    pub fn accept_json(mut self) -> Self {
        self.headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        self
    }

    pub fn with_json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        let bytes = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Body::Json(bytes.into());
        Ok(self)
    }

    pub fn with_multipart(mut self, form: MultipartForm) -> Self {
        self.headers.remove(CONTENT_TYPE);
        self.body = Body::Multipart(form);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }
}

/// A buffered HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    method: Method,
    url: Url,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes, method: Method, url: Url) -> Self {
        Self {
            status,
            headers,
            body,
            method,
            url,
        }
    }

    /// Read a streaming reqwest response to the end.
    pub async fn from_reqwest(resp: reqwest::Response, method: Method) -> Result<Self, ClientError> {
        let status = resp.status();
        let headers = resp.headers().clone();
        let url = resp.url().clone();
        let body = resp.bytes().await?;
        Ok(Self::new(status, headers, body, method, url))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn has_status(&self, codes: &[u16]) -> bool {
        codes.contains(&self.status.as_u16())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// URL of the request that produced this response
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Decode the body as JSON. An empty body decodes as `null`, so `()` and
    /// `Option<T>` work for operations that return nothing.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_slice(b"null")?);
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Server-requested delay before the next request.
    ///
    /// Checks `retry-after-ms`, `x-ms-retry-after-ms`, then `Retry-After`
    /// (delta seconds or an HTTP date).
    pub fn retry_after(&self) -> Option<Duration> {
        retry_after(&self.headers)
    }
}

pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    for name in ["retry-after-ms", "x-ms-retry-after-ms"] {
        if let Some(ms) = get(name).and_then(|v| v.trim().parse::<u64>().ok()) {
            return Some(Duration::from_millis(ms));
        }
    }

    let value = get("retry-after")?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = chrono::DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&chrono::Utc) - chrono::Utc::now();
    delta.to_std().ok()
}

/// Expand a URL path template such as
/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`.
///
/// Every value is percent-encoded. Empty values and placeholders left
/// unresolved are rejected.
pub fn expand_path(template: &str, params: &[(&str, &str)]) -> Result<String, ClientError> {
    let mut path = template.to_string();
    for (name, value) in params {
        if value.is_empty() {
            return Err(ClientError::InvalidParameter(format!(
                "parameter {name} cannot be empty"
            )));
        }
        path = path.replace(&format!("{{{name}}}"), &urlencoding::encode(value));
    }
    if let Some(m) = UNRESOLVED_PARAM.find(&path) {
        return Err(ClientError::InvalidParameter(format!(
            "unresolved path parameter {} in {template}",
            m.as_str()
        )));
    }
    Ok(path)
}

/// Join an endpoint and a path with exactly one `/` between them.
pub fn join_paths(endpoint: &str, path: &str) -> String {
    if path.is_empty() {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
