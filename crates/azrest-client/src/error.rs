//! Error types for azrest-client

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::openai::content_filter::ContentFilterError;
use crate::request::Response;

/// Header carrying the service error code on ARM and data plane responses
pub const HEADER_ERROR_CODE: &str = "x-ms-error-code";

const RULE: &str = "--------------------------------------------------------------------------------";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("Azure CLI error: {message}\n\nHint: {hint}")]
    AzCli { message: String, hint: String },

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    Response(Box<ResponseError>),

    #[error("{0}")]
    ContentFilter(Box<ContentFilterError>),

    #[error("failed to decode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidParameter(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("long-running operation: {0}")]
    Poller(String),

    #[error("event stream: {0}")]
    Stream(String),

    #[error("no more pages")]
    NoMorePages,

    #[error("{0}")]
    Other(String),
}

impl ClientError {
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth {
            message: msg.into(),
        }
    }

    pub fn az_cli(msg: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::AzCli {
            message: msg.into(),
            hint: hint.into(),
        }
    }

    pub fn poller(msg: impl Into<String>) -> Self {
        Self::Poller(msg.into())
    }

    /// HTTP status code of the failed response, if this error came from one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response(e) => Some(e.status),
            Self::ContentFilter(e) => Some(e.response.status),
            _ => None,
        }
    }

    /// The underlying response error, if any.
    pub fn response_error(&self) -> Option<&ResponseError> {
        match self {
            Self::Response(e) => Some(e),
            Self::ContentFilter(e) => Some(&e.response),
            _ => None,
        }
    }
}

impl From<ResponseError> for ClientError {
    fn from(e: ResponseError) -> Self {
        Self::Response(Box::new(e))
    }
}

/// A non-success HTTP response from an Azure service.
#[derive(Debug, Clone)]
pub struct ResponseError {
    /// HTTP status code
    pub status: u16,
    /// Status line text, e.g. `500 Internal Server Error`
    pub reason: String,
    /// Service-defined error code, if one could be found
    pub error_code: Option<String>,
    pub method: String,
    /// Request URL without the query string
    pub url: String,
    /// Raw response body
    pub body: String,
}

impl ResponseError {
    /// Build a response error from a buffered response.
    ///
    /// The error code is taken from the `x-ms-error-code` header when present,
    /// then from `error.code` in the body, then from a top-level `code`.
    pub fn from_response(resp: &Response) -> Self {
        let body = String::from_utf8_lossy(resp.body()).into_owned();
        let error_code = resp
            .header(HEADER_ERROR_CODE)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .or_else(|| error_code_from_body(&body));

        let mut url = resp.url().clone();
        url.set_query(None);

        Self {
            status: resp.status().as_u16(),
            reason: resp.status().to_string(),
            error_code,
            method: resp.method().to_string(),
            url: url.to_string(),
            body,
        }
    }

    /// Parse the body as JSON, if it is JSON.
    pub fn body_json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// Human-readable message from `error.message`, falling back to the raw body.
    pub fn message(&self) -> String {
        self.body_json()
            .and_then(|json| {
                json.get("error")
                    .and_then(|e| e.get("message"))
                    .or_else(|| json.get("message"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or_else(|| self.body.clone())
    }
}

fn error_code_from_body(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.get("error")
        .and_then(|e| e.get("code"))
        .or_else(|| json.get("code"))
        .and_then(|c| c.as_str())
        .map(String::from)
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.method, self.url)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "RESPONSE {}: {}", self.status, self.reason)?;
        match &self.error_code {
            Some(code) => writeln!(f, "ERROR CODE: {code}")?,
            None => writeln!(f, "ERROR CODE UNAVAILABLE")?,
        }
        writeln!(f, "{RULE}")?;
        if self.body.is_empty() {
            writeln!(f, "Response contained no body")?;
        } else {
            match self
                .body_json()
                .and_then(|v| serde_json::to_string_pretty(&v).ok())
            {
                Some(pretty) => writeln!(f, "{pretty}")?,
                None => writeln!(f, "{}", self.body)?,
            }
        }
        writeln!(f, "{RULE}")
    }
}

impl std::error::Error for ResponseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};
    use reqwest::{Method, StatusCode};

    fn response(status: u16, headers: HeaderMap, body: &str) -> Response {
        Response::new(
            StatusCode::from_u16(status).unwrap(),
            headers,
            body.as_bytes().to_vec().into(),
            Method::GET,
            "https://fakeurl.com/the/path?qp=removed".parse().unwrap(),
        )
    }

    #[test]
    fn test_no_body_no_error_code() {
        let err = ResponseError::from_response(&response(500, HeaderMap::new(), ""));
        assert!(err.error_code.is_none());
        assert_eq!(err.status, 500);
        let want = format!(
            "GET https://fakeurl.com/the/path\n{RULE}\nRESPONSE 500: 500 Internal Server Error\nERROR CODE UNAVAILABLE\n{RULE}\nResponse contained no body\n{RULE}\n"
        );
        assert_eq!(err.to_string(), want);
    }

    #[test]
    fn test_error_code_from_header() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_ERROR_CODE, HeaderValue::from_static("ErrorTooManyCheats"));
        let err = ResponseError::from_response(&response(500, headers, ""));
        assert_eq!(err.error_code.as_deref(), Some("ErrorTooManyCheats"));
        assert!(err.to_string().contains("ERROR CODE: ErrorTooManyCheats"));
    }

    #[test]
    fn test_error_code_from_top_level_body() {
        let body = r#"{ "code": "ErrorItsBroken", "message": "it's not working" }"#;
        let err = ResponseError::from_response(&response(500, HeaderMap::new(), body));
        assert_eq!(err.error_code.as_deref(), Some("ErrorItsBroken"));
        let want = format!(
            "GET https://fakeurl.com/the/path\n{RULE}\nRESPONSE 500: 500 Internal Server Error\nERROR CODE: ErrorItsBroken\n{RULE}\n{{\n  \"code\": \"ErrorItsBroken\",\n  \"message\": \"it's not working\"\n}}\n{RULE}\n"
        );
        assert_eq!(err.to_string(), want);
    }

    #[test]
    fn test_header_wins_over_body() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_ERROR_CODE, HeaderValue::from_static("ErrorTooManyCheats"));
        let body = r#"{ "code": "ErrorItsBroken", "message": "it's not working" }"#;
        let err = ResponseError::from_response(&response(500, headers, body));
        assert_eq!(err.error_code.as_deref(), Some("ErrorTooManyCheats"));
    }

    #[test]
    fn test_error_code_from_wrapped_body() {
        let body = r#"{ "error": { "code": "ErrorItsBroken", "message": "it's not working" } }"#;
        let err = ResponseError::from_response(&response(400, HeaderMap::new(), body));
        assert_eq!(err.error_code.as_deref(), Some("ErrorItsBroken"));
        assert_eq!(err.message(), "it's not working");
    }

    #[test]
    fn test_non_json_body_printed_raw() {
        let err = ResponseError::from_response(&response(502, HeaderMap::new(), "bad gateway"));
        assert!(err.error_code.is_none());
        assert!(err.to_string().contains("\nbad gateway\n"));
        assert_eq!(err.message(), "bad gateway");
    }

    #[test]
    fn test_client_error_status() {
        let err: ClientError =
            ResponseError::from_response(&response(404, HeaderMap::new(), "")).into();
        assert_eq!(err.status(), Some(404));
        assert!(ClientError::NoMorePages.status().is_none());
    }
}
