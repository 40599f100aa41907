//! HTTP pipeline: authentication, telemetry headers, and retries
//!
//! Every client owns a [`Pipeline`]. Each attempt gets a fresh
//! `x-ms-client-request-id` and authorization header, so a retried request is
//! indistinguishable from a first attempt on the wire.

use std::sync::Arc;
use std::time::Duration;

use azrest_core::config::RetryConfig;
use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;
use backoff::backoff::Backoff;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue, USER_AGENT};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::{AccessToken, TokenCredential};
use crate::error::ClientError;
use crate::request::{Body, Request, Response, retry_after};

/// Header carrying the per-attempt client request ID
pub const HEADER_CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// Cached tokens are refreshed this many minutes before they expire
const TOKEN_REFRESH_MINUTES: i64 = 5;

/// Retry behaviour for transient failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOptions {
    /// Retries after the first attempt. Zero disables retries.
    pub max_retries: u32,
    /// Initial backoff delay
    pub retry_delay: Duration,
    /// Upper bound for a single backoff delay
    pub max_retry_delay: Duration,
    /// Status codes that are retried
    pub status_codes: Vec<u16>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(800),
            max_retry_delay: Duration::from_secs(60),
            status_codes: vec![408, 429, 500, 502, 503, 504],
        }
    }
}

impl From<&RetryConfig> for RetryOptions {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_retry_delay: Duration::from_millis(config.max_retry_delay_ms),
            ..Self::default()
        }
    }
}

impl RetryOptions {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_delay)
            .with_max_interval(self.max_retry_delay)
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Options shared by every client constructor
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub retry: RetryOptions,
    /// Per-attempt timeout. Leave unset for streaming operations.
    pub timeout: Option<Duration>,
    /// Prefix for the `User-Agent` header
    pub application_id: Option<String>,
}

/// Attaches a bearer token obtained from a [`TokenCredential`].
pub struct BearerTokenPolicy {
    credential: Arc<dyn TokenCredential>,
    scopes: Vec<String>,
    cache: Mutex<Option<AccessToken>>,
}

impl BearerTokenPolicy {
    pub fn new(credential: Arc<dyn TokenCredential>, scopes: &[&str]) -> Self {
        Self {
            credential,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            cache: Mutex::new(None),
        }
    }

    /// Return a cached token, or fetch a new one when the cached token is
    /// missing or within five minutes of expiry.
    pub async fn token(&self) -> Result<String, ClientError> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.as_ref() {
            if token.expires_on - Utc::now() > chrono::TimeDelta::minutes(TOKEN_REFRESH_MINUTES) {
                return Ok(token.token.clone());
            }
        }

        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        debug!(scopes = ?scopes, "acquiring access token");
        let token = self.credential.get_token(&scopes).await?;
        let value = token.token.clone();
        *cache = Some(token);
        Ok(value)
    }
}

/// Attaches a static key in a header.
#[derive(Clone)]
pub struct KeyCredentialPolicy {
    header: HeaderName,
    key: String,
    prefix: Option<String>,
}

impl KeyCredentialPolicy {
    pub fn new(header: &'static str, key: impl Into<String>) -> Self {
        Self {
            header: HeaderName::from_static(header),
            key: key.into(),
            prefix: None,
        }
    }

    /// `api-key: <key>`, as used by Azure OpenAI.
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::new("api-key", key)
    }

    /// `Authorization: Bearer <key>`, as used by api.openai.com.
    pub fn bearer(key: impl Into<String>) -> Self {
        Self {
            header: AUTHORIZATION,
            key: key.into(),
            prefix: Some("Bearer".into()),
        }
    }

    fn header_value(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix} {}", self.key),
            None => self.key.clone(),
        }
    }
}

impl std::fmt::Debug for KeyCredentialPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyCredentialPolicy")
            .field("header", &self.header)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// How requests are authorized
pub enum AuthPolicy {
    None,
    Bearer(BearerTokenPolicy),
    Key(KeyCredentialPolicy),
}

impl AuthPolicy {
    async fn header(&self) -> Result<Option<(HeaderName, HeaderValue)>, ClientError> {
        let (name, value) = match self {
            Self::None => return Ok(None),
            Self::Bearer(policy) => (AUTHORIZATION, format!("Bearer {}", policy.token().await?)),
            Self::Key(policy) => (policy.header.clone(), policy.header_value()),
        };
        let mut value = HeaderValue::from_str(&value)
            .map_err(|e| ClientError::auth(format!("invalid credential: {e}")))?;
        value.set_sensitive(true);
        Ok(Some((name, value)))
    }
}

/// Sends requests with authentication, telemetry, and retries applied.
#[derive(Clone)]
pub struct Pipeline {
    http: reqwest::Client,
    auth: Arc<AuthPolicy>,
    options: Arc<ClientOptions>,
    user_agent: String,
}

impl Pipeline {
    pub fn new(auth: AuthPolicy, options: ClientOptions) -> Self {
        let user_agent = user_agent(options.application_id.as_deref());
        Self {
            http: reqwest::Client::new(),
            auth: Arc::new(auth),
            options: Arc::new(options),
            user_agent,
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Send a request and buffer the whole response body.
    ///
    /// Non-success statuses are returned as responses; callers decide which
    /// codes are errors.
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let resp = self.send_raw(request).await?;
        Response::from_reqwest(resp, request.method().clone()).await
    }

    /// Send a request and return the unread response, for streaming bodies.
    pub async fn send_raw(&self, request: &Request) -> Result<reqwest::Response, ClientError> {
        let retry = &self.options.retry;
        let mut backoff = retry.backoff();
        let mut attempt: u32 = 0;

        loop {
            let delay = match self.attempt(request).await {
                Ok(resp) => {
                    let status = resp.status();
                    if !is_retriable(status, &retry.status_codes) || attempt >= retry.max_retries {
                        debug!(
                            method = %request.method(),
                            url = %request.url(),
                            status = status.as_u16(),
                            "response received"
                        );
                        return Ok(resp);
                    }
                    let delay = match retry_after(resp.headers()) {
                        Some(delay) if delay > retry.max_retry_delay => {
                            debug!(
                                status = status.as_u16(),
                                retry_after_ms = delay.as_millis() as u64,
                                "server delay exceeds max_retry_delay, not retrying"
                            );
                            return Ok(resp);
                        }
                        Some(delay) => delay,
                        None => next_delay(&mut backoff, retry.max_retry_delay),
                    };
                    warn!(
                        status = status.as_u16(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying request after retriable status"
                    );
                    delay
                }
                Err(e) if is_transient(&e) && attempt < retry.max_retries => {
                    let delay = next_delay(&mut backoff, retry.max_retry_delay);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "retrying request after transport error"
                    );
                    delay
                }
                Err(e) => return Err(e),
            };

            attempt += 1;
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, request: &Request) -> Result<reqwest::Response, ClientError> {
        let mut builder = self
            .http
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone())
            .header(USER_AGENT, &self.user_agent)
            .header(HEADER_CLIENT_REQUEST_ID, uuid::Uuid::new_v4().to_string());

        if let Some(timeout) = self.options.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match request.body() {
            Body::Empty => builder,
            Body::Json(bytes) => builder.body(bytes.clone()),
            Body::Multipart(form) => builder.multipart(form.to_reqwest()?),
        };

        if let Some((name, value)) = self.auth.header().await? {
            builder = builder.header(name, value);
        }

        Ok(builder.send().await?)
    }
}

fn user_agent(application_id: Option<&str>) -> String {
    let base = format!(
        "azsdk-rust-azrest/{} (rust; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    );
    match application_id {
        Some(app) if !app.is_empty() => format!("{app} {base}"),
        _ => base,
    }
}

fn is_retriable(status: StatusCode, codes: &[u16]) -> bool {
    codes.contains(&status.as_u16())
}

fn is_transient(err: &ClientError) -> bool {
    match err {
        ClientError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        _ => false,
    }
}

fn next_delay(backoff: &mut ExponentialBackoff, max: Duration) -> Duration {
    backoff.next_backoff().unwrap_or(max).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCredential {
        calls: AtomicUsize,
        lifetime: chrono::TimeDelta,
    }

    #[async_trait::async_trait]
    impl TokenCredential for CountingCredential {
        async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken, ClientError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken::new(
                format!("token-{n}"),
                Utc::now() + self.lifetime,
            ))
        }
    }

    #[test]
    fn test_user_agent() {
        let ua = user_agent(None);
        assert!(ua.starts_with("azsdk-rust-azrest/"));
        assert!(ua.contains("(rust; "));
        assert!(user_agent(Some("myapp")).starts_with("myapp azsdk-rust-azrest/"));
        assert_eq!(user_agent(Some("")), ua);
    }

    #[test]
    fn test_retry_options_from_config() {
        let config = RetryConfig {
            max_retries: 5,
            retry_delay_ms: 100,
            max_retry_delay_ms: 2000,
        };
        let opts = RetryOptions::from(&config);
        assert_eq!(opts.max_retries, 5);
        assert_eq!(opts.retry_delay, Duration::from_millis(100));
        assert_eq!(opts.max_retry_delay, Duration::from_secs(2));
        assert!(opts.status_codes.contains(&429));
    }

    #[test]
    fn test_next_delay_is_capped() {
        let opts = RetryOptions {
            retry_delay: Duration::from_secs(10),
            max_retry_delay: Duration::from_secs(15),
            ..RetryOptions::default()
        };
        let mut backoff = opts.backoff();
        for _ in 0..5 {
            assert!(next_delay(&mut backoff, opts.max_retry_delay) <= Duration::from_secs(15));
        }
    }

    #[test]
    fn test_is_retriable() {
        let codes = RetryOptions::default().status_codes;
        assert!(is_retriable(StatusCode::TOO_MANY_REQUESTS, &codes));
        assert!(is_retriable(StatusCode::SERVICE_UNAVAILABLE, &codes));
        assert!(!is_retriable(StatusCode::NOT_FOUND, &codes));
        assert!(!is_retriable(StatusCode::NOT_IMPLEMENTED, &codes));
    }

    #[test]
    fn test_key_policy_header_values() {
        assert_eq!(KeyCredentialPolicy::api_key("k1").header_value(), "k1");
        let bearer = KeyCredentialPolicy::bearer("sk-1");
        assert_eq!(bearer.header, AUTHORIZATION);
        assert_eq!(bearer.header_value(), "Bearer sk-1");
        assert!(!format!("{bearer:?}").contains("sk-1"));
    }

    #[tokio::test]
    async fn test_bearer_policy_caches_token() {
        let credential = Arc::new(CountingCredential {
            calls: AtomicUsize::new(0),
            lifetime: chrono::TimeDelta::hours(1),
        });
        let policy = BearerTokenPolicy::new(credential.clone(), &["https://x/.default"]);
        assert_eq!(policy.token().await.unwrap(), "token-0");
        assert_eq!(policy.token().await.unwrap(), "token-0");
        assert_eq!(credential.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bearer_policy_refreshes_near_expiry() {
        let credential = Arc::new(CountingCredential {
            calls: AtomicUsize::new(0),
            lifetime: chrono::TimeDelta::minutes(2),
        });
        let policy = BearerTokenPolicy::new(credential.clone(), &["https://x/.default"]);
        assert_eq!(policy.token().await.unwrap(), "token-0");
        assert_eq!(policy.token().await.unwrap(), "token-1");
        assert_eq!(credential.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_auth_policy_none_adds_no_header() {
        assert!(AuthPolicy::None.header().await.unwrap().is_none());
        let (name, value) = AuthPolicy::Key(KeyCredentialPolicy::api_key("abc"))
            .header()
            .await
            .unwrap()
            .unwrap();
        assert_eq!(name.as_str(), "api-key");
        assert!(value.is_sensitive());
    }
}
