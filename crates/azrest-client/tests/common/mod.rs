//! Shared helpers for the mock-server tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use azrest_client::arm::ArmClientOptions;
use azrest_client::auth::{AccessToken, TokenCredential};
use azrest_client::error::ClientError;
use azrest_client::pipeline::{ClientOptions, RetryOptions};
use chrono::{TimeDelta, Utc};

pub const TOKEN: &str = "test-token";

/// Hands out the same token and counts how often it was asked.
#[derive(Default)]
pub struct StaticCredential {
    pub calls: AtomicUsize,
}

#[async_trait::async_trait]
impl TokenCredential for StaticCredential {
    async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken::new(TOKEN, Utc::now() + TimeDelta::hours(1)))
    }
}

pub fn credential() -> Arc<dyn TokenCredential> {
    Arc::new(StaticCredential::default())
}

/// Client options with millisecond retry delays.
pub fn fast_options() -> ClientOptions {
    ClientOptions {
        retry: RetryOptions {
            max_retries: 2,
            retry_delay: Duration::from_millis(1),
            max_retry_delay: Duration::from_millis(5),
            ..RetryOptions::default()
        },
        ..ClientOptions::default()
    }
}

pub fn arm_options(endpoint: &str) -> ArmClientOptions {
    ArmClientOptions {
        endpoint: Some(endpoint.to_string()),
        client: fast_options(),
        ..ArmClientOptions::default()
    }
}

pub const POLL: Duration = Duration::from_millis(1);
