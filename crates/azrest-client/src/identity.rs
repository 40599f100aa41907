//! Entra ID credentials beyond the Azure CLI
//!
//! Service principals authenticate with the OAuth2 client-credentials grant.
//! Managed identities use the instance metadata service (IMDS). The default
//! chain tries environment, managed identity, then the Azure CLI.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use azrest_core::cloud::Cloud;
use chrono::{TimeDelta, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::{AccessToken, AzureCliCredential, TokenCredential, scope_to_resource};
use crate::error::ClientError;

pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_API_VERSION: &str = "2018-02-01";
const IMDS_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<Value>,
    expires_on: Option<Value>,
}

impl TokenResponse {
    fn into_access_token(self) -> Result<AccessToken, ClientError> {
        let as_i64 = |v: &Value| v.as_i64().or_else(|| v.as_str()?.parse().ok());

        let expires_on = if let Some(secs) = self.expires_on.as_ref().and_then(as_i64) {
            chrono::DateTime::from_timestamp(secs, 0)
        } else if let Some(secs) = self.expires_in.as_ref().and_then(as_i64) {
            Some(Utc::now() + TimeDelta::seconds(secs))
        } else {
            None
        };

        let expires_on =
            expires_on.ok_or_else(|| ClientError::auth("token response has no valid expiry"))?;
        Ok(AccessToken::new(self.access_token, expires_on))
    }
}

async fn read_token_response(resp: reqwest::Response, source: &str) -> Result<AccessToken, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::auth(format!(
            "{source} returned {}: {body}",
            status.as_u16()
        )));
    }
    let token: TokenResponse = resp.json().await?;
    token.into_access_token()
}

fn valid_tenant_id(tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// Service principal with a client secret.
#[derive(Clone)]
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

impl ClientSecretCredential {
    pub fn new(
        cloud: Cloud,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let tenant_id = tenant_id.into();
        if !valid_tenant_id(&tenant_id) {
            return Err(ClientError::InvalidParameter(format!(
                "invalid tenant ID '{tenant_id}'"
            )));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            authority_host: cloud.authority_host().to_string(),
            tenant_id,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }

    /// Use a different authority, e.g. a private cloud or a test server.
    pub fn with_authority_host(mut self, authority_host: impl Into<String>) -> Self {
        self.authority_host = authority_host.into();
        self
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, ClientError> {
        debug!(tenant_id = %self.tenant_id, client_id = %self.client_id, "requesting client credentials token");
        let scope = scopes.join(" ");
        let resp = self
            .http
            .post(self.token_url())
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", scope.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;
        read_token_response(resp, "token endpoint").await
    }
}

/// Service principal configured through `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`,
/// and `AZURE_CLIENT_SECRET`.
#[derive(Clone)]
pub struct EnvironmentCredential {
    inner: ClientSecretCredential,
}

impl EnvironmentCredential {
    pub fn new(cloud: Cloud) -> Result<Self, ClientError> {
        Self::from_lookup(cloud, |name| std::env::var(name).ok())
    }

    fn from_lookup(
        cloud: Cloud,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ClientError> {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let (Some(tenant), Some(client), Some(secret)) = (
            get(ENV_TENANT_ID),
            get(ENV_CLIENT_ID),
            get(ENV_CLIENT_SECRET),
        ) else {
            return Err(ClientError::auth(format!(
                "environment credential requires {ENV_TENANT_ID}, {ENV_CLIENT_ID} and {ENV_CLIENT_SECRET}"
            )));
        };

        let mut inner = ClientSecretCredential::new(cloud, tenant, client, secret)?;
        if let Some(host) = get(ENV_AUTHORITY_HOST) {
            inner = inner.with_authority_host(host);
        }
        Ok(Self { inner })
    }
}

#[async_trait]
impl TokenCredential for EnvironmentCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, ClientError> {
        self.inner.get_token(scopes).await
    }
}

/// Managed identity via the instance metadata service.
#[derive(Clone)]
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    endpoint: String,
    client_id: Option<String>,
}

impl Default for ManagedIdentityCredential {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ManagedIdentityCredential {
    /// System-assigned identity, or a user-assigned one when `client_id` is set.
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: IMDS_ENDPOINT.to_string(),
            client_id,
        }
    }

    /// Override the IMDS token endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, ClientError> {
        let [scope] = scopes else {
            return Err(ClientError::auth(format!(
                "managed identity takes exactly one scope, got {}",
                scopes.len()
            )));
        };
        let resource = scope_to_resource(scope);
        debug!(resource, "requesting managed identity token");

        let mut query = vec![("api-version", IMDS_API_VERSION), ("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let resp = self
            .http
            .get(&self.endpoint)
            .query(&query)
            .header("Metadata", "true")
            .timeout(IMDS_TIMEOUT)
            .send()
            .await
            .map_err(|e| ClientError::auth(format!("managed identity endpoint unavailable: {e}")))?;
        read_token_response(resp, "managed identity endpoint").await
    }
}

/// Tries each credential in order and returns the first token.
pub struct ChainedTokenCredential {
    sources: Vec<(&'static str, Arc<dyn TokenCredential>)>,
}

impl ChainedTokenCredential {
    pub fn new(sources: Vec<(&'static str, Arc<dyn TokenCredential>)>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl TokenCredential for ChainedTokenCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, ClientError> {
        let mut failures = Vec::with_capacity(self.sources.len());
        for (name, credential) in &self.sources {
            match credential.get_token(scopes).await {
                Ok(token) => {
                    debug!(credential = name, "credential produced a token");
                    return Ok(token);
                }
                Err(e) => {
                    debug!(credential = name, error = %e, "credential failed");
                    failures.push(format!("{name}: {e}"));
                }
            }
        }
        Err(ClientError::auth(format!(
            "no credential produced a token:\n  - {}",
            failures.join("\n  - ")
        )))
    }
}

/// Environment, then managed identity, then Azure CLI.
pub struct DefaultAzureCredential {
    chain: ChainedTokenCredential,
}

impl DefaultAzureCredential {
    pub fn new(cloud: Cloud) -> Self {
        let mut sources: Vec<(&'static str, Arc<dyn TokenCredential>)> = Vec::new();
        match EnvironmentCredential::new(cloud) {
            Ok(env) => sources.push(("EnvironmentCredential", Arc::new(env))),
            Err(e) => sources.push(("EnvironmentCredential", Arc::new(Unavailable(e.to_string())))),
        }
        let client_id = std::env::var(ENV_CLIENT_ID).ok().filter(|v| !v.is_empty());
        sources.push((
            "ManagedIdentityCredential",
            Arc::new(ManagedIdentityCredential::new(client_id)),
        ));
        sources.push(("AzureCliCredential", Arc::new(AzureCliCredential::new())));
        Self {
            chain: ChainedTokenCredential::new(sources),
        }
    }
}

#[async_trait]
impl TokenCredential for DefaultAzureCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, ClientError> {
        self.chain.get_token(scopes).await
    }
}

/// Chain member that was misconfigured at construction time.
struct Unavailable(String);

#[async_trait]
impl TokenCredential for Unavailable {
    async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken, ClientError> {
        Err(ClientError::auth(self.0.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Fixed(Result<&'static str, &'static str>);

    fn fixed(result: Result<&'static str, &'static str>) -> Arc<dyn TokenCredential> {
        Arc::new(Fixed(result))
    }

    #[async_trait]
    impl TokenCredential for Fixed {
        async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken, ClientError> {
            match self.0 {
                Ok(t) => Ok(AccessToken::new(t, Utc::now() + TimeDelta::hours(1))),
                Err(e) => Err(ClientError::auth(e)),
            }
        }
    }

    #[test]
    fn test_token_response_expiry_formats() {
        let from_on: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_on":"1893456000"}"#).unwrap();
        assert_eq!(from_on.into_access_token().unwrap().expires_on.timestamp(), 1893456000);

        let from_in: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","expires_in":3599}"#).unwrap();
        let token = from_in.into_access_token().unwrap();
        assert!(token.expires_on > Utc::now() + TimeDelta::minutes(59));

        let none: TokenResponse = serde_json::from_str(r#"{"access_token":"a"}"#).unwrap();
        assert!(none.into_access_token().is_err());
    }

    #[test]
    fn test_valid_tenant_id() {
        assert!(valid_tenant_id("72f988bf-86f1-41af-91ab-2d7cd011db47"));
        assert!(valid_tenant_id("contoso.onmicrosoft.com"));
        assert!(!valid_tenant_id(""));
        assert!(!valid_tenant_id("../evil"));
    }

    #[test]
    fn test_client_secret_token_url() {
        let cred = ClientSecretCredential::new(Cloud::AzurePublic, "tenant", "client", "secret")
            .unwrap();
        assert_eq!(
            cred.token_url(),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
        let cred = cred.with_authority_host("http://localhost:9999/");
        assert_eq!(cred.token_url(), "http://localhost:9999/tenant/oauth2/v2.0/token");
    }

    #[test]
    fn test_environment_credential_requires_all_vars() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(ENV_TENANT_ID, "t"), (ENV_CLIENT_ID, "c")]);
        let result = EnvironmentCredential::from_lookup(Cloud::AzurePublic, |k| {
            vars.get(k).map(|v| v.to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_environment_credential_authority_override() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_TENANT_ID, "t"),
            (ENV_CLIENT_ID, "c"),
            (ENV_CLIENT_SECRET, "s"),
            (ENV_AUTHORITY_HOST, "https://login.example.com"),
        ]);
        let cred = EnvironmentCredential::from_lookup(Cloud::AzurePublic, |k| {
            vars.get(k).map(|v| v.to_string())
        })
        .unwrap();
        assert_eq!(
            cred.inner.token_url(),
            "https://login.example.com/t/oauth2/v2.0/token"
        );
    }

    #[tokio::test]
    async fn test_chain_returns_first_success() {
        let chain = ChainedTokenCredential::new(vec![
            ("first", fixed(Err("nope"))),
            ("second", fixed(Ok("tok"))),
            ("third", fixed(Ok("unused"))),
        ]);
        let token = chain.get_token(&["s/.default"]).await.unwrap();
        assert_eq!(token.token, "tok");
    }

    #[tokio::test]
    async fn test_chain_aggregates_failures() {
        let chain = ChainedTokenCredential::new(vec![
            ("first", fixed(Err("no env"))),
            ("second", fixed(Err("no imds"))),
        ]);
        let msg = chain.get_token(&["s/.default"]).await.unwrap_err().to_string();
        assert!(msg.contains("first: authentication failed: no env"));
        assert!(msg.contains("second: authentication failed: no imds"));
    }
}
