//! Token credentials and Azure CLI integration
//!
//! [`TokenCredential`] is the seam every bearer-authenticated client goes
//! through. [`AzureCliCredential`] shells out to `az account get-access-token`;
//! [`AzCli`] wraps the rest of the `az` commands the binary needs.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::ClientError;

const INSTALL_HINT: &str = "Install the Azure CLI: https://aka.ms/install-azure-cli";

/// A bearer token and its expiry
#[derive(Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of Entra ID access tokens
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, ClientError>;
}

/// Strip the `/.default` suffix from a scope to get the resource URI.
pub fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

/// Status of the current Azure CLI authentication session
#[derive(Debug, Clone, Default)]
pub struct AuthStatus {
    pub logged_in: bool,
    pub user: Option<String>,
    pub subscription_name: Option<String>,
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzAccountInfo {
    user: AzUser,
    name: String,
    id: String,
    tenant_id: String,
}

#[derive(Debug, Deserialize)]
struct AzUser {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzToken {
    access_token: String,
    /// Local time, e.g. `2024-01-01 10:00:00.000000`
    expires_on: Option<String>,
    /// Unix seconds, emitted by newer CLI versions
    #[serde(rename = "expires_on")]
    expires_on_unix: Option<i64>,
}

/// Credential that asks the Azure CLI for tokens.
#[derive(Debug, Clone, Default)]
pub struct AzureCliCredential {
    tenant_id: Option<String>,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request tokens for a specific tenant.
    pub fn with_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
        }
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, ClientError> {
        let [scope] = scopes else {
            return Err(ClientError::auth(format!(
                "Azure CLI credential takes exactly one scope, got {}",
                scopes.len()
            )));
        };
        let resource = scope_to_resource(scope);
        debug!(resource, "requesting token from Azure CLI");

        let mut args = vec![
            "account",
            "get-access-token",
            "--resource",
            resource,
            "--output",
            "json",
        ];
        if let Some(tenant) = &self.tenant_id {
            args.extend(["--tenant", tenant.as_str()]);
        }

        let output = Command::new("az")
            .args(&args)
            .output()
            .await
            .map_err(|e| ClientError::az_cli(format!("failed to run `az` command: {e}"), INSTALL_HINT))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClientError::az_cli(
                format!("failed to get access token: {}", stderr.trim()),
                "Try running `az login` to refresh your credentials",
            ));
        }

        parse_cli_token(&output.stdout)
    }
}

fn parse_cli_token(stdout: &[u8]) -> Result<AccessToken, ClientError> {
    let token: AzToken =
        serde_json::from_slice(stdout).map_err(|e| ClientError::auth(e.to_string()))?;
    if token.access_token.is_empty() {
        return Err(ClientError::auth("received empty access token"));
    }

    let expires_on = match (token.expires_on_unix, token.expires_on.as_deref()) {
        (Some(secs), _) => Utc
            .timestamp_opt(secs, 0)
            .single()
            .ok_or_else(|| ClientError::auth(format!("invalid token expiry {secs}")))?,
        (None, Some(local)) => NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| ClientError::auth(format!("invalid token expiry '{local}'")))?,
        (None, None) => return Err(ClientError::auth("Azure CLI token has no expiry")),
    };

    Ok(AccessToken::new(token.access_token, expires_on))
}

/// Azure CLI session management.
pub struct AzCli;

impl AzCli {
    /// Check the current Azure CLI login status.
    pub async fn check_status() -> Result<AuthStatus, ClientError> {
        let output = Command::new("az")
            .args(["account", "show", "--output", "json"])
            .output()
            .await
            .map_err(|e| ClientError::az_cli(format!("failed to run `az` command: {e}"), INSTALL_HINT))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("az login") || stderr.contains("not logged in") {
                return Ok(AuthStatus::default());
            }
            return Err(ClientError::az_cli(
                stderr.trim().to_string(),
                "Try running `az login` first",
            ));
        }

        let info: AzAccountInfo =
            serde_json::from_slice(&output.stdout).map_err(|e| ClientError::auth(e.to_string()))?;

        Ok(AuthStatus {
            logged_in: true,
            user: Some(info.user.name),
            subscription_name: Some(info.name),
            subscription_id: Some(info.id),
            tenant_id: Some(info.tenant_id),
        })
    }

    /// Run `az login` interactively.
    pub async fn login() -> Result<(), ClientError> {
        Self::run(&["login"]).await
    }

    /// Run `az logout`.
    pub async fn logout() -> Result<(), ClientError> {
        Self::run(&["logout"]).await
    }

    async fn run(args: &[&str]) -> Result<(), ClientError> {
        let command = format!("az {}", args.join(" "));
        let status = Command::new("az")
            .args(args)
            .status()
            .await
            .map_err(|e| ClientError::az_cli(format!("failed to run `{command}`: {e}"), INSTALL_HINT))?;

        if !status.success() {
            return Err(ClientError::auth(format!("{command} failed")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_to_resource() {
        assert_eq!(
            scope_to_resource("https://management.azure.com/.default"),
            "https://management.azure.com"
        );
        assert_eq!(scope_to_resource("https://vault.azure.net"), "https://vault.azure.net");
    }

    #[test]
    fn test_parse_cli_token_unix_expiry() {
        let json = br#"{"accessToken":"abc","expiresOn":"2030-01-01 00:00:00.000000","expires_on":1893456000,"tokenType":"Bearer"}"#;
        let token = parse_cli_token(json).unwrap();
        assert_eq!(token.token, "abc");
        assert_eq!(token.expires_on.timestamp(), 1893456000);
    }

    #[test]
    fn test_parse_cli_token_local_expiry() {
        let json = br#"{"accessToken":"abc","expiresOn":"2030-01-01 12:30:00.123456"}"#;
        let token = parse_cli_token(json).unwrap();
        let local = token.expires_on.with_timezone(&Local);
        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2030-01-01 12:30");
    }

    #[test]
    fn test_parse_cli_token_errors() {
        assert!(parse_cli_token(b"not json").is_err());
        assert!(parse_cli_token(br#"{"accessToken":""}"#).is_err());
        assert!(parse_cli_token(br#"{"accessToken":"abc"}"#).is_err());
        assert!(parse_cli_token(br#"{"accessToken":"abc","expiresOn":"tomorrow"}"#).is_err());
    }

    #[test]
    fn test_access_token_debug_redacts() {
        let token = AccessToken::new("secret-token", Utc::now());
        assert!(!format!("{token:?}").contains("secret-token"));
    }

    #[tokio::test]
    async fn test_cli_credential_rejects_multiple_scopes() {
        let err = AzureCliCredential::new()
            .get_token(&["https://a/.default", "https://b/.default"])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("exactly one scope"));
    }
}
