//! Key Vault secrets

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ItemId, VaultConnection, VaultPoller};
use crate::auth::TokenCredential;
use crate::error::ClientError;
use crate::pager::{ArmList, Pager};
use crate::pipeline::ClientOptions;
use crate::request::expand_path;

/// Secret attributes. Timestamps travel as Unix seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(
        rename = "nbf",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(
        rename = "exp",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expires: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recoverable_days: Option<i32>,
}

/// A secret with its value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SecretAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    /// Set when the secret backs a certificate's key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
}

/// A soft-deleted secret
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedSecretBundle {
    #[serde(flatten)]
    pub secret: SecretBundle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_id: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_purge_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_date: Option<DateTime<Utc>>,
}

/// A secret in a list, without its value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SecretAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedSecretItem {
    #[serde(flatten)]
    pub item: SecretItem,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_id: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_purge_date: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSecretParameters {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "attributes", default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SecretAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSecretParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<SecretAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

/// An opaque secret backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSecretResult {
    pub value: String,
}

/// A parsed secret identifier `https://{vault}/secrets/{name}[/{version}]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretId {
    pub vault_url: String,
    pub name: String,
    pub version: Option<String>,
}

impl SecretId {
    pub fn parse(id: &str) -> Result<Self, ClientError> {
        let ItemId {
            vault_url,
            name,
            version,
        } = ItemId::parse(id, "secrets")?;
        Ok(Self {
            vault_url,
            name,
            version,
        })
    }
}

/// Reads and writes secrets in one vault.
#[derive(Clone)]
pub struct SecretClient {
    conn: VaultConnection,
}

impl SecretClient {
    pub fn new(
        vault_url: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            conn: VaultConnection::new(vault_url.into(), credential, options)?,
        })
    }

    pub fn vault_url(&self) -> &str {
        self.conn.vault_url()
    }

    fn secret_path(name: &str, version: Option<&str>) -> Result<String, ClientError> {
        match version.filter(|v| !v.is_empty()) {
            Some(version) => expand_path(
                "/secrets/{secret-name}/{secret-version}",
                &[("secret-name", name), ("secret-version", version)],
            ),
            None => expand_path("/secrets/{secret-name}", &[("secret-name", name)]),
        }
    }

    fn deleted_path(name: &str) -> Result<String, ClientError> {
        expand_path("/deletedsecrets/{secret-name}", &[("secret-name", name)])
    }

    /// Create a secret, or add a new version to an existing one.
    pub async fn set_secret(
        &self,
        name: &str,
        parameters: &SetSecretParameters,
    ) -> Result<SecretBundle, ClientError> {
        debug!(secret = name, "setting secret");
        let req = self
            .conn
            .request(Method::PUT, &Self::secret_path(name, None)?)?
            .with_json(parameters)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Get a secret. Without a version the latest one is returned.
    pub async fn get_secret(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<SecretBundle, ClientError> {
        let req = self.conn.request(Method::GET, &Self::secret_path(name, version)?)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Change the attributes of a secret version. The value cannot be changed.
    pub async fn update_secret_properties(
        &self,
        name: &str,
        version: Option<&str>,
        parameters: &UpdateSecretParameters,
    ) -> Result<SecretBundle, ClientError> {
        let req = self
            .conn
            .request(Method::PATCH, &Self::secret_path(name, version)?)?
            .with_json(parameters)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Delete every version of a secret.
    pub async fn begin_delete_secret(&self, name: &str) -> Result<DeleteSecretPoller, ClientError> {
        debug!(secret = name, "deleting secret");
        let req = self.conn.request(Method::DELETE, &Self::secret_path(name, None)?)?;
        let deleted: DeletedSecretBundle = self.conn.send(&req, &[200]).await?.json()?;
        self.conn.start_poller(&Self::deleted_path(name)?, deleted).await
    }

    pub async fn get_deleted_secret(&self, name: &str) -> Result<DeletedSecretBundle, ClientError> {
        let req = self.conn.request(Method::GET, &Self::deleted_path(name)?)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Permanently remove a deleted secret.
    pub async fn purge_deleted_secret(&self, name: &str) -> Result<(), ClientError> {
        debug!(secret = name, "purging deleted secret");
        let req = self.conn.request(Method::DELETE, &Self::deleted_path(name)?)?;
        self.conn.send(&req, &[204]).await?;
        Ok(())
    }

    /// Recover a deleted secret to its latest version.
    pub async fn begin_recover_deleted_secret(
        &self,
        name: &str,
    ) -> Result<RecoverSecretPoller, ClientError> {
        debug!(secret = name, "recovering deleted secret");
        let req = self.conn.request(
            Method::POST,
            &format!("{}/recover", Self::deleted_path(name)?),
        )?;
        let recovered: SecretBundle = self.conn.send(&req, &[200]).await?.json()?;
        self.conn
            .start_poller(&Self::secret_path(name, None)?, recovered)
            .await
    }

    pub async fn backup_secret(&self, name: &str) -> Result<BackupSecretResult, ClientError> {
        let req = self.conn.request(
            Method::POST,
            &format!("{}/backup", Self::secret_path(name, None)?),
        )?;
        self.conn.send(&req, &[200]).await?.json()
    }

    pub async fn restore_secret_backup(
        &self,
        backup: &BackupSecretResult,
    ) -> Result<SecretBundle, ClientError> {
        let req = self
            .conn
            .request(Method::POST, "/secrets/restore")?
            .with_json(backup)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// List the latest version of every secret.
    pub fn list_secret_properties(
        &self,
        max_results: Option<u32>,
    ) -> Result<Pager<ArmList<SecretItem>>, ClientError> {
        self.conn.pager("/secrets", max_results)
    }

    pub fn list_secret_versions(
        &self,
        name: &str,
        max_results: Option<u32>,
    ) -> Result<Pager<ArmList<SecretItem>>, ClientError> {
        let path = format!("{}/versions", Self::secret_path(name, None)?);
        self.conn.pager(&path, max_results)
    }

    pub fn list_deleted_secrets(
        &self,
        max_results: Option<u32>,
    ) -> Result<Pager<ArmList<DeletedSecretItem>>, ClientError> {
        self.conn.pager("/deletedsecrets", max_results)
    }
}

/// Waits for a secret to be fully deleted.
pub type DeleteSecretPoller = VaultPoller<DeletedSecretBundle>;

/// Waits for a deleted secret to be readable again.
pub type RecoverSecretPoller = VaultPoller<SecretBundle>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_id_parse() {
        let id = SecretId::parse("https://myvault.vault.azure.net/secrets/db-password/abc123").unwrap();
        assert_eq!(id.vault_url, "https://myvault.vault.azure.net");
        assert_eq!(id.name, "db-password");
        assert_eq!(id.version.as_deref(), Some("abc123"));

        let id = SecretId::parse("https://myvault.vault.azure.net/secrets/db-password").unwrap();
        assert!(id.version.is_none());

        let id = SecretId::parse("https://localhost:8443/secrets/s/").unwrap();
        assert_eq!(id.vault_url, "https://localhost:8443");
    }

    #[test]
    fn test_secret_id_rejects_keys() {
        assert!(SecretId::parse("https://v.vault.azure.net/keys/k/1").is_err());
        assert!(SecretId::parse("https://v.vault.azure.net/secrets").is_err());
        assert!(SecretId::parse("not a url").is_err());
    }

    #[test]
    fn test_secret_path() {
        assert_eq!(SecretClient::secret_path("a", None).unwrap(), "/secrets/a");
        assert_eq!(SecretClient::secret_path("a", Some("")).unwrap(), "/secrets/a");
        assert_eq!(
            SecretClient::secret_path("a", Some("v1")).unwrap(),
            "/secrets/a/v1"
        );
        assert!(SecretClient::secret_path("", None).is_err());
    }

    #[test]
    fn test_deleted_bundle_timestamps() {
        let deleted: DeletedSecretBundle = serde_json::from_str(
            r#"{"id":"https://v.vault.azure.net/secrets/s/1","attributes":{"enabled":true,"created":1700000000,"recoveryLevel":"Recoverable+Purgeable"},"recoveryId":"https://v.vault.azure.net/deletedsecrets/s","deletedDate":1700000100,"scheduledPurgeDate":1707776100}"#,
        )
        .unwrap();
        assert_eq!(
            deleted.secret.id.as_deref(),
            Some("https://v.vault.azure.net/secrets/s/1")
        );
        assert_eq!(deleted.deleted_date.unwrap().timestamp(), 1_700_000_100);
        let attrs = deleted.secret.attributes.unwrap();
        assert_eq!(attrs.created.unwrap().timestamp(), 1_700_000_000);
        assert!(attrs.expires.is_none());
    }

    #[test]
    fn test_set_parameters_serialization() {
        let params = SetSecretParameters {
            value: "hunter2".into(),
            content_type: Some("text/plain".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"value":"hunter2","contentType":"text/plain"}"#
        );
    }
}
