//! Key Vault keys and the cryptographic operations performed with them
//!
//! Key material and operation payloads travel as unpadded base64url strings.
//! The models here hold raw bytes and convert at the serde boundary.

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
use crate::request::{Response, expand_path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    #[serde(rename = "EC")]
    Ec,
    #[serde(rename = "EC-HSM")]
    EcHsm,
    #[serde(rename = "RSA")]
    Rsa,
    #[serde(rename = "RSA-HSM")]
    RsaHsm,
    #[serde(rename = "oct")]
    Oct,
    #[serde(rename = "oct-HSM")]
    OctHsm,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveName {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-256K")]
    P256K,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyOperation {
    Encrypt,
    Decrypt,
    Sign,
    Verify,
    WrapKey,
    UnwrapKey,
    Import,
    Export,
    #[serde(untagged)]
    Other(String),
}

/// Algorithms for encrypt, decrypt, wrap and unwrap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    #[serde(rename = "RSA-OAEP")]
    RsaOaep,
    #[serde(rename = "RSA-OAEP-256")]
    RsaOaep256,
    #[serde(rename = "RSA1_5")]
    Rsa15,
    #[serde(rename = "A128GCM")]
    A128Gcm,
    #[serde(rename = "A256GCM")]
    A256Gcm,
    #[serde(rename = "A128KW")]
    A128Kw,
    #[serde(rename = "A256KW")]
    A256Kw,
    #[serde(untagged)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    RS256,
    RS384,
    RS512,
    PS256,
    PS384,
    PS512,
    ES256,
    ES256K,
    ES384,
    ES512,
    #[serde(untagged)]
    Other(String),
}

/// Key attributes. Timestamps travel as Unix seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAttributes {
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exportable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hsm_platform: Option<String>,
}

/// A JSON web key. Private fields are only present on import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<KeyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyOperation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<CurveName>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub n: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub e: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub d: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub dp: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub dq: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub qi: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub p: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub q: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub k: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub key_hsm: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub x: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub y: Option<Vec<u8>>,
}

/// A key with its public material
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<JsonWebKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<KeyAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    /// Set when the key backs a certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
}

/// A soft-deleted key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletedKeyBundle {
    #[serde(flatten)]
    pub key: KeyBundle,
    #[serde(rename = "recoveryId", default, skip_serializing_if = "Option::is_none")]
    pub recovery_id: Option<String>,
    #[serde(
        rename = "scheduledPurgeDate",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_purge_date: Option<DateTime<Utc>>,
    #[serde(
        rename = "deletedDate",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_date: Option<DateTime<Utc>>,
}

/// A key in a list, without its material
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<KeyAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletedKeyItem {
    #[serde(flatten)]
    pub item: KeyItem,
    #[serde(rename = "recoveryId", default, skip_serializing_if = "Option::is_none")]
    pub recovery_id: Option<String>,
    #[serde(
        rename = "scheduledPurgeDate",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_purge_date: Option<DateTime<Utc>>,
    #[serde(
        rename = "deletedDate",
        default,
        with = "chrono::serde::ts_seconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_date: Option<DateTime<Utc>>,
}

/// Parameters for [`KeyClient::create_key`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateKeyParameters {
    pub kty: KeyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_exponent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<CurveName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyOperation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<KeyAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

impl CreateKeyParameters {
    fn of(kty: KeyType) -> Self {
        Self {
            kty,
            key_size: None,
            public_exponent: None,
            crv: None,
            key_ops: None,
            attributes: None,
            tags: None,
        }
    }

    /// An RSA key. The service picks 2048 bits when `size` is `None`.
    pub fn rsa(size: Option<u32>) -> Self {
        Self {
            key_size: size,
            ..Self::of(KeyType::Rsa)
        }
    }

    pub fn ec(curve: CurveName) -> Self {
        Self {
            crv: Some(curve),
            ..Self::of(KeyType::Ec)
        }
    }

    /// A symmetric key. Only Managed HSM supports these.
    pub fn oct(size: u32) -> Self {
        Self {
            key_size: Some(size),
            ..Self::of(KeyType::OctHsm)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportKeyParameters {
    pub key: JsonWebKey,
    #[serde(rename = "Hsm", default, skip_serializing_if = "Option::is_none")]
    pub hsm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<KeyAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateKeyParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<KeyOperation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<KeyAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
}

/// An opaque key backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupKeyResult {
    pub value: String,
}

/// Input for encrypt, decrypt, wrap and unwrap
#[derive(Debug, Clone, Serialize)]
pub struct KeyOperationParameters {
    #[serde(rename = "alg")]
    pub algorithm: EncryptionAlgorithm,
    #[serde(with = "base64url")]
    pub value: Vec<u8>,
    /// Initialization vector for symmetric algorithms
    #[serde(with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub iv: Option<Vec<u8>>,
    /// Additional authenticated data for AES-GCM
    #[serde(with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub aad: Option<Vec<u8>>,
    /// Authentication tag for AES-GCM decryption
    #[serde(with = "base64url::option", skip_serializing_if = "Option::is_none")]
    pub tag: Option<Vec<u8>>,
}

impl KeyOperationParameters {
    pub fn new(algorithm: EncryptionAlgorithm, value: impl Into<Vec<u8>>) -> Self {
        Self {
            algorithm,
            value: value.into(),
            iv: None,
            aad: None,
            tag: None,
        }
    }
}

/// Output of a cryptographic operation. `kid` names the key version used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeyOperationResult {
    #[serde(default)]
    pub kid: Option<String>,
    #[serde(default, with = "base64url::option")]
    pub value: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option")]
    pub iv: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option")]
    pub tag: Option<Vec<u8>>,
    #[serde(default, with = "base64url::option")]
    pub aad: Option<Vec<u8>>,
}

#[derive(Serialize)]
struct SignParameters<'a> {
    alg: &'a SignatureAlgorithm,
    #[serde(with = "base64url")]
    value: &'a [u8],
}

#[derive(Serialize)]
struct VerifyParameters<'a> {
    alg: &'a SignatureAlgorithm,
    #[serde(with = "base64url")]
    digest: &'a [u8],
    #[serde(with = "base64url")]
    value: &'a [u8],
}

#[derive(Deserialize)]
struct VerifyResult {
    value: bool,
}

#[derive(Serialize)]
struct RandomBytesRequest {
    count: u32,
}

#[derive(Deserialize)]
struct RandomBytesResult {
    #[serde(with = "base64url")]
    value: Vec<u8>,
}

/// A parsed key identifier `https://{vault}/keys/{name}[/{version}]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyId {
    pub vault_url: String,
    pub name: String,
    pub version: Option<String>,
}

impl KeyId {
    pub fn parse(id: &str) -> Result<Self, ClientError> {
        let ItemId {
            vault_url,
            name,
            version,
        } = ItemId::parse(id, "keys")?;
        Ok(Self {
            vault_url,
            name,
            version,
        })
    }
}

/// Manages keys in one vault and runs cryptographic operations with them.
#[derive(Clone)]
pub struct KeyClient {
    conn: VaultConnection,
}

impl KeyClient {
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

    fn key_path(name: &str, version: Option<&str>) -> Result<String, ClientError> {
        match version.filter(|v| !v.is_empty()) {
            Some(version) => expand_path(
                "/keys/{key-name}/{key-version}",
                &[("key-name", name), ("key-version", version)],
            ),
            None => expand_path("/keys/{key-name}", &[("key-name", name)]),
        }
    }

    fn deleted_path(name: &str) -> Result<String, ClientError> {
        expand_path("/deletedkeys/{key-name}", &[("key-name", name)])
    }

    /// Create a key, or a new version of an existing one.
    pub async fn create_key(
        &self,
        name: &str,
        parameters: &CreateKeyParameters,
    ) -> Result<KeyBundle, ClientError> {
        debug!(key = name, kty = ?parameters.kty, "creating key");
        let path = format!("{}/create", Self::key_path(name, None)?);
        let req = self.conn.request(Method::POST, &path)?.with_json(parameters)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Import existing key material as a new key version.
    pub async fn import_key(
        &self,
        name: &str,
        parameters: &ImportKeyParameters,
    ) -> Result<KeyBundle, ClientError> {
        debug!(key = name, "importing key");
        let req = self
            .conn
            .request(Method::PUT, &Self::key_path(name, None)?)?
            .with_json(parameters)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Get the public part of a key. Without a version the latest one is returned.
    pub async fn get_key(&self, name: &str, version: Option<&str>) -> Result<KeyBundle, ClientError> {
        let req = self.conn.request(Method::GET, &Self::key_path(name, version)?)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    pub async fn update_key_properties(
        &self,
        name: &str,
        version: Option<&str>,
        parameters: &UpdateKeyParameters,
    ) -> Result<KeyBundle, ClientError> {
        let req = self
            .conn
            .request(Method::PATCH, &Self::key_path(name, version)?)?
            .with_json(parameters)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Create a new version of a key with fresh material.
    pub async fn rotate_key(&self, name: &str) -> Result<KeyBundle, ClientError> {
        debug!(key = name, "rotating key");
        let path = format!("{}/rotate", Self::key_path(name, None)?);
        let req = self.conn.request(Method::POST, &path)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Delete every version of a key.
    pub async fn begin_delete_key(&self, name: &str) -> Result<DeleteKeyPoller, ClientError> {
        debug!(key = name, "deleting key");
        let req = self.conn.request(Method::DELETE, &Self::key_path(name, None)?)?;
        let deleted: DeletedKeyBundle = self.conn.send(&req, &[200]).await?.json()?;
        self.conn.start_poller(&Self::deleted_path(name)?, deleted).await
    }

    pub async fn get_deleted_key(&self, name: &str) -> Result<DeletedKeyBundle, ClientError> {
        let req = self.conn.request(Method::GET, &Self::deleted_path(name)?)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Permanently remove a deleted key.
    pub async fn purge_deleted_key(&self, name: &str) -> Result<(), ClientError> {
        debug!(key = name, "purging deleted key");
        let req = self.conn.request(Method::DELETE, &Self::deleted_path(name)?)?;
        self.conn.send(&req, &[204]).await?;
        Ok(())
    }

    pub async fn begin_recover_deleted_key(&self, name: &str) -> Result<RecoverKeyPoller, ClientError> {
        debug!(key = name, "recovering deleted key");
        let path = format!("{}/recover", Self::deleted_path(name)?);
        let req = self.conn.request(Method::POST, &path)?;
        let recovered: KeyBundle = self.conn.send(&req, &[200]).await?.json()?;
        self.conn
            .start_poller(&Self::key_path(name, None)?, recovered)
            .await
    }

    pub async fn backup_key(&self, name: &str) -> Result<BackupKeyResult, ClientError> {
        let path = format!("{}/backup", Self::key_path(name, None)?);
        let req = self.conn.request(Method::POST, &path)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    pub async fn restore_key_backup(&self, backup: &BackupKeyResult) -> Result<KeyBundle, ClientError> {
        let req = self
            .conn
            .request(Method::POST, "/keys/restore")?
            .with_json(backup)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// List the latest version of every key.
    pub fn list_key_properties(
        &self,
        max_results: Option<u32>,
    ) -> Result<Pager<ArmList<KeyItem>>, ClientError> {
        self.conn.pager("/keys", max_results)
    }

    pub fn list_key_versions(
        &self,
        name: &str,
        max_results: Option<u32>,
    ) -> Result<Pager<ArmList<KeyItem>>, ClientError> {
        let path = format!("{}/versions", Self::key_path(name, None)?);
        self.conn.pager(&path, max_results)
    }

    pub fn list_deleted_keys(
        &self,
        max_results: Option<u32>,
    ) -> Result<Pager<ArmList<DeletedKeyItem>>, ClientError> {
        self.conn.pager("/deletedkeys", max_results)
    }

    async fn key_operation<B: Serialize + ?Sized>(
        &self,
        name: &str,
        version: Option<&str>,
        operation: &str,
        body: &B,
    ) -> Result<Response, ClientError> {
        debug!(key = name, operation, "key operation");
        let path = format!("{}/{operation}", Self::key_path(name, version)?);
        let req = self.conn.request(Method::POST, &path)?.with_json(body)?;
        self.conn.send(&req, &[200]).await
    }

    pub async fn encrypt(
        &self,
        name: &str,
        version: Option<&str>,
        parameters: &KeyOperationParameters,
    ) -> Result<KeyOperationResult, ClientError> {
        self.key_operation(name, version, "encrypt", parameters)
            .await?
            .json()
    }

    pub async fn decrypt(
        &self,
        name: &str,
        version: Option<&str>,
        parameters: &KeyOperationParameters,
    ) -> Result<KeyOperationResult, ClientError> {
        self.key_operation(name, version, "decrypt", parameters)
            .await?
            .json()
    }

    pub async fn wrap_key(
        &self,
        name: &str,
        version: Option<&str>,
        parameters: &KeyOperationParameters,
    ) -> Result<KeyOperationResult, ClientError> {
        self.key_operation(name, version, "wrapkey", parameters)
            .await?
            .json()
    }

    pub async fn unwrap_key(
        &self,
        name: &str,
        version: Option<&str>,
        parameters: &KeyOperationParameters,
    ) -> Result<KeyOperationResult, ClientError> {
        self.key_operation(name, version, "unwrapkey", parameters)
            .await?
            .json()
    }

    /// Sign a digest that was computed with the hash matching `algorithm`.
    pub async fn sign(
        &self,
        name: &str,
        version: Option<&str>,
        algorithm: &SignatureAlgorithm,
        digest: &[u8],
    ) -> Result<KeyOperationResult, ClientError> {
        let body = SignParameters {
            alg: algorithm,
            value: digest,
        };
        self.key_operation(name, version, "sign", &body).await?.json()
    }

    /// Check a signature over a digest. An invalid signature is `Ok(false)`.
    pub async fn verify(
        &self,
        name: &str,
        version: Option<&str>,
        algorithm: &SignatureAlgorithm,
        digest: &[u8],
        signature: &[u8],
    ) -> Result<bool, ClientError> {
        let body = VerifyParameters {
            alg: algorithm,
            digest,
            value: signature,
        };
        let result: VerifyResult = self
            .key_operation(name, version, "verify", &body)
            .await?
            .json()?;
        Ok(result.value)
    }

    /// Random bytes from the vault's HSM.
    pub async fn get_random_bytes(&self, count: u32) -> Result<Vec<u8>, ClientError> {
        if count == 0 {
            return Err(ClientError::InvalidParameter(
                "parameter count must be greater than zero".into(),
            ));
        }
        let req = self
            .conn
            .request(Method::POST, "/rng")?
            .with_json(&RandomBytesRequest { count })?;
        let result: RandomBytesResult = self.conn.send(&req, &[200]).await?.json()?;
        Ok(result.value)
    }
}

/// Waits for a key to be fully deleted.
pub type DeleteKeyPoller = VaultPoller<DeletedKeyBundle>;

/// Waits for a deleted key to be readable again.
pub type RecoverKeyPoller = VaultPoller<KeyBundle>;

/// Unpadded base64url, accepting padded input.
mod base64url {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde::{Deserialize, Deserializer, Serializer};

    fn decode(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
        URL_SAFE_NO_PAD.decode(value.trim_end_matches('='))
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let value = String::deserialize(deserializer)?;
        decode(&value).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(bytes) => super::serialize(bytes, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|value| decode(&value).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
