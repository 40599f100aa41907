//! Key Vault keys and secrets
//!
//! Deleting and recovering a key or secret complete asynchronously, but the
//! service offers no operation status endpoint. [`VaultPoller`] instead reads
//! the item in its destination state: a 404 means the operation is still
//! in progress and a 200 means it has finished.

pub mod keys;
pub mod secrets;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::TokenCredential;
use crate::error::{ClientError, ResponseError};
use crate::pager::{ArmList, Pager};
use crate::pipeline::{AuthPolicy, BearerTokenPolicy, ClientOptions, Pipeline};
use crate::request::{Request, Response, join_paths};

pub use self::keys::*;
pub use self::secrets::*;

pub const KEYVAULT_API_VERSION: &str = "7.4";
pub const KEYVAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Pipeline and base URL shared by the key and secret clients.
#[derive(Clone)]
pub(crate) struct VaultConnection {
    pipeline: Pipeline,
    vault_url: String,
}

impl VaultConnection {
    pub(crate) fn new(
        vault_url: String,
        credential: Arc<dyn TokenCredential>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        Url::parse(&vault_url).map_err(|e| ClientError::InvalidUrl(format!("{vault_url}: {e}")))?;
        let policy = BearerTokenPolicy::new(credential, &[KEYVAULT_SCOPE]);
        Ok(Self {
            pipeline: Pipeline::new(AuthPolicy::Bearer(policy), options),
            vault_url,
        })
    }

    pub(crate) fn vault_url(&self) -> &str {
        &self.vault_url
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> Result<Request, ClientError> {
        Ok(Request::new(method, &join_paths(&self.vault_url, path))?
            .with_query("api-version", KEYVAULT_API_VERSION)
            .accept_json())
    }

    pub(crate) async fn send(&self, request: &Request, codes: &[u16]) -> Result<Response, ClientError> {
        let resp = self.pipeline.send(request).await?;
        if !resp.has_status(codes) {
            return Err(ResponseError::from_response(&resp).into());
        }
        Ok(resp)
    }

    pub(crate) fn pager<T: DeserializeOwned>(
        &self,
        path: &str,
        max_results: Option<u32>,
    ) -> Result<Pager<ArmList<T>>, ClientError> {
        let req = self
            .request(Method::GET, path)?
            .with_optional_query("maxresults", max_results);
        Ok(Pager::new(self.pipeline.clone(), req))
    }

    pub(crate) async fn start_poller<T>(&self, check_path: &str, initial: T) -> Result<VaultPoller<T>, ClientError> {
        let check = self.request(Method::GET, check_path)?;
        VaultPoller::start(self.pipeline.clone(), check, initial).await
    }
}

/// A parsed item identifier `https://{vault}/{collection}/{name}[/{version}]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ItemId {
    pub vault_url: String,
    pub name: String,
    pub version: Option<String>,
}

impl ItemId {
    pub(crate) fn parse(id: &str, collection: &str) -> Result<Self, ClientError> {
        let invalid = |why: &str| ClientError::InvalidParameter(format!("invalid {collection} ID '{id}': {why}"));
        let url = Url::parse(id).map_err(|e| invalid(&e.to_string()))?;
        let host = url.host_str().ok_or_else(|| invalid("missing host"))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let (name, version) = match segments.as_slice() {
            [c, name] if *c == collection => (*name, None),
            [c, name, version] if *c == collection => (*name, Some(version.to_string())),
            _ => return Err(invalid(&format!("expected /{collection}/{{name}}[/{{version}}]"))),
        };

        let vault_url = match url.port() {
            Some(port) => format!("{}://{host}:{port}", url.scheme()),
            None => format!("{}://{host}", url.scheme()),
        };
        Ok(Self {
            vault_url,
            name: name.to_string(),
            version,
        })
    }
}

/// Reads an item URL until it stops answering 404.
///
/// The result is the body of the request that started the operation.
pub struct VaultPoller<T> {
    pipeline: Pipeline,
    check: Request,
    initial: T,
    done: bool,
}

impl<T> VaultPoller<T> {
    async fn start(pipeline: Pipeline, check: Request, initial: T) -> Result<Self, ClientError> {
        let mut poller = Self {
            pipeline,
            check,
            initial,
            done: false,
        };
        poller.poll().await?;
        Ok(poller)
    }

    pub fn done(&self) -> bool {
        self.done
    }

    /// Check once. Returns whether the operation has finished.
    pub async fn poll(&mut self) -> Result<bool, ClientError> {
        if self.done {
            return Ok(true);
        }
        let resp = self.pipeline.send(&self.check).await?;
        match resp.status().as_u16() {
            200 => self.done = true,
            404 => {}
            _ => return Err(ResponseError::from_response(&resp).into()),
        }
        debug!(url = %self.check.url(), done = self.done, "polled vault operation");
        Ok(self.done)
    }

    /// The response to the initial request, once the operation has finished.
    pub fn result(self) -> Result<T, ClientError> {
        if !self.done {
            return Err(ClientError::poller(
                "cannot return a final response from a poller in a non-terminal state",
            ));
        }
        Ok(self.initial)
    }

    pub async fn poll_until_done(mut self, frequency: Duration) -> Result<T, ClientError> {
        while !self.poll().await? {
            tokio::time::sleep(frequency).await;
        }
        self.result()
    }
}
