//! Azure Resource Manager clients
//!
//! All ARM clients share one request shape: a path template under the
//! resource manager endpoint, an `api-version` query parameter, JSON bodies,
//! and bearer tokens for the cloud's resource manager audience.

pub mod compute;
pub mod network;
pub mod reservations;
pub mod resources;

use std::collections::HashMap;
use std::sync::Arc;

use azrest_core::cloud::Cloud;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::auth::TokenCredential;
use crate::error::{ClientError, ResponseError};
use crate::pager::{Paged, Pager};
use crate::pipeline::{AuthPolicy, BearerTokenPolicy, ClientOptions, Pipeline};
use crate::poller::{FinalStateVia, Poller};
use crate::request::{Request, Response, join_paths};

/// Options shared by every ARM client
#[derive(Debug, Clone, Default)]
pub struct ArmClientOptions {
    pub cloud: Cloud,
    /// Override the resource manager endpoint, e.g. for a test server
    pub endpoint: Option<String>,
    pub client: ClientOptions,
}

/// Provisioning state reported by most ARM resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Succeeded,
    Failed,
    Canceled,
    Creating,
    Updating,
    Deleting,
    Accepted,
    #[serde(untagged)]
    Other(String),
}

impl ProvisioningState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
            Self::Creating => "Creating",
            Self::Updating => "Updating",
            Self::Deleting => "Deleting",
            Self::Accepted => "Accepted",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource tags
pub type Tags = HashMap<String, String>;

/// Connection details shared by the ARM clients.
#[derive(Clone)]
pub(crate) struct ArmConnection {
    pipeline: Pipeline,
    endpoint: String,
}

impl ArmConnection {
    pub(crate) fn new(credential: Arc<dyn TokenCredential>, options: ArmClientOptions) -> Self {
        let scope = format!("{}/.default", options.cloud.resource_manager_audience());
        let endpoint = options
            .endpoint
            .unwrap_or_else(|| options.cloud.resource_manager_endpoint().to_string());
        let policy = BearerTokenPolicy::new(credential, &[scope.as_str()]);
        Self {
            pipeline: Pipeline::new(AuthPolicy::Bearer(policy), options.client),
            endpoint,
        }
    }

    pub(crate) fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// A request for `path` with the `api-version` set and JSON accepted.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
    ) -> Result<Request, ClientError> {
        Ok(Request::new(method, &join_paths(&self.endpoint, path))?
            .with_query("api-version", api_version)
            .accept_json())
    }

    /// Send and fail with a [`ResponseError`] unless the status is one of `codes`.
    pub(crate) async fn send(
        &self,
        request: &Request,
        codes: &[u16],
    ) -> Result<Response, ClientError> {
        let resp = self.pipeline.send(request).await?;
        if !resp.has_status(codes) {
            return Err(ResponseError::from_response(&resp).into());
        }
        Ok(resp)
    }

    pub(crate) fn pager<P: Paged>(&self, request: Request) -> Pager<P> {
        Pager::new(self.pipeline.clone(), request)
    }

    /// Start a long-running operation.
    pub(crate) async fn begin<T: DeserializeOwned>(
        &self,
        request: &Request,
        codes: &[u16],
        poller_type: &str,
        final_state_via: Option<FinalStateVia>,
    ) -> Result<Poller<T>, ClientError> {
        let resp = self.send(request, codes).await?;
        Poller::new(self.pipeline.clone(), poller_type, resp, final_state_via)
    }

    pub(crate) fn resume<T: DeserializeOwned>(
        &self,
        poller_type: &str,
        token: &str,
    ) -> Result<Poller<T>, ClientError> {
        Poller::from_resume_token(self.pipeline.clone(), poller_type, token)
    }
}

/// Reject empty subscription IDs up front.
pub(crate) fn require(name: &str, value: &str) -> Result<(), ClientError> {
    if value.is_empty() {
        return Err(ClientError::InvalidParameter(format!(
            "parameter {name} cannot be empty"
        )));
    }
    Ok(())
}
