//! Subscriptions and resource groups

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ArmClientOptions, ArmConnection, ProvisioningState, Tags, require};
use crate::auth::TokenCredential;
use crate::error::{ClientError, ResponseError};
use crate::pager::{ArmList, Pager};
use crate::poller::{FinalStateVia, NoContent, Poller};
use crate::request::expand_path;

pub const RESOURCES_API_VERSION: &str = "2021-04-01";
pub const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";

pub const POLLER_DELETE: &str = "ResourceGroupsClient.Delete";

/// An Azure subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

/// A resource group
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

/// Fields that can be changed with [`ResourceGroupsClient::update`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupPatchable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

/// Lists the subscriptions the caller can see.
#[derive(Clone)]
pub struct SubscriptionsClient {
    conn: ArmConnection,
}

impl SubscriptionsClient {
    pub fn new(credential: Arc<dyn TokenCredential>, options: ArmClientOptions) -> Self {
        Self {
            conn: ArmConnection::new(credential, options),
        }
    }

    pub fn list(&self) -> Result<Pager<ArmList<Subscription>>, ClientError> {
        debug!("listing subscriptions");
        let req = self
            .conn
            .request(Method::GET, "/subscriptions", SUBSCRIPTIONS_API_VERSION)?;
        Ok(self.conn.pager(req))
    }

    pub async fn get(&self, subscription_id: &str) -> Result<Subscription, ClientError> {
        let path = expand_path(
            "/subscriptions/{subscriptionId}",
            &[("subscriptionId", subscription_id)],
        )?;
        let req = self
            .conn
            .request(Method::GET, &path, SUBSCRIPTIONS_API_VERSION)?;
        self.conn.send(&req, &[200]).await?.json()
    }
}

/// Manages resource groups in one subscription.
#[derive(Clone)]
pub struct ResourceGroupsClient {
    conn: ArmConnection,
    subscription_id: String,
}

impl ResourceGroupsClient {
    pub fn new(
        subscription_id: impl Into<String>,
        credential: Arc<dyn TokenCredential>,
        options: ArmClientOptions,
    ) -> Result<Self, ClientError> {
        let subscription_id = subscription_id.into();
        require("subscriptionId", &subscription_id)?;
        Ok(Self {
            conn: ArmConnection::new(credential, options),
            subscription_id,
        })
    }

    fn path(&self, name: &str) -> Result<String, ClientError> {
        expand_path(
            "/subscriptions/{subscriptionId}/resourcegroups/{resourceGroupName}",
            &[
                ("subscriptionId", &self.subscription_id),
                ("resourceGroupName", name),
            ],
        )
    }

    /// Whether the resource group exists: 204 means yes, 404 means no.
    pub async fn check_existence(&self, name: &str) -> Result<bool, ClientError> {
        let req = self
            .conn
            .request(Method::HEAD, &self.path(name)?, RESOURCES_API_VERSION)?;
        let resp = self.conn.pipeline().send(&req).await?;
        match resp.status().as_u16() {
            204 => Ok(true),
            404 => Ok(false),
            _ => Err(ResponseError::from_response(&resp).into()),
        }
    }

    pub async fn create_or_update(
        &self,
        name: &str,
        group: &ResourceGroup,
    ) -> Result<ResourceGroup, ClientError> {
        debug!(resource_group = name, location = %group.location, "creating or updating resource group");
        let req = self
            .conn
            .request(Method::PUT, &self.path(name)?, RESOURCES_API_VERSION)?
            .with_json(group)?;
        self.conn.send(&req, &[200, 201]).await?.json()
    }

    pub async fn get(&self, name: &str) -> Result<ResourceGroup, ClientError> {
        let req = self
            .conn
            .request(Method::GET, &self.path(name)?, RESOURCES_API_VERSION)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    pub async fn update(
        &self,
        name: &str,
        patch: &ResourceGroupPatchable,
    ) -> Result<ResourceGroup, ClientError> {
        let req = self
            .conn
            .request(Method::PATCH, &self.path(name)?, RESOURCES_API_VERSION)?
            .with_json(patch)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// Delete a resource group and everything in it.
    pub async fn begin_delete(&self, name: &str) -> Result<Poller<NoContent>, ClientError> {
        debug!(resource_group = name, "deleting resource group");
        let req = self
            .conn
            .request(Method::DELETE, &self.path(name)?, RESOURCES_API_VERSION)?;
        self.conn
            .begin(&req, &[200, 202], POLLER_DELETE, Some(FinalStateVia::Location))
            .await
    }

    pub fn resume_delete(&self, token: &str) -> Result<Poller<NoContent>, ClientError> {
        self.conn.resume(POLLER_DELETE, token)
    }

    /// List resource groups, optionally filtered with an OData `$filter`.
    pub fn list(
        &self,
        filter: Option<&str>,
        top: Option<u32>,
    ) -> Result<Pager<ArmList<ResourceGroup>>, ClientError> {
        let path = expand_path(
            "/subscriptions/{subscriptionId}/resourcegroups",
            &[("subscriptionId", &self.subscription_id)],
        )?;
        let req = self
            .conn
            .request(Method::GET, &path, RESOURCES_API_VERSION)?
            .with_optional_query("$filter", filter)
            .with_optional_query("$top", top);
        Ok(self.conn.pager(req))
    }
}
