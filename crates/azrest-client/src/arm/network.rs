//! Virtual networks and subnets

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ArmClientOptions, ArmConnection, ProvisioningState, Tags, require};
use crate::auth::TokenCredential;
use crate::error::ClientError;
use crate::pager::{ArmList, Pager};
use crate::poller::{FinalStateVia, NoContent, Poller};
use crate::request::{Request, expand_path};

pub const NETWORK_API_VERSION: &str = "2023-06-01";

const VNET_PATH: &str = "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Network/virtualNetworks/{virtualNetworkName}";

pub const POLLER_VNET_CREATE_OR_UPDATE: &str = "VirtualNetworksClient.CreateOrUpdate";
pub const POLLER_VNET_DELETE: &str = "VirtualNetworksClient.Delete";
pub const POLLER_SUBNET_CREATE_OR_UPDATE: &str = "SubnetsClient.CreateOrUpdate";
pub const POLLER_SUBNET_DELETE: &str = "SubnetsClient.Delete";

/// A virtual network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<VirtualNetworkProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_space: Option<AddressSpace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnets: Option<Vec<Subnet>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhcp_options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_ddos_protection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_guid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

/// A subnet of a virtual network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<SubnetProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefixes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_table: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
}

/// Answer to an IP availability check
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpAddressAvailabilityResult {
    #[serde(default)]
    pub available: bool,
    /// Free addresses near the one asked about, when it is taken
    #[serde(rename = "availableIPAddresses", default)]
    pub available_ip_addresses: Vec<String>,
    #[serde(default)]
    pub is_platform_reserved: bool,
}

/// Manages virtual networks in one subscription.
#[derive(Clone)]
pub struct VirtualNetworksClient {
    conn: ArmConnection,
    subscription_id: String,
}

impl VirtualNetworksClient {
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

    fn request(
        &self,
        method: Method,
        resource_group: &str,
        vnet: &str,
        suffix: &str,
    ) -> Result<Request, ClientError> {
        let path = expand_path(
            VNET_PATH,
            &[
                ("subscriptionId", &self.subscription_id),
                ("resourceGroupName", resource_group),
                ("virtualNetworkName", vnet),
            ],
        )?;
        self.conn
            .request(method, &format!("{path}{suffix}"), NETWORK_API_VERSION)
    }

    pub async fn get(
        &self,
        resource_group: &str,
        vnet: &str,
        expand: Option<&str>,
    ) -> Result<VirtualNetwork, ClientError> {
        let req = self
            .request(Method::GET, resource_group, vnet, "")?
            .with_optional_query("$expand", expand);
        self.conn.send(&req, &[200]).await?.json()
    }

    pub fn list(&self, resource_group: &str) -> Result<Pager<ArmList<VirtualNetwork>>, ClientError> {
        let path = expand_path(
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Network/virtualNetworks",
            &[
                ("subscriptionId", &self.subscription_id),
                ("resourceGroupName", resource_group),
            ],
        )?;
        let req = self.conn.request(Method::GET, &path, NETWORK_API_VERSION)?;
        Ok(self.conn.pager(req))
    }

    pub fn list_all(&self) -> Result<Pager<ArmList<VirtualNetwork>>, ClientError> {
        let path = expand_path(
            "/subscriptions/{subscriptionId}/providers/Microsoft.Network/virtualNetworks",
            &[("subscriptionId", &self.subscription_id)],
        )?;
        let req = self.conn.request(Method::GET, &path, NETWORK_API_VERSION)?;
        Ok(self.conn.pager(req))
    }

    pub async fn begin_create_or_update(
        &self,
        resource_group: &str,
        vnet: &str,
        parameters: &VirtualNetwork,
    ) -> Result<Poller<VirtualNetwork>, ClientError> {
        debug!(resource_group, vnet, "creating or updating virtual network");
        let req = self
            .request(Method::PUT, resource_group, vnet, "")?
            .with_json(parameters)?;
        self.conn
            .begin(
                &req,
                &[200, 201],
                POLLER_VNET_CREATE_OR_UPDATE,
                Some(FinalStateVia::AzureAsyncOperation),
            )
            .await
    }

    pub async fn begin_delete(
        &self,
        resource_group: &str,
        vnet: &str,
    ) -> Result<Poller<NoContent>, ClientError> {
        debug!(resource_group, vnet, "deleting virtual network");
        let req = self.request(Method::DELETE, resource_group, vnet, "")?;
        self.conn
            .begin(
                &req,
                &[200, 202, 204],
                POLLER_VNET_DELETE,
                Some(FinalStateVia::Location),
            )
            .await
    }

    pub fn resume_create_or_update(&self, token: &str) -> Result<Poller<VirtualNetwork>, ClientError> {
        self.conn.resume(POLLER_VNET_CREATE_OR_UPDATE, token)
    }

    pub fn resume_delete(&self, token: &str) -> Result<Poller<NoContent>, ClientError> {
        self.conn.resume(POLLER_VNET_DELETE, token)
    }

    /// Check whether a private IP address is free in the virtual network.
    pub async fn check_ip_address_availability(
        &self,
        resource_group: &str,
        vnet: &str,
        ip_address: &str,
    ) -> Result<IpAddressAvailabilityResult, ClientError> {
        let req = self
            .request(Method::GET, resource_group, vnet, "/CheckIPAddressAvailability")?
            .with_query("ipAddress", ip_address);
        self.conn.send(&req, &[200]).await?.json()
    }
}

/// Manages the subnets of virtual networks in one subscription.
#[derive(Clone)]
pub struct SubnetsClient {
    conn: ArmConnection,
    subscription_id: String,
}

impl SubnetsClient {
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

    fn request(
        &self,
        method: Method,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
    ) -> Result<Request, ClientError> {
        let path = expand_path(
            &format!("{VNET_PATH}/subnets/{{subnetName}}"),
            &[
                ("subscriptionId", &self.subscription_id),
                ("resourceGroupName", resource_group),
                ("virtualNetworkName", vnet),
                ("subnetName", subnet),
            ],
        )?;
        self.conn.request(method, &path, NETWORK_API_VERSION)
    }

    pub async fn get(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
    ) -> Result<Subnet, ClientError> {
        let req = self.request(Method::GET, resource_group, vnet, subnet)?;
        self.conn.send(&req, &[200]).await?.json()
    }

    pub fn list(&self, resource_group: &str, vnet: &str) -> Result<Pager<ArmList<Subnet>>, ClientError> {
        let path = expand_path(
            &format!("{VNET_PATH}/subnets"),
            &[
                ("subscriptionId", &self.subscription_id),
                ("resourceGroupName", resource_group),
                ("virtualNetworkName", vnet),
            ],
        )?;
        let req = self.conn.request(Method::GET, &path, NETWORK_API_VERSION)?;
        Ok(self.conn.pager(req))
    }

    pub async fn begin_create_or_update(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
        parameters: &Subnet,
    ) -> Result<Poller<Subnet>, ClientError> {
        debug!(resource_group, vnet, subnet, "creating or updating subnet");
        let req = self
            .request(Method::PUT, resource_group, vnet, subnet)?
            .with_json(parameters)?;
        self.conn
            .begin(
                &req,
                &[200, 201],
                POLLER_SUBNET_CREATE_OR_UPDATE,
                Some(FinalStateVia::AzureAsyncOperation),
            )
            .await
    }

    pub async fn begin_delete(
        &self,
        resource_group: &str,
        vnet: &str,
        subnet: &str,
    ) -> Result<Poller<NoContent>, ClientError> {
        debug!(resource_group, vnet, subnet, "deleting subnet");
        let req = self.request(Method::DELETE, resource_group, vnet, subnet)?;
        self.conn
            .begin(
                &req,
                &[200, 202, 204],
                POLLER_SUBNET_DELETE,
                Some(FinalStateVia::Location),
            )
            .await
    }

    pub fn resume_create_or_update(&self, token: &str) -> Result<Poller<Subnet>, ClientError> {
        self.conn.resume(POLLER_SUBNET_CREATE_OR_UPDATE, token)
    }

    pub fn resume_delete(&self, token: &str) -> Result<Poller<NoContent>, ClientError> {
        self.conn.resume(POLLER_SUBNET_DELETE, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_availability_field_names() {
        let result: IpAddressAvailabilityResult = serde_json::from_str(
            r#"{"available":false,"availableIPAddresses":["10.0.0.5","10.0.0.6"],"isPlatformReserved":false}"#,
        )
        .unwrap();
        assert!(!result.available);
        assert_eq!(result.available_ip_addresses, vec!["10.0.0.5", "10.0.0.6"]);
    }

    #[test]
    fn test_vnet_with_subnets() {
        let vnet: VirtualNetwork = serde_json::from_str(
            r#"{"name":"vnet1","location":"eastus","properties":{
                "addressSpace":{"addressPrefixes":["10.0.0.0/16"]},
                "subnets":[{"name":"default","properties":{"addressPrefix":"10.0.0.0/24"}}],
                "provisioningState":"Succeeded"}}"#,
        )
        .unwrap();
        let props = vnet.properties.unwrap();
        assert_eq!(props.address_space.unwrap().address_prefixes, vec!["10.0.0.0/16"]);
        let subnets = props.subnets.unwrap();
        assert_eq!(subnets[0].name.as_deref(), Some("default"));
        assert_eq!(
            subnets[0].properties.as_ref().unwrap().address_prefix.as_deref(),
            Some("10.0.0.0/24")
        );
    }

    #[test]
    fn test_subnet_path() {
        let client = SubnetsClient {
            conn: ArmConnection::new(
                Arc::new(crate::identity::ManagedIdentityCredential::default()),
                ArmClientOptions::default(),
            ),
            subscription_id: "sub".into(),
        };
        let req = client.request(Method::GET, "rg", "vnet1", "default").unwrap();
        assert_eq!(
            req.url().path(),
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet1/subnets/default"
        );
    }
}
