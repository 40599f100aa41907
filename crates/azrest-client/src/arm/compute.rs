//! Virtual machines

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ArmClientOptions, ArmConnection, ProvisioningState, Tags, require};
use crate::auth::TokenCredential;
use crate::error::ClientError;
use crate::pager::{ArmList, Pager};
use crate::poller::{NoContent, Poller};
use crate::request::{Request, expand_path};

pub const COMPUTE_API_VERSION: &str = "2023-09-01";

const VM_PATH: &str = "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Compute/virtualMachines/{vmName}";

pub const POLLER_CREATE_OR_UPDATE: &str = "VirtualMachinesClient.CreateOrUpdate";
pub const POLLER_DELETE: &str = "VirtualMachinesClient.Delete";
pub const POLLER_START: &str = "VirtualMachinesClient.Start";
pub const POLLER_POWER_OFF: &str = "VirtualMachinesClient.PowerOff";
pub const POLLER_RESTART: &str = "VirtualMachinesClient.Restart";
pub const POLLER_DEALLOCATE: &str = "VirtualMachinesClient.Deallocate";

/// A virtual machine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<VirtualMachineProperties>,
}

/// VM properties. Profiles that callers rarely inspect stay as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_profile: Option<HardwareProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_profile: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_profile: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics_profile: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_view: Option<VirtualMachineInstanceView>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_size: Option<String>,
}

/// Runtime state of a VM
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineInstanceView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    #[serde(default)]
    pub statuses: Vec<InstanceViewStatus>,
}

impl VirtualMachineInstanceView {
    /// The `PowerState/...` status, e.g. `running` or `deallocated`.
    pub fn power_state(&self) -> Option<&str> {
        self.statuses
            .iter()
            .find_map(|s| s.code.as_deref()?.strip_prefix("PowerState/"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceViewStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

/// Manages virtual machines in one subscription.
#[derive(Clone)]
pub struct VirtualMachinesClient {
    conn: ArmConnection,
    subscription_id: String,
}

impl VirtualMachinesClient {
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
        vm_name: &str,
        suffix: &str,
    ) -> Result<Request, ClientError> {
        let path = expand_path(
            VM_PATH,
            &[
                ("subscriptionId", &self.subscription_id),
                ("resourceGroupName", resource_group),
                ("vmName", vm_name),
            ],
        )?;
        self.conn
            .request(method, &format!("{path}{suffix}"), COMPUTE_API_VERSION)
    }

    /// Get a VM. `expand` may be `instanceView` or `userData`.
    pub async fn get(
        &self,
        resource_group: &str,
        vm_name: &str,
        expand: Option<&str>,
    ) -> Result<VirtualMachine, ClientError> {
        let req = self
            .request(Method::GET, resource_group, vm_name, "")?
            .with_optional_query("$expand", expand);
        self.conn.send(&req, &[200]).await?.json()
    }

    pub async fn instance_view(
        &self,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<VirtualMachineInstanceView, ClientError> {
        let req = self.request(Method::GET, resource_group, vm_name, "/instanceView")?;
        self.conn.send(&req, &[200]).await?.json()
    }

    /// List the VMs in a resource group.
    pub fn list(&self, resource_group: &str) -> Result<Pager<ArmList<VirtualMachine>>, ClientError> {
        let path = expand_path(
            "/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}/providers/Microsoft.Compute/virtualMachines",
            &[
                ("subscriptionId", &self.subscription_id),
                ("resourceGroupName", resource_group),
            ],
        )?;
        let req = self.conn.request(Method::GET, &path, COMPUTE_API_VERSION)?;
        Ok(self.conn.pager(req))
    }

    /// List every VM in the subscription.
    pub fn list_all(&self) -> Result<Pager<ArmList<VirtualMachine>>, ClientError> {
        let path = expand_path(
            "/subscriptions/{subscriptionId}/providers/Microsoft.Compute/virtualMachines",
            &[("subscriptionId", &self.subscription_id)],
        )?;
        let req = self.conn.request(Method::GET, &path, COMPUTE_API_VERSION)?;
        Ok(self.conn.pager(req))
    }

    pub async fn begin_create_or_update(
        &self,
        resource_group: &str,
        vm_name: &str,
        vm: &VirtualMachine,
    ) -> Result<Poller<VirtualMachine>, ClientError> {
        debug!(resource_group, vm_name, "creating or updating virtual machine");
        let req = self
            .request(Method::PUT, resource_group, vm_name, "")?
            .with_json(vm)?;
        self.conn
            .begin(&req, &[200, 201], POLLER_CREATE_OR_UPDATE, None)
            .await
    }

    /// Delete a VM. `force` skips the graceful shutdown.
    pub async fn begin_delete(
        &self,
        resource_group: &str,
        vm_name: &str,
        force: bool,
    ) -> Result<Poller<NoContent>, ClientError> {
        debug!(resource_group, vm_name, force, "deleting virtual machine");
        let req = self
            .request(Method::DELETE, resource_group, vm_name, "")?
            .with_optional_query("forceDeletion", force.then_some(true));
        self.conn
            .begin(&req, &[200, 202, 204], POLLER_DELETE, None)
            .await
    }

    pub async fn begin_start(
        &self,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<Poller<NoContent>, ClientError> {
        self.action(resource_group, vm_name, "start", POLLER_START, None)
            .await
    }

    /// Power off without releasing compute resources.
    pub async fn begin_power_off(
        &self,
        resource_group: &str,
        vm_name: &str,
        skip_shutdown: bool,
    ) -> Result<Poller<NoContent>, ClientError> {
        self.action(
            resource_group,
            vm_name,
            "powerOff",
            POLLER_POWER_OFF,
            skip_shutdown.then_some(("skipShutdown", "true")),
        )
        .await
    }

    pub async fn begin_restart(
        &self,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<Poller<NoContent>, ClientError> {
        self.action(resource_group, vm_name, "restart", POLLER_RESTART, None)
            .await
    }

    /// Shut down and release compute resources.
    pub async fn begin_deallocate(
        &self,
        resource_group: &str,
        vm_name: &str,
    ) -> Result<Poller<NoContent>, ClientError> {
        self.action(resource_group, vm_name, "deallocate", POLLER_DEALLOCATE, None)
            .await
    }

    async fn action(
        &self,
        resource_group: &str,
        vm_name: &str,
        action: &str,
        poller_type: &str,
        query: Option<(&str, &str)>,
    ) -> Result<Poller<NoContent>, ClientError> {
        debug!(resource_group, vm_name, action, "virtual machine action");
        let mut req = self.request(Method::POST, resource_group, vm_name, &format!("/{action}"))?;
        if let Some((key, value)) = query {
            req.set_query(key, value);
        }
        self.conn.begin(&req, &[200, 202], poller_type, None).await
    }

    pub fn resume_create_or_update(&self, token: &str) -> Result<Poller<VirtualMachine>, ClientError> {
        self.conn.resume(POLLER_CREATE_OR_UPDATE, token)
    }

    pub fn resume_delete(&self, token: &str) -> Result<Poller<NoContent>, ClientError> {
        self.conn.resume(POLLER_DELETE, token)
    }

    pub fn resume_start(&self, token: &str) -> Result<Poller<NoContent>, ClientError> {
        self.conn.resume(POLLER_START, token)
    }

    pub fn resume_power_off(&self, token: &str) -> Result<Poller<NoContent>, ClientError> {
        self.conn.resume(POLLER_POWER_OFF, token)
    }

    pub fn resume_restart(&self, token: &str) -> Result<Poller<NoContent>, ClientError> {
        self.conn.resume(POLLER_RESTART, token)
    }

    pub fn resume_deallocate(&self, token: &str) -> Result<Poller<NoContent>, ClientError> {
        self.conn.resume(POLLER_DEALLOCATE, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_state() {
        let view: VirtualMachineInstanceView = serde_json::from_str(
            r#"{"statuses":[
                {"code":"ProvisioningState/succeeded","level":"Info","displayStatus":"Provisioning succeeded"},
                {"code":"PowerState/deallocated","level":"Info","displayStatus":"VM deallocated"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(view.power_state(), Some("deallocated"));
        assert!(VirtualMachineInstanceView::default().power_state().is_none());
    }

    #[test]
    fn test_vm_deserialize_keeps_raw_profiles() {
        let vm: VirtualMachine = serde_json::from_str(
            r#"{"name":"vm1","location":"westeurope","properties":{
                "hardwareProfile":{"vmSize":"Standard_B2s"},
                "storageProfile":{"osDisk":{"osType":"Linux"}},
                "provisioningState":"Succeeded"}}"#,
        )
        .unwrap();
        let props = vm.properties.unwrap();
        assert_eq!(
            props.hardware_profile.unwrap().vm_size.as_deref(),
            Some("Standard_B2s")
        );
        assert_eq!(props.storage_profile.unwrap()["osDisk"]["osType"], "Linux");
        assert_eq!(props.provisioning_state, Some(ProvisioningState::Succeeded));
    }
}
