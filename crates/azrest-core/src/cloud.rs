//! Azure cloud endpoints
//!
//! Each sovereign cloud has its own Entra ID authority host and Resource
//! Manager endpoint. Clients pick these up from the configured [`Cloud`].

use serde::{Deserialize, Serialize};

/// An Azure cloud environment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cloud {
    #[default]
    #[serde(rename = "public")]
    AzurePublic,
    #[serde(rename = "china")]
    AzureChina,
    #[serde(rename = "usgov")]
    AzureGovernment,
}

impl Cloud {
    /// Entra ID authority host used for token requests.
    pub fn authority_host(&self) -> &'static str {
        match self {
            Cloud::AzurePublic => "https://login.microsoftonline.com",
            Cloud::AzureChina => "https://login.chinacloudapi.cn",
            Cloud::AzureGovernment => "https://login.microsoftonline.us",
        }
    }

    /// Base URL of Azure Resource Manager.
    pub fn resource_manager_endpoint(&self) -> &'static str {
        match self {
            Cloud::AzurePublic => "https://management.azure.com",
            Cloud::AzureChina => "https://management.chinacloudapi.cn",
            Cloud::AzureGovernment => "https://management.usgovcloudapi.net",
        }
    }

    /// Token audience for Azure Resource Manager.
    pub fn resource_manager_audience(&self) -> &'static str {
        match self {
            Cloud::AzurePublic => "https://management.core.windows.net/",
            Cloud::AzureChina => "https://management.core.chinacloudapi.cn",
            Cloud::AzureGovernment => "https://management.core.usgovcloudapi.net",
        }
    }
}

impl std::fmt::Display for Cloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cloud::AzurePublic => write!(f, "public"),
            Cloud::AzureChina => write!(f, "china"),
            Cloud::AzureGovernment => write!(f, "usgov"),
        }
    }
}
