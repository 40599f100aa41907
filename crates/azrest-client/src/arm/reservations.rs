//! Reservation orders and reservations (Microsoft.Capacity)
//!
//! Reservations live at tenant scope, so these clients take no subscription.

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{ArmClientOptions, ArmConnection, ProvisioningState};
use crate::auth::TokenCredential;
use crate::error::ClientError;
use crate::pager::{ArmList, Pager};
use crate::poller::{FinalStateVia, Poller};
use crate::request::{Request, expand_path};

pub const RESERVATIONS_API_VERSION: &str = "2022-11-01";

const ORDER_PATH: &str = "/providers/Microsoft.Capacity/reservationOrders/{reservationOrderId}";

pub const POLLER_UPDATE: &str = "ReservationClient.Update";
pub const POLLER_SPLIT: &str = "ReservationClient.Split";
pub const POLLER_MERGE: &str = "ReservationClient.Merge";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkuName {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A reservation order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationOrderResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ReservationOrderProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationOrderProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_quantity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservations: Option<Vec<ReservationResponse>>,
}

/// A reservation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<SkuName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ReservationProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_scope_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_flexibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renew: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<ProvisioningState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_provisioning_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization: Option<Value>,
}

/// Fields that can be changed with [`ReservationClient::begin_update`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PatchProperties>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_scope_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_scopes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_flexibility: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renew: Option<bool>,
}

/// Split one reservation into several with the given quantities
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRequest {
    pub properties: SplitProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitProperties {
    /// Fully qualified ID of the reservation being split
    pub reservation_id: String,
    pub quantities: Vec<i32>,
}

/// Merge reservations of the same order into one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub properties: MergeProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeProperties {
    /// Fully qualified IDs of the reservations being merged
    pub sources: Vec<String>,
}

fn order_path(order_id: &str, suffix: &str) -> Result<String, ClientError> {
    let path = expand_path(ORDER_PATH, &[("reservationOrderId", order_id)])?;
    Ok(format!("{path}{suffix}"))
}

/// Reads reservation orders.
#[derive(Clone)]
pub struct ReservationOrderClient {
    conn: ArmConnection,
}

impl ReservationOrderClient {
    pub fn new(credential: Arc<dyn TokenCredential>, options: ArmClientOptions) -> Self {
        Self {
            conn: ArmConnection::new(credential, options),
        }
    }

    /// Get a reservation order. `expand` may be `schedule`.
    pub async fn get(
        &self,
        order_id: &str,
        expand: Option<&str>,
    ) -> Result<ReservationOrderResponse, ClientError> {
        let req = self
            .conn
            .request(Method::GET, &order_path(order_id, "")?, RESERVATIONS_API_VERSION)?
            .with_optional_query("$expand", expand);
        self.conn.send(&req, &[200]).await?.json()
    }

    pub fn list(&self) -> Result<Pager<ArmList<ReservationOrderResponse>>, ClientError> {
        let req = self.conn.request(
            Method::GET,
            "/providers/Microsoft.Capacity/reservationOrders",
            RESERVATIONS_API_VERSION,
        )?;
        Ok(self.conn.pager(req))
    }
}

/// Reads and changes reservations.
#[derive(Clone)]
pub struct ReservationClient {
    conn: ArmConnection,
}

impl ReservationClient {
    pub fn new(credential: Arc<dyn TokenCredential>, options: ArmClientOptions) -> Self {
        Self {
            conn: ArmConnection::new(credential, options),
        }
    }

    fn request(
        &self,
        method: Method,
        order_id: &str,
        reservation_id: &str,
        suffix: &str,
    ) -> Result<Request, ClientError> {
        let path = expand_path(
            &format!("{ORDER_PATH}/reservations/{{reservationId}}"),
            &[
                ("reservationOrderId", order_id),
                ("reservationId", reservation_id),
            ],
        )?;
        self.conn.request(
            method,
            &format!("{path}{suffix}"),
            RESERVATIONS_API_VERSION,
        )
    }

    /// Get a reservation. `expand` may be `renewProperties`.
    pub async fn get(
        &self,
        order_id: &str,
        reservation_id: &str,
        expand: Option<&str>,
    ) -> Result<ReservationResponse, ClientError> {
        let req = self
            .request(Method::GET, order_id, reservation_id, "")?
            .with_optional_query("$expand", expand);
        self.conn.send(&req, &[200]).await?.json()
    }

    /// List the reservations in an order.
    pub fn list(&self, order_id: &str) -> Result<Pager<ArmList<ReservationResponse>>, ClientError> {
        let req = self.conn.request(
            Method::GET,
            &order_path(order_id, "/reservations")?,
            RESERVATIONS_API_VERSION,
        )?;
        Ok(self.conn.pager(req))
    }

    /// List every revision of a reservation.
    pub fn list_revisions(
        &self,
        order_id: &str,
        reservation_id: &str,
    ) -> Result<Pager<ArmList<ReservationResponse>>, ClientError> {
        let req = self.request(Method::GET, order_id, reservation_id, "/revisions")?;
        Ok(self.conn.pager(req))
    }

    pub async fn begin_update(
        &self,
        order_id: &str,
        reservation_id: &str,
        patch: &Patch,
    ) -> Result<Poller<ReservationResponse>, ClientError> {
        debug!(order_id, reservation_id, "updating reservation");
        let req = self
            .request(Method::PATCH, order_id, reservation_id, "")?
            .with_json(patch)?;
        self.conn.begin(&req, &[200, 202], POLLER_UPDATE, None).await
    }

    pub fn resume_update(&self, token: &str) -> Result<Poller<ReservationResponse>, ClientError> {
        self.conn.resume(POLLER_UPDATE, token)
    }

    /// Archive a reservation in a terminal state.
    pub async fn archive(&self, order_id: &str, reservation_id: &str) -> Result<(), ClientError> {
        let req = self.request(Method::POST, order_id, reservation_id, "/archive")?;
        self.conn.send(&req, &[200]).await?;
        Ok(())
    }

    /// Restore an archived reservation.
    pub async fn unarchive(&self, order_id: &str, reservation_id: &str) -> Result<(), ClientError> {
        let req = self.request(Method::POST, order_id, reservation_id, "/unarchive")?;
        self.conn.send(&req, &[200]).await?;
        Ok(())
    }

    pub async fn begin_split(
        &self,
        order_id: &str,
        body: &SplitRequest,
    ) -> Result<Poller<Vec<ReservationResponse>>, ClientError> {
        debug!(order_id, quantities = ?body.properties.quantities, "splitting reservation");
        let req = self
            .conn
            .request(Method::POST, &order_path(order_id, "/split")?, RESERVATIONS_API_VERSION)?
            .with_json(body)?;
        self.conn
            .begin(&req, &[200, 202], POLLER_SPLIT, Some(FinalStateVia::Location))
            .await
    }

    pub fn resume_split(&self, token: &str) -> Result<Poller<Vec<ReservationResponse>>, ClientError> {
        self.conn.resume(POLLER_SPLIT, token)
    }

    pub async fn begin_merge(
        &self,
        order_id: &str,
        body: &MergeRequest,
    ) -> Result<Poller<Vec<ReservationResponse>>, ClientError> {
        debug!(order_id, sources = body.properties.sources.len(), "merging reservations");
        let req = self
            .conn
            .request(Method::POST, &order_path(order_id, "/merge")?, RESERVATIONS_API_VERSION)?
            .with_json(body)?;
        self.conn
            .begin(&req, &[200, 202], POLLER_MERGE, Some(FinalStateVia::Location))
            .await
    }

    pub fn resume_merge(&self, token: &str) -> Result<Poller<Vec<ReservationResponse>>, ClientError> {
        self.conn.resume(POLLER_MERGE, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_path() {
        assert_eq!(
            order_path("order-1", "/split").unwrap(),
            "/providers/Microsoft.Capacity/reservationOrders/order-1/split"
        );
        assert!(order_path("", "").is_err());
    }

    #[test]
    fn test_split_request_shape() {
        let body = SplitRequest {
            properties: SplitProperties {
                reservation_id: "/providers/Microsoft.Capacity/reservationOrders/o/reservations/r".into(),
                quantities: vec![1, 2],
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["properties"]["quantities"], serde_json::json!([1, 2]));
        assert!(json["properties"]["reservationId"].is_string());
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = Patch {
            properties: Some(PatchProperties {
                renew: Some(true),
                ..Default::default()
            }),
        };
        assert_eq!(
            serde_json::to_string(&patch).unwrap(),
            r#"{"properties":{"renew":true}}"#
        );
    }
}
