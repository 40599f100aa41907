//! Reservation commands

use anyhow::{Context as _, Result};
use azrest_client::arm::reservations::{
    ReservationClient, ReservationOrderClient, ReservationOrderResponse, ReservationResponse,
};
use serde::Serialize;

use super::common::Context;
use crate::cli::ReservationCommands;

#[derive(Serialize)]
struct OrderRow<'a> {
    order_id: &'a str,
    display_name: &'a str,
    term: &'a str,
    quantity: Option<i32>,
    expires: &'a str,
}

impl<'a> From<&'a ReservationOrderResponse> for OrderRow<'a> {
    fn from(order: &'a ReservationOrderResponse) -> Self {
        let props = order.properties.as_ref();
        Self {
            order_id: order.name.as_deref().unwrap_or_default(),
            display_name: props.and_then(|p| p.display_name.as_deref()).unwrap_or_default(),
            term: props.and_then(|p| p.term.as_deref()).unwrap_or_default(),
            quantity: props.and_then(|p| p.original_quantity),
            expires: props.and_then(|p| p.expiry_date_time.as_deref()).unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct ReservationRow<'a> {
    name: &'a str,
    sku: &'a str,
    quantity: Option<i32>,
    scope: &'a str,
    state: &'a str,
}

impl<'a> From<&'a ReservationResponse> for ReservationRow<'a> {
    fn from(res: &'a ReservationResponse) -> Self {
        let props = res.properties.as_ref();
        Self {
            // Reservation names come back as `{orderId}/{reservationId}`
            name: res
                .name
                .as_deref()
                .map(|n| n.rsplit('/').next().unwrap_or(n))
                .unwrap_or_default(),
            sku: res.sku.as_ref().and_then(|s| s.name.as_deref()).unwrap_or_default(),
            quantity: props.and_then(|p| p.quantity),
            scope: props.and_then(|p| p.applied_scope_type.as_deref()).unwrap_or_default(),
            state: props
                .and_then(|p| p.display_provisioning_state.as_deref())
                .unwrap_or_default(),
        }
    }
}

pub async fn run(ctx: &Context, cmd: ReservationCommands) -> Result<()> {
    let credential = ctx.credential()?;

    match cmd {
        ReservationCommands::Orders => {
            let orders = ReservationOrderClient::new(credential, ctx.arm_options())
                .list()?
                .collect_all()
                .await
                .context("failed to list reservation orders")?;
            let rows: Vec<OrderRow> = orders.iter().map(OrderRow::from).collect();
            ctx.print_items(&rows)
        }
        ReservationCommands::List { order_id } => {
            let reservations = ReservationClient::new(credential, ctx.arm_options())
                .list(&order_id)?
                .collect_all()
                .await
                .with_context(|| format!("failed to list reservations in order '{order_id}'"))?;
            let rows: Vec<ReservationRow> = reservations.iter().map(ReservationRow::from).collect();
            ctx.print_items(&rows)
        }
        ReservationCommands::Show {
            order_id,
            reservation_id,
        } => {
            let reservation = ReservationClient::new(credential, ctx.arm_options())
                .get(&order_id, &reservation_id, None)
                .await
                .with_context(|| format!("failed to get reservation '{reservation_id}'"))?;
            ctx.print_item(&reservation)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reservation_row_strips_order_prefix() {
        let res: ReservationResponse = serde_json::from_value(json!({
            "name": "order-1/res-2",
            "sku": {"name": "Standard_D2s_v3"},
            "properties": {"quantity": 2, "appliedScopeType": "Shared", "displayProvisioningState": "Succeeded"}
        }))
        .unwrap();
        let row = ReservationRow::from(&res);
        assert_eq!(row.name, "res-2");
        assert_eq!(row.sku, "Standard_D2s_v3");
        assert_eq!(row.quantity, Some(2));
    }
}
