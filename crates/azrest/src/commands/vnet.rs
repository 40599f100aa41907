//! Virtual network commands

use anyhow::{Context as _, Result};
use azrest_client::arm::network::{VirtualNetwork, VirtualNetworksClient};
use serde::Serialize;

use super::common::Context;
use crate::cli::VnetCommands;

#[derive(Serialize)]
struct VnetRow<'a> {
    name: &'a str,
    location: &'a str,
    address_space: String,
    subnets: usize,
}

impl<'a> From<&'a VirtualNetwork> for VnetRow<'a> {
    fn from(vnet: &'a VirtualNetwork) -> Self {
        let props = vnet.properties.as_ref();
        Self {
            name: vnet.name.as_deref().unwrap_or_default(),
            location: vnet.location.as_deref().unwrap_or_default(),
            address_space: props
                .and_then(|p| p.address_space.as_ref())
                .map(|a| a.address_prefixes.join(" "))
                .unwrap_or_default(),
            subnets: props
                .and_then(|p| p.subnets.as_ref())
                .map_or(0, Vec::len),
        }
    }
}

pub async fn run(ctx: &Context, cmd: VnetCommands) -> Result<()> {
    let client = VirtualNetworksClient::new(ctx.subscription()?, ctx.credential()?, ctx.arm_options())?;

    match cmd {
        VnetCommands::List { resource_group } => {
            let pager = match &resource_group {
                Some(rg) => client.list(rg)?,
                None => client.list_all()?,
            };
            let vnets = pager
                .collect_all()
                .await
                .context("failed to list virtual networks")?;
            let rows: Vec<VnetRow> = vnets.iter().map(VnetRow::from).collect();
            ctx.print_items(&rows)
        }
        VnetCommands::Show {
            resource_group,
            name,
        } => {
            let vnet = client
                .get(&resource_group, &name, None)
                .await
                .with_context(|| format!("failed to get virtual network '{name}'"))?;
            ctx.print_item(&vnet)
        }
        VnetCommands::Delete {
            resource_group,
            name,
            no_wait,
        } => {
            let poller = client
                .begin_delete(&resource_group, &name)
                .await
                .with_context(|| format!("failed to delete virtual network '{name}'"))?;
            ctx.finish(poller, &format!("delete of virtual network '{name}'"), no_wait)
                .await?;
            Ok(())
        }
    }
}
