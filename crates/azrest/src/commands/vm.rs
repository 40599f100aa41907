//! Virtual machine commands

use anyhow::{Context as _, Result};
use azrest_client::arm::compute::{VirtualMachine, VirtualMachinesClient};
use azrest_core::resource_id::ResourceId;
use serde::Serialize;

use super::common::Context;
use crate::cli::{VmAction, VmCommands};

#[derive(Serialize)]
struct VmRow<'a> {
    name: &'a str,
    resource_group: String,
    location: &'a str,
    size: &'a str,
    state: String,
}

impl<'a> From<&'a VirtualMachine> for VmRow<'a> {
    fn from(vm: &'a VirtualMachine) -> Self {
        let props = vm.properties.as_ref();
        Self {
            name: vm.name.as_deref().unwrap_or_default(),
            resource_group: vm
                .id
                .as_deref()
                .and_then(|id| ResourceId::parse(id).ok())
                .and_then(|id| id.resource_group().map(String::from))
                .unwrap_or_default(),
            location: &vm.location,
            size: props
                .and_then(|p| p.hardware_profile.as_ref())
                .and_then(|h| h.vm_size.as_deref())
                .unwrap_or_default(),
            state: props
                .and_then(|p| p.provisioning_state.as_ref())
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

pub async fn run(ctx: &Context, cmd: VmCommands) -> Result<()> {
    let client = VirtualMachinesClient::new(ctx.subscription()?, ctx.credential()?, ctx.arm_options())?;

    match cmd {
        VmCommands::List { resource_group } => {
            let pager = match &resource_group {
                Some(rg) => client.list(rg)?,
                None => client.list_all()?,
            };
            let vms = pager
                .collect_all()
                .await
                .context("failed to list virtual machines")?;
            let rows: Vec<VmRow> = vms.iter().map(VmRow::from).collect();
            ctx.print_items(&rows)
        }
        VmCommands::Show {
            resource_group,
            name,
            instance_view,
        } => {
            let expand = instance_view.then_some("instanceView");
            let vm = client
                .get(&resource_group, &name, expand)
                .await
                .with_context(|| format!("failed to get virtual machine '{name}'"))?;
            if let Some(state) = vm
                .properties
                .as_ref()
                .and_then(|p| p.instance_view.as_ref())
                .and_then(|v| v.power_state())
            {
                ctx.status(format!("Power state: {state}"));
            }
            ctx.print_item(&vm)
        }
        VmCommands::Start(action) => {
            let poller = client.begin_start(&action.resource_group, &action.name).await?;
            finish(ctx, poller, "start", &action).await
        }
        VmCommands::Stop {
            action,
            skip_shutdown,
        } => {
            let poller = client
                .begin_power_off(&action.resource_group, &action.name, skip_shutdown)
                .await?;
            finish(ctx, poller, "power off", &action).await
        }
        VmCommands::Restart(action) => {
            let poller = client.begin_restart(&action.resource_group, &action.name).await?;
            finish(ctx, poller, "restart", &action).await
        }
        VmCommands::Deallocate(action) => {
            let poller = client
                .begin_deallocate(&action.resource_group, &action.name)
                .await?;
            finish(ctx, poller, "deallocate", &action).await
        }
        VmCommands::Delete { action, force } => {
            let poller = client
                .begin_delete(&action.resource_group, &action.name, force)
                .await?;
            finish(ctx, poller, "delete", &action).await
        }
    }
}

async fn finish(
    ctx: &Context,
    poller: azrest_client::poller::Poller<azrest_client::poller::NoContent>,
    verb: &str,
    action: &VmAction,
) -> Result<()> {
    ctx.finish(poller, &format!("{verb} of VM '{}'", action.name), action.no_wait)
        .await?;
    Ok(())
}
