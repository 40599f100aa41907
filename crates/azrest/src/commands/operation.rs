//! Resuming long-running operations from a resume token

use anyhow::{Result, bail};
use azrest_client::arm::{compute, network, reservations, resources};
use azrest_client::poller::{Poller, peek_poller_type};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::common::Context;
use crate::cli::OperationCommands;

pub async fn run(ctx: &Context, cmd: OperationCommands) -> Result<()> {
    match cmd {
        OperationCommands::Wait { token } => wait(ctx, token.trim()).await,
    }
}

async fn wait(ctx: &Context, token: &str) -> Result<()> {
    let poller_type = peek_poller_type(token)?;
    debug!(poller_type, "resuming operation");
    let credential = ctx.credential()?;

    let Some((client_name, _)) = poller_type.split_once('.') else {
        bail!("unrecognized operation type '{poller_type}'");
    };
    match client_name {
        "ResourceGroupsClient" => {
            let groups = resources::ResourceGroupsClient::new(
                ctx.subscription()?,
                credential,
                ctx.arm_options(),
            )?;
            complete(ctx, groups.resume_delete(token)?, &poller_type).await
        }
        "VirtualMachinesClient" => {
            let vms =
                compute::VirtualMachinesClient::new(ctx.subscription()?, credential, ctx.arm_options())?;
            match poller_type.as_str() {
                compute::POLLER_CREATE_OR_UPDATE => {
                    complete(ctx, vms.resume_create_or_update(token)?, &poller_type).await
                }
                compute::POLLER_DELETE => complete(ctx, vms.resume_delete(token)?, &poller_type).await,
                compute::POLLER_START => complete(ctx, vms.resume_start(token)?, &poller_type).await,
                compute::POLLER_POWER_OFF => {
                    complete(ctx, vms.resume_power_off(token)?, &poller_type).await
                }
                compute::POLLER_RESTART => complete(ctx, vms.resume_restart(token)?, &poller_type).await,
                compute::POLLER_DEALLOCATE => {
                    complete(ctx, vms.resume_deallocate(token)?, &poller_type).await
                }
                _ => bail!("unrecognized operation type '{poller_type}'"),
            }
        }
        "VirtualNetworksClient" => {
            let vnets =
                network::VirtualNetworksClient::new(ctx.subscription()?, credential, ctx.arm_options())?;
            match poller_type.as_str() {
                network::POLLER_VNET_CREATE_OR_UPDATE => {
                    complete(ctx, vnets.resume_create_or_update(token)?, &poller_type).await
                }
                _ => complete(ctx, vnets.resume_delete(token)?, &poller_type).await,
            }
        }
        "SubnetsClient" => {
            let subnets =
                network::SubnetsClient::new(ctx.subscription()?, credential, ctx.arm_options())?;
            match poller_type.as_str() {
                network::POLLER_SUBNET_CREATE_OR_UPDATE => {
                    complete(ctx, subnets.resume_create_or_update(token)?, &poller_type).await
                }
                _ => complete(ctx, subnets.resume_delete(token)?, &poller_type).await,
            }
        }
        "ReservationClient" => {
            let orders = reservations::ReservationClient::new(credential, ctx.arm_options());
            match poller_type.as_str() {
                reservations::POLLER_UPDATE => {
                    complete(ctx, orders.resume_update(token)?, &poller_type).await
                }
                reservations::POLLER_SPLIT => {
                    complete(ctx, orders.resume_split(token)?, &poller_type).await
                }
                _ => complete(ctx, orders.resume_merge(token)?, &poller_type).await,
            }
        }
        _ => bail!("unrecognized operation type '{poller_type}'"),
    }
}

/// Wait for a resumed operation and print its result, if it has one.
async fn complete<T: DeserializeOwned + Serialize>(
    ctx: &Context,
    poller: Poller<T>,
    poller_type: &str,
) -> Result<()> {
    if let Some(result) = ctx.finish(poller, poller_type, false).await? {
        if !serde_json::to_value(&result)?.is_null() {
            ctx.print_item(&result)?;
        }
    }
    Ok(())
}
