//! Resource group commands

use anyhow::{Context as _, Result};
use azrest_client::arm::resources::{ResourceGroup, ResourceGroupsClient};
use colored::Colorize;
use serde::Serialize;

use super::common::Context;
use crate::cli::GroupCommands;

/// One line of `group list`
#[derive(Serialize)]
struct GroupRow<'a> {
    name: &'a str,
    location: &'a str,
    state: String,
}

impl<'a> From<&'a ResourceGroup> for GroupRow<'a> {
    fn from(group: &'a ResourceGroup) -> Self {
        Self {
            name: group.name.as_deref().unwrap_or_default(),
            location: &group.location,
            state: group
                .properties
                .as_ref()
                .and_then(|p| p.provisioning_state.as_ref())
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

pub async fn run(ctx: &Context, cmd: GroupCommands) -> Result<()> {
    let client = ResourceGroupsClient::new(ctx.subscription()?, ctx.credential()?, ctx.arm_options())?;

    match cmd {
        GroupCommands::List { filter } => {
            let groups = client
                .list(filter.as_deref(), None)?
                .collect_all()
                .await
                .context("failed to list resource groups")?;
            let rows: Vec<GroupRow> = groups.iter().map(GroupRow::from).collect();
            ctx.print_items(&rows)
        }
        GroupCommands::Show { name } => {
            let group = client
                .get(&name)
                .await
                .with_context(|| format!("failed to get resource group '{name}'"))?;
            ctx.print_item(&group)
        }
        GroupCommands::Create { name, location } => {
            let existed = client.check_existence(&name).await?;
            let group = ResourceGroup {
                location,
                ..Default::default()
            };
            let group = client
                .create_or_update(&name, &group)
                .await
                .with_context(|| format!("failed to create resource group '{name}'"))?;
            let verb = if existed { "Updated" } else { "Created" };
            ctx.status(format!("{} resource group {}", verb.green().bold(), name.cyan()));
            ctx.print_item(&group)
        }
        GroupCommands::Delete { name, no_wait } => {
            let poller = client
                .begin_delete(&name)
                .await
                .with_context(|| format!("failed to delete resource group '{name}'"))?;
            ctx.finish(poller, &format!("delete of resource group '{name}'"), no_wait)
                .await?;
            Ok(())
        }
    }
}
