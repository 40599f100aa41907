//! Key Vault secret commands

use anyhow::{Context as _, Result, bail};
use azrest_client::keyvault::{SecretClient, SecretId, SetSecretParameters};
use colored::Colorize;
use serde::Serialize;

use super::common::Context;
use crate::cli::SecretCommands;

/// Check interval while waiting for Key Vault to finish a delete
const DELETE_POLL: std::time::Duration = std::time::Duration::from_secs(2);

#[derive(Serialize)]
struct SecretRow {
    name: String,
    enabled: Option<bool>,
    content_type: Option<String>,
    updated: Option<String>,
}

pub async fn run(ctx: &Context, vault: Option<String>, cmd: SecretCommands) -> Result<()> {
    let Some(vault_url) = vault.or_else(|| ctx.config.keyvault.as_ref().map(|k| k.url.clone())) else {
        bail!("No Key Vault configured. Pass --vault or run `azrest init --keyvault <url>`.");
    };
    let client = SecretClient::new(vault_url, ctx.credential()?, ctx.client_options())?;

    match cmd {
        SecretCommands::List { deleted: false } => {
            let items = client
                .list_secret_properties(None)?
                .collect_all()
                .await
                .context("failed to list secrets")?;
            let rows: Vec<SecretRow> = items
                .into_iter()
                .map(|item| {
                    let attributes = item.attributes.unwrap_or_default();
                    SecretRow {
                        name: secret_name(item.id.as_deref()),
                        enabled: attributes.enabled,
                        content_type: item.content_type,
                        updated: attributes.updated.map(|t| t.to_rfc3339()),
                    }
                })
                .collect();
            ctx.print_items(&rows)
        }
        SecretCommands::List { deleted: true } => {
            let items = client
                .list_deleted_secrets(None)?
                .collect_all()
                .await
                .context("failed to list deleted secrets")?;
            ctx.print_items(&items)
        }
        SecretCommands::Get { name, version } => {
            let secret = client
                .get_secret(&name, version.as_deref())
                .await
                .with_context(|| format!("failed to get secret '{name}'"))?;
            match secret.value {
                Some(value) => println!("{value}"),
                None => bail!("secret '{name}' has no value"),
            }
            Ok(())
        }
        SecretCommands::Set {
            name,
            value,
            content_type,
        } => {
            let params = SetSecretParameters {
                value,
                content_type,
                ..Default::default()
            };
            let secret = client
                .set_secret(&name, &params)
                .await
                .with_context(|| format!("failed to set secret '{name}'"))?;
            let version = secret
                .id
                .as_deref()
                .and_then(|id| SecretId::parse(id).ok())
                .and_then(|id| id.version)
                .unwrap_or_default();
            ctx.status(format!(
                "{} secret {} {}",
                "Set".green().bold(),
                name.cyan(),
                version.dimmed()
            ));
            Ok(())
        }
        SecretCommands::Delete {
            name,
            no_wait,
            purge,
        } => {
            let poller = client
                .begin_delete_secret(&name)
                .await
                .with_context(|| format!("failed to delete secret '{name}'"))?;
            if no_wait && !purge {
                ctx.status(format!("{} deletion of secret {}", "Started".bold(), name.cyan()));
                return Ok(());
            }
            let deleted = poller.poll_until_done(DELETE_POLL).await?;
            ctx.status(format!("{} secret {}", "Deleted".green().bold(), name.cyan()));
            if purge {
                client
                    .purge_deleted_secret(&name)
                    .await
                    .with_context(|| format!("failed to purge secret '{name}'"))?;
                ctx.status(format!("{} secret {}", "Purged".green().bold(), name.cyan()));
            } else if let Some(date) = deleted.scheduled_purge_date {
                ctx.status(format!("  Recoverable until {}", date.to_rfc3339()));
            }
            Ok(())
        }
    }
}

/// Secret name from its identifier URL.
fn secret_name(id: Option<&str>) -> String {
    id.and_then(|id| SecretId::parse(id).ok())
        .map(|id| id.name)
        .unwrap_or_default()
}
