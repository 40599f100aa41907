//! Azure authentication commands

use anyhow::Result;
use azrest_client::auth::{AzCli, TokenCredential};
use azrest_core::config::Config;
use colored::Colorize;

use super::common::build_credential;
use crate::cli::AuthCommands;

pub async fn run(cmd: AuthCommands) -> Result<()> {
    match cmd {
        AuthCommands::Status => status().await,
        AuthCommands::Login => login().await,
        AuthCommands::Logout => logout().await,
    }
}

async fn status() -> Result<()> {
    let status = AzCli::check_status().await?;

    if status.logged_in {
        println!("{}", "Azure CLI: logged in".green().bold());
        if let Some(user) = &status.user {
            println!("  {} {}", "User:".bold(), user);
        }
        if let Some(sub) = &status.subscription_name {
            println!("  {} {}", "Subscription:".bold(), sub);
        }
        if let Some(id) = &status.subscription_id {
            println!("  {} {}", "Subscription ID:".bold(), id.dimmed());
        }
        if let Some(tenant) = &status.tenant_id {
            println!("  {} {}", "Tenant:".bold(), tenant.dimmed());
        }
    } else {
        println!("{}", "Azure CLI: not logged in".red().bold());
        println!("\n  Run {} to authenticate.", "azrest auth login".cyan().bold());
    }

    // Try the credential the other commands will actually use
    let config = Config::load_or_default()?;
    let scope = format!("{}/.default", config.cloud.resource_manager_audience());
    print!(
        "\n  {} ",
        format!("Resource Manager token ({:?} credential):", config.credential).bold()
    );
    match build_credential(&config)?.get_token(&[scope.as_str()]).await {
        Ok(token) => println!("{} (expires {})", "OK".green(), token.expires_on.to_rfc3339()),
        Err(e) => println!("{} ({})", "FAILED".red(), e),
    }

    Ok(())
}

async fn login() -> Result<()> {
    println!("Opening browser for Azure login...\n");
    AzCli::login().await?;

    let status = AzCli::check_status().await?;
    if status.logged_in {
        println!("\n{}", "Successfully logged in!".green().bold());
        if let Some(user) = &status.user {
            println!("  {} {}", "User:".bold(), user);
        }
    }

    Ok(())
}

async fn logout() -> Result<()> {
    AzCli::logout().await?;
    println!("{}", "Logged out of Azure CLI.".green());
    Ok(())
}
