//! Initialization command
//!
//! Picks a default subscription (interactively when there is more than one)
//! and records optional Key Vault and Azure OpenAI settings in the config file.

use anyhow::{Context, Result, bail};
use azrest_client::arm::ArmClientOptions;
use azrest_client::arm::resources::SubscriptionsClient;
use azrest_core::config::{Config, DEFAULT_OPENAI_API_VERSION, KeyVaultConfig, OpenAiConfig};
use colored::Colorize;
use inquire::Select;

use super::common::build_credential;

pub struct InitArgs {
    pub subscription: Option<String>,
    pub keyvault: Option<String>,
    pub openai_endpoint: Option<String>,
    pub openai_deployment: Option<String>,
}

pub async fn run(args: InitArgs) -> Result<()> {
    let mut config = Config::load_or_default().context("failed to load existing config")?;

    let subscription_id = match args.subscription {
        Some(id) => {
            println!("{} {}", "Using subscription:".bold(), id);
            id
        }
        None => select_subscription(&config).await?,
    };
    config.subscription = Some(subscription_id);

    if let Some(url) = args.keyvault {
        config.keyvault = Some(KeyVaultConfig { url });
    }

    match (args.openai_endpoint, args.openai_deployment) {
        (Some(endpoint), Some(deployment)) => {
            let previous = config.openai.take();
            config.openai = Some(OpenAiConfig {
                endpoint,
                deployment,
                api_version: previous
                    .as_ref()
                    .map(|o| o.api_version.clone())
                    .unwrap_or_else(|| DEFAULT_OPENAI_API_VERSION.to_string()),
                api_key_env: previous.and_then(|o| o.api_key_env),
            });
        }
        (None, None) => {}
        _ => bail!("--openai-endpoint and --openai-deployment must be given together"),
    }

    let config_path = config.save()?;

    println!(
        "\n{} Saved configuration to {}",
        "Done!".green().bold(),
        config_path.display().to_string().cyan()
    );
    if let Some(kv) = &config.keyvault {
        println!("  {} {}", "Key Vault:".bold(), kv.url);
    }
    if let Some(openai) = &config.openai {
        println!(
            "  {} {} ({})",
            "Azure OpenAI:".bold(),
            openai.endpoint,
            openai.deployment.dimmed()
        );
    }

    Ok(())
}

async fn select_subscription(config: &Config) -> Result<String> {
    let options = ArmClientOptions {
        cloud: config.cloud,
        ..Default::default()
    };
    let client = SubscriptionsClient::new(build_credential(config)?, options);
    let subs: Vec<_> = client
        .list()?
        .collect_all()
        .await
        .context("failed to list subscriptions")?
        .into_iter()
        .filter(|s| s.state.eq_ignore_ascii_case("enabled"))
        .collect();

    match subs.len() {
        0 => bail!("No enabled Azure subscriptions found for this account."),
        1 => {
            let sub = &subs[0];
            println!(
                "{} {} ({})",
                "Using subscription:".bold(),
                sub.display_name.green(),
                sub.subscription_id.dimmed()
            );
            Ok(sub.subscription_id.clone())
        }
        _ => {
            let labels: Vec<String> = subs
                .iter()
                .map(|s| format!("{} ({})", s.display_name, s.subscription_id))
                .collect();
            let choice = Select::new("Select a subscription", labels)
                .raw_prompt()
                .context("subscription selection cancelled")?;
            Ok(subs[choice.index].subscription_id.clone())
        }
    }
}
