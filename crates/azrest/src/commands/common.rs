//! Shared helpers for CLI commands
//!
//! Loads the config once per invocation and turns it into credentials and
//! client options. Also owns result printing and the wait-or-print-token
//! handling of long-running operations.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use azrest_client::arm::ArmClientOptions;
use azrest_client::auth::{AzureCliCredential, TokenCredential};
use azrest_client::identity::{DefaultAzureCredential, EnvironmentCredential, ManagedIdentityCredential};
use azrest_client::pipeline::{ClientOptions, RetryOptions};
use azrest_client::poller::Poller;
use azrest_core::config::{Config, CredentialKind};
use colored::Colorize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::output::{self, OutputFormat};

/// How often long-running operations are polled when the service gives no hint
const POLL_FREQUENCY: Duration = Duration::from_secs(5);

/// Everything a command needs from the global flags and the config file.
pub struct Context {
    pub config: Config,
    subscription: Option<String>,
    pub output: OutputFormat,
    pub quiet: bool,
}

impl Context {
    pub fn load(subscription: Option<String>, output: OutputFormat, quiet: bool) -> Result<Self> {
        let config = Config::load_or_default().context("failed to load azrest config")?;
        debug!(cloud = %config.cloud, credential = ?config.credential, "loaded config");
        Ok(Self {
            config,
            subscription,
            output,
            quiet,
        })
    }

    /// Subscription from `--subscription`, then `AZURE_SUBSCRIPTION_ID`, then the config file.
    pub fn subscription(&self) -> Result<String> {
        if let Some(sub) = self.subscription.as_ref().filter(|s| !s.is_empty()) {
            return Ok(sub.clone());
        }
        Ok(self.config.subscription()?)
    }

    pub fn credential(&self) -> Result<Arc<dyn TokenCredential>> {
        build_credential(&self.config)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            retry: RetryOptions::from(&self.config.retry),
            application_id: Some(format!("azrest-cli/{}", env!("CARGO_PKG_VERSION"))),
            ..Default::default()
        }
    }

    pub fn arm_options(&self) -> ArmClientOptions {
        ArmClientOptions {
            cloud: self.config.cloud,
            endpoint: None,
            client: self.client_options(),
        }
    }

    pub fn print_items<T: Serialize>(&self, items: &[T]) -> Result<()> {
        output::write_items(&mut io::stdout().lock(), items, &self.output)
    }

    pub fn print_item<T: Serialize>(&self, item: &T) -> Result<()> {
        output::write_item(&mut io::stdout().lock(), item, &self.output)
    }

    /// Status line on stderr, hidden with `--quiet`.
    pub fn status(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    /// Wait for an operation, or print its resume token when `no_wait` is set.
    ///
    /// An operation the service finished right away has no token; its result
    /// is returned even with `no_wait`. Otherwise the result is only returned
    /// when the command waited.
    pub async fn finish<T: DeserializeOwned>(
        &self,
        mut poller: Poller<T>,
        what: &str,
        no_wait: bool,
    ) -> Result<Option<T>> {
        if no_wait && !poller.done() {
            let token = poller.resume_token().context("failed to create resume token")?;
            self.status(format!(
                "{} {what} started. Resume with {}",
                "Accepted:".bold(),
                "azrest operation wait '<token>'".cyan()
            ));
            println!("{token}");
            return Ok(None);
        }

        if !poller.done() {
            self.status(format!("{} {what}...", "Waiting for".dimmed()));
        }
        let result = poller
            .poll_until_done(POLL_FREQUENCY)
            .await
            .with_context(|| format!("{what} failed"))?;
        self.status(format!("{} {what}", "Done:".green().bold()));
        Ok(Some(result))
    }
}

/// Build the credential selected in the config.
pub fn build_credential(config: &Config) -> Result<Arc<dyn TokenCredential>> {
    let credential: Arc<dyn TokenCredential> = match config.credential {
        CredentialKind::Default => Arc::new(DefaultAzureCredential::new(config.cloud)),
        CredentialKind::Cli => Arc::new(AzureCliCredential::new()),
        CredentialKind::Environment => Arc::new(
            EnvironmentCredential::new(config.cloud)
                .context("environment credential is not configured")?,
        ),
        CredentialKind::ManagedIdentity => Arc::new(ManagedIdentityCredential::default()),
    };
    Ok(credential)
}
