//! CLI argument definitions using clap

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::commands::common::Context;
use crate::output::OutputFormat;

/// A CLI for Azure Resource Manager, Key Vault and Azure OpenAI
#[derive(Parser)]
#[command(name = "azrest")]
#[command(author, version, about)]
#[command(long_about = "A CLI for Azure Resource Manager, Key Vault and Azure OpenAI.\n\n\
    Manage resource groups, virtual machines, networks, secrets and reservations, \
    and talk to Azure OpenAI deployments directly from the command line.")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Azure subscription ID (overrides config and AZURE_SUBSCRIPTION_ID)
    #[arg(long, global = true)]
    pub subscription: Option<String>,

    /// Output format for command results
    #[arg(short, long, value_enum, global = true, default_value = "json")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Choose a default subscription and save the config file
    Init {
        /// Azure subscription ID (skip interactive selection)
        #[arg(long = "default-subscription")]
        subscription: Option<String>,

        /// Key Vault URL to use for secret commands
        #[arg(long)]
        keyvault: Option<String>,

        /// Azure OpenAI endpoint
        #[arg(long)]
        openai_endpoint: Option<String>,

        /// Azure OpenAI deployment used by chat and embed
        #[arg(long)]
        openai_deployment: Option<String>,
    },

    /// Manage Azure authentication
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Manage resource groups
    Group {
        #[command(subcommand)]
        command: GroupCommands,
    },

    /// Manage virtual machines
    Vm {
        #[command(subcommand)]
        command: VmCommands,
    },

    /// Manage virtual networks
    Vnet {
        #[command(subcommand)]
        command: VnetCommands,
    },

    /// Manage Key Vault secrets
    Secret {
        /// Vault URL (overrides config)
        #[arg(long, global = true)]
        vault: Option<String>,

        #[command(subcommand)]
        command: SecretCommands,
    },

    /// Inspect reservations
    Reservation {
        #[command(subcommand)]
        command: ReservationCommands,
    },

    /// Work with long-running operations
    Operation {
        #[command(subcommand)]
        command: OperationCommands,
    },

    /// Send a chat message to an Azure OpenAI deployment
    Chat {
        /// The user message
        message: String,

        /// System prompt
        #[arg(long)]
        system: Option<String>,

        /// Deployment name (overrides config)
        #[arg(long)]
        deployment: Option<String>,

        /// Sampling temperature
        #[arg(long)]
        temperature: Option<f32>,

        /// Maximum tokens to generate
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Print tokens as they arrive
        #[arg(long)]
        stream: bool,
    },

    /// Compute embeddings for one or more inputs
    Embed {
        /// Input texts
        #[arg(required = true)]
        input: Vec<String>,

        /// Deployment name (overrides config)
        #[arg(long)]
        deployment: Option<String>,

        /// Number of output dimensions
        #[arg(long)]
        dimensions: Option<u32>,
    },

    /// Transcribe or translate an audio file
    Transcribe {
        /// Path to the audio file
        file: PathBuf,

        /// Whisper deployment name
        #[arg(long)]
        deployment: String,

        /// Language of the audio (ISO-639-1)
        #[arg(long)]
        language: Option<String>,

        /// Translate into English instead of transcribing
        #[arg(long)]
        translate: bool,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(clap::Subcommand)]
pub enum AuthCommands {
    /// Show Azure CLI login status
    Status,
    /// Login to Azure (opens browser)
    Login,
    /// Logout from Azure
    Logout,
}

#[derive(clap::Subcommand)]
pub enum GroupCommands {
    /// List resource groups
    List {
        /// OData filter, e.g. "tagName eq 'env'"
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show a resource group
    Show { name: String },
    /// Create or update a resource group
    Create {
        name: String,
        #[arg(long, short)]
        location: String,
    },
    /// Delete a resource group and everything in it
    Delete {
        name: String,
        /// Print a resume token instead of waiting
        #[arg(long)]
        no_wait: bool,
    },
}

#[derive(clap::Subcommand)]
pub enum VmCommands {
    /// List virtual machines, in one resource group or the whole subscription
    List {
        #[arg(long, short = 'g')]
        resource_group: Option<String>,
    },
    /// Show a virtual machine
    Show {
        #[arg(long, short = 'g')]
        resource_group: String,
        name: String,
        /// Include the instance view (power state)
        #[arg(long)]
        instance_view: bool,
    },
    /// Start a virtual machine
    Start(VmAction),
    /// Power off a virtual machine (still billed)
    Stop {
        #[command(flatten)]
        action: VmAction,
        /// Skip the graceful OS shutdown
        #[arg(long)]
        skip_shutdown: bool,
    },
    /// Restart a virtual machine
    Restart(VmAction),
    /// Deallocate a virtual machine
    Deallocate(VmAction),
    /// Delete a virtual machine
    Delete {
        #[command(flatten)]
        action: VmAction,
        /// Force deletion without a graceful shutdown
        #[arg(long)]
        force: bool,
    },
}

#[derive(clap::Args)]
pub struct VmAction {
    #[arg(long, short = 'g')]
    pub resource_group: String,
    pub name: String,
    /// Print a resume token instead of waiting
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(clap::Subcommand)]
pub enum VnetCommands {
    /// List virtual networks
    List {
        #[arg(long, short = 'g')]
        resource_group: Option<String>,
    },
    /// Show a virtual network
    Show {
        #[arg(long, short = 'g')]
        resource_group: String,
        name: String,
    },
    /// Delete a virtual network
    Delete {
        #[arg(long, short = 'g')]
        resource_group: String,
        name: String,
        /// Print a resume token instead of waiting
        #[arg(long)]
        no_wait: bool,
    },
}

#[derive(clap::Subcommand)]
pub enum SecretCommands {
    /// List secrets (values are not included)
    List {
        /// List deleted secrets instead
        #[arg(long)]
        deleted: bool,
    },
    /// Print a secret value
    Get {
        name: String,
        #[arg(long)]
        version: Option<String>,
    },
    /// Set a secret value
    Set {
        name: String,
        value: String,
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete a secret
    Delete {
        name: String,
        /// Return once deletion has started
        #[arg(long)]
        no_wait: bool,
        /// Also purge the deleted secret
        #[arg(long)]
        purge: bool,
    },
}

#[derive(clap::Subcommand)]
pub enum ReservationCommands {
    /// List reservation orders
    Orders,
    /// List the reservations in an order
    List { order_id: String },
    /// Show a reservation
    Show {
        order_id: String,
        reservation_id: String,
    },
}

#[derive(clap::Subcommand)]
pub enum OperationCommands {
    /// Resume a long-running operation from a token and wait for it
    Wait {
        /// Resume token printed by a --no-wait command
        token: String,
    },
}

#[derive(Clone, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let Some(command) = self.command else {
            // Show help when no subcommand is given
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            println!();
            return Ok(());
        };
        let load = || Context::load(self.subscription.clone(), self.output.clone(), self.quiet);

        match command {
            Commands::Init {
                subscription,
                keyvault,
                openai_endpoint,
                openai_deployment,
            } => {
                crate::commands::init::run(crate::commands::init::InitArgs {
                    subscription: subscription.or(self.subscription.clone()),
                    keyvault,
                    openai_endpoint,
                    openai_deployment,
                })
                .await
            }
            Commands::Auth { command } => crate::commands::auth::run(command).await,
            Commands::Completion { shell } => {
                crate::commands::completion::generate_completions(shell);
                Ok(())
            }
            Commands::Version => {
                crate::banner::print_banner_with_version();
                Ok(())
            }
            Commands::Group { command } => crate::commands::group::run(&load()?, command).await,
            Commands::Vm { command } => crate::commands::vm::run(&load()?, command).await,
            Commands::Vnet { command } => crate::commands::vnet::run(&load()?, command).await,
            Commands::Secret { vault, command } => {
                crate::commands::secret::run(&load()?, vault, command).await
            }
            Commands::Reservation { command } => {
                crate::commands::reservation::run(&load()?, command).await
            }
            Commands::Operation { command } => {
                crate::commands::operation::run(&load()?, command).await
            }
            Commands::Chat {
                message,
                system,
                deployment,
                temperature,
                max_tokens,
                stream,
            } => {
                crate::commands::ai::chat(
                    &load()?,
                    crate::commands::ai::ChatArgs {
                        message,
                        system,
                        deployment,
                        temperature,
                        max_tokens,
                        stream,
                    },
                )
                .await
            }
            Commands::Embed {
                input,
                deployment,
                dimensions,
            } => crate::commands::ai::embed(&load()?, input, deployment, dimensions).await,
            Commands::Transcribe {
                file,
                deployment,
                language,
                translate,
            } => {
                crate::commands::ai::transcribe(&load()?, file, deployment, language, translate)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "azrest", "vm", "stop", "-g", "rg1", "vm1", "--no-wait", "--skip-shutdown", "-o", "table",
        ])
        .unwrap();
        assert!(matches!(cli.output, OutputFormat::Table));
        let Some(Commands::Vm {
            command: VmCommands::Stop { action, skip_shutdown },
        }) = cli.command
        else {
            panic!("expected vm stop");
        };
        assert_eq!(action.resource_group, "rg1");
        assert_eq!(action.name, "vm1");
        assert!(action.no_wait);
        assert!(skip_shutdown);
    }

    #[test]
    fn test_operation_wait_takes_token() {
        let cli = Cli::try_parse_from(["azrest", "operation", "wait", "{\"pollerType\":\"x\"}"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Operation {
                command: OperationCommands::Wait { .. }
            })
        ));
    }
}
