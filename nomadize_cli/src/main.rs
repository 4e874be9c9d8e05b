use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use nomadize_cli::config::{AppConfig, ConfigManager, get_config};
use nomadize_cli::error::{CliError, ExitCode};
use nomadize_cli::orchestrators::lookup_orchestrator::LookupOrchestrator;
use nomadize_cli::orchestrators::migrate_orchestrator::{MigrateOptions, MigrateOrchestrator};
use nomadize_cli::platform::system_directory;
use nomadize_cli::prompt::DialoguerPrompter;
use nomadize_cli::terminal;
use nomadize_core::{DirectoryQueryClient, SearchScope, SystemAccountTools, list_local_accounts};

#[derive(Parser)]
#[command(name = "nomadize")]
#[command(author, version, about = "Turn a local macOS account into a mobile account for a network user", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate a local account's home into a network mobile account
    Migrate {
        /// Local account to migrate (prompted for when omitted)
        #[arg(short, long)]
        local: Option<String>,

        /// Network account that takes over the home (prompted for when omitted)
        #[arg(short, long)]
        target: Option<String>,

        /// Directory scope searched for the target account
        #[arg(short, long, value_enum)]
        scope: Option<ScopeArg>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Show the plan without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Print the plan or report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check whether an account exists in the directory
    Lookup {
        /// Account name to look up
        name: String,

        /// Directory scope to search
        #[arg(short, long, value_enum)]
        scope: Option<ScopeArg>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List local accounts that can be migrated
    Accounts {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., directory.scope)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., directory.scope)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    Local,
    Network,
    Combined,
}

impl From<ScopeArg> for SearchScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Local => SearchScope::LocalOnly,
            ScopeArg::Network => SearchScope::NetworkOnly,
            ScopeArg::Combined => SearchScope::CombinedLocalAndNetwork,
        }
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Debug)
            .filter_module("nomadize_core", log::LevelFilter::Debug)
            .filter_module("nomadize_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if !terminal::supports_ansi() {
        colored::control::set_override(false);
    }

    match run(cli.command).await {
        Ok(code) => code.into(),
        Err(error) => {
            let error = CliError::from(error);
            eprint!("{}", error.format_for_user(cli.debug));
            error.exit_code().into()
        }
    }
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Migrate {
            local,
            target,
            scope,
            yes,
            dry_run,
            json,
        } => {
            let mut config = load_config()?;
            config.apply_cli_overrides(scope.map(Into::into));

            let options = MigrateOptions {
                local,
                target,
                assume_yes: yes,
                dry_run,
                json,
                interactive: terminal::is_interactive(),
            };
            log::debug!("Migrate options: {options:?}");

            let lookup = LookupOrchestrator::new(DirectoryQueryClient::with_config(
                system_directory()?,
                config.directory.clone(),
            ));
            let tools = SystemAccountTools::new(config.tools.clone());

            MigrateOrchestrator::new(lookup, tools, DialoguerPrompter, &config, options)
                .execute()
                .await
        }
        Commands::Lookup { name, scope, json } => {
            let mut config = load_config()?;
            config.apply_cli_overrides(scope.map(Into::into));

            let scope = config.directory.scope;
            let lookup = LookupOrchestrator::new(DirectoryQueryClient::with_config(
                system_directory()?,
                config.directory,
            ));
            lookup.execute(&name, scope, json).await
        }
        Commands::Accounts { json } => {
            let config = load_config()?;
            accounts_command(&config, json)
        }
        Commands::Config { command } => config_command(command),
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(ExitCode::Success)
        }
    }
}

/// Load layered configuration and apply its output settings
fn load_config() -> Result<AppConfig> {
    let config = get_config().context("Failed to load configuration")?;

    if !config.output.color_enabled || !terminal::supports_ansi() {
        colored::control::set_override(false);
    }

    Ok(config)
}

fn accounts_command(config: &AppConfig, json: bool) -> Result<ExitCode> {
    let root = &config.migration.accounts_root;
    let candidates = list_local_accounts(root)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(ExitCode::Success);
    }

    if candidates.is_empty() {
        eprintln!("{}", format!("No local accounts under {}", root.display()).yellow());
        return Ok(ExitCode::Success);
    }

    for (index, candidate) in candidates.iter().enumerate() {
        println!(
            "{:>3}. {}  {}",
            index + 1,
            candidate.name.bold(),
            candidate.home_path.display().to_string().dimmed()
        );
    }
    Ok(ExitCode::Success)
}

fn config_command(command: ConfigCommand) -> Result<ExitCode> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            let value = manager.get(&key)?;
            println!("{value}");
        }
        ConfigCommand::Set { key, value } => {
            manager.set(&key, &value)?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            // Group items by section, keeping key order
            let mut sections: std::collections::BTreeMap<String, Vec<(String, String)>> =
                std::collections::BTreeMap::new();
            for (key, value) in items {
                let (section, rest) = key.split_once('.').unwrap_or(("general", key.as_str()));
                sections
                    .entry(section.to_string())
                    .or_default()
                    .push((rest.to_string(), value));
            }

            for (section, items) in sections {
                println!("[{}]", section.yellow());
                for (key, value) in items {
                    println!("  {} = {}", key.cyan(), value);
                }
                println!();
            }
        }
    }

    Ok(ExitCode::Success)
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
