//! homesync CLI entrypoint.
//!
//! This is the main entrypoint for the homesync command-line tool.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use homelab_sync::cli::{
    Cli, Commands, ControlDCommands, ListArgs, LogFormat, OutputFormatter, PangolinCommands,
    PurgeArgs, SyncArgs,
};
use homelab_sync::config::{
    controld_desired, find_config_file, find_repo_root, pangolin_desired, ConfigParser,
    ConfigValidator, CredentialSource,
};
use homelab_sync::controld::ControlDGateway;
use homelab_sync::error::Result;
use homelab_sync::fanout::{parse_target_filter, PurgeOptions, RunSummary, SyncOptions, TargetRunner};
use homelab_sync::gateway::{ResourceGateway, TargetSpec};
use homelab_sync::pangolin::{requested_clients, PangolinGateway};
use homelab_sync::planner::DiffMode;
use homelab_sync::resource::DesiredResourceSet;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose, cli.log_format);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over `--verbose`.
fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Main async entry point. Returns whether the command fully succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Controld {
            domains,
            token_file,
            command,
        } => {
            let ctx = Context::load(cli.config.as_deref(), &cwd, "controld")?;
            run_controld(&ctx, domains, token_file, command, &formatter).await
        }
        Commands::Pangolin {
            resources,
            token_file,
            command,
        } => {
            let ctx = Context::load(cli.config.as_deref(), &cwd, "pangolin")?;
            run_pangolin(&ctx, resources, token_file, command, &formatter).await
        }
    }
}

/// Located configuration of one integration.
struct Context {
    /// The integration's config.yaml.
    config_path: PathBuf,
    /// Directory holding config.yaml and its sibling files.
    config_dir: PathBuf,
    /// Parser with `.env` already loaded.
    parser: ConfigParser,
}

impl Context {
    /// Finds config.yaml and loads the `.env` next to it.
    fn load(explicit: Option<&Path>, cwd: &Path, integration: &str) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => find_config_file(cwd, integration)?,
        };
        let config_dir = config_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let parser = ConfigParser::new().with_base_path(&config_dir);
        parser.load_dotenv()?;

        Ok(Self {
            config_path,
            config_dir,
            parser,
        })
    }

    /// Returns `explicit` or the named file next to config.yaml.
    fn sibling(&self, explicit: Option<PathBuf>, name: &str) -> PathBuf {
        explicit.unwrap_or_else(|| self.config_dir.join(name))
    }

    /// Returns `explicit` or the default secret file under the repository root.
    fn secret(&self, explicit: Option<PathBuf>, name: &str) -> PathBuf {
        explicit.unwrap_or_else(|| find_repo_root(&self.config_dir).join("secrets").join(name))
    }
}

/// Runs a ControlD command.
async fn run_controld(
    ctx: &Context,
    domains_path: Option<PathBuf>,
    token_file: Option<PathBuf>,
    command: ControlDCommands,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let config = ctx.parser.load_controld(&ctx.config_path)?;
    let domains_path = ctx.sibling(domains_path, "domains.yaml");

    let desired = match &command {
        ControlDCommands::Validate => {
            let domains = ctx.parser.load_domains(&domains_path)?;
            let result = ConfigValidator::validate_controld(&config, &domains)?;
            let desired = controld_desired(&domains, &config.suffixes)?;
            println!(
                "{}",
                formatter.format_validation(
                    &result,
                    &[
                        ("Targets", config.profiles.len()),
                        ("Domains", domains.len()),
                        ("Hostnames", desired.len()),
                    ],
                )
            );
            return Ok(true);
        }
        ControlDCommands::Sync(_) => {
            let domains = ctx.parser.load_domains(&domains_path)?;
            ConfigValidator::validate_controld(&config, &domains)?;
            controld_desired(&domains, &config.suffixes)?
        }
        ControlDCommands::List(_) | ControlDCommands::Purge(_) => DesiredResourceSet::new(),
    };

    let token = CredentialSource::controld(ctx.secret(token_file, "controld-token.enc.yaml")).load()?;
    let gateway = ControlDGateway::new(&config, &token)?;
    let targets = config.targets();

    match command {
        ControlDCommands::List(args) => Ok(list(&gateway, &targets, &args, formatter).await),
        ControlDCommands::Sync(args) => {
            let mode = DiffMode::from_force(args.force);
            Ok(sync(&gateway, &targets, &desired, &args, mode, formatter).await)
        }
        ControlDCommands::Purge(args) => purge(&gateway, &targets, &args, formatter).await,
        ControlDCommands::Validate => Ok(true),
    }
}

/// Runs a Pangolin command.
async fn run_pangolin(
    ctx: &Context,
    resources_path: Option<PathBuf>,
    token_file: Option<PathBuf>,
    command: PangolinCommands,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let config = ctx.parser.load_pangolin(&ctx.config_path)?;
    let resources_path = ctx.sibling(resources_path, "resources.yaml");

    let desired = match &command {
        PangolinCommands::Validate => {
            let resources = ctx.parser.load_resources(&resources_path)?;
            let result = ConfigValidator::validate_pangolin(&config, &resources)?;
            let desired = pangolin_desired(&resources, &config.default_suffix)?;
            println!(
                "{}",
                formatter.format_validation(
                    &result,
                    &[("Targets", config.sites.len()), ("Resources", desired.len())],
                )
            );
            return Ok(true);
        }
        PangolinCommands::Sync { .. } => {
            let resources = ctx.parser.load_resources(&resources_path)?;
            ConfigValidator::validate_pangolin(&config, &resources)?;
            pangolin_desired(&resources, &config.default_suffix)?
        }
        PangolinCommands::List(_) | PangolinCommands::ListClients | PangolinCommands::Purge(_) => {
            DesiredResourceSet::new()
        }
    };

    let api_key = CredentialSource::pangolin(ctx.secret(token_file, "pangolin-creds.enc.yaml")).load()?;
    let gateway = PangolinGateway::new(&config, &api_key)?;
    let targets = config.targets();

    match command {
        PangolinCommands::List(args) => Ok(list(&gateway, &targets, &args, formatter).await),
        PangolinCommands::ListClients => {
            let clients = gateway.list_clients().await?;
            println!("{}", formatter.format_clients(&clients));
            Ok(true)
        }
        PangolinCommands::Sync {
            sync: args,
            clients,
            no_default_clients,
            force_client_update,
        } => {
            let extra: Vec<String> = clients
                .as_deref()
                .map(|raw| raw.split(',').map(String::from).collect())
                .unwrap_or_default();
            let names = requested_clients(&config.default_clients, &extra, !no_default_clients);
            let resolution = gateway.resolve_clients(&names).await?;
            let client_ids = resolution.found.iter().map(|c| c.client_id).collect();
            info!(
                "Associating {} client(s); {} not found",
                resolution.found.len(),
                resolution.missing.len()
            );
            let gateway = gateway.with_client_ids(client_ids);

            let mode = if force_client_update {
                DiffMode::Refresh
            } else {
                DiffMode::from_force(args.force)
            };
            Ok(sync(&gateway, &targets, &desired, &args, mode, formatter).await)
        }
        PangolinCommands::Purge(args) => purge(&gateway, &targets, &args, formatter).await,
        PangolinCommands::Validate => Ok(true),
    }
}

/// Lists current resources. Fails if any target could not be listed.
async fn list<G: ResourceGateway>(
    gateway: &G,
    targets: &[TargetSpec],
    args: &ListArgs,
    formatter: &OutputFormatter,
) -> bool {
    let listings = TargetRunner::new(gateway, targets)
        .with_filter(parse_target_filter(args.target.as_deref()))
        .list()
        .await;
    println!("{}", formatter.format_listings(&listings));
    !listings.is_empty() && listings.iter().all(|l| l.error.is_none())
}

/// Reconciles every selected target onto the desired set.
async fn sync<G: ResourceGateway>(
    gateway: &G,
    targets: &[TargetSpec],
    desired: &DesiredResourceSet,
    args: &SyncArgs,
    mode: DiffMode,
    formatter: &OutputFormatter,
) -> bool {
    let summary = TargetRunner::new(gateway, targets)
        .with_filter(parse_target_filter(args.target.as_deref()))
        .sync(
            desired,
            SyncOptions {
                dry_run: args.dry_run,
                mode,
            },
        )
        .await;
    report(&summary, formatter)
}

/// Deletes every resource of every selected target.
async fn purge<G: ResourceGateway>(
    gateway: &G,
    targets: &[TargetSpec],
    args: &PurgeArgs,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let summary = TargetRunner::new(gateway, targets)
        .with_filter(parse_target_filter(args.target.as_deref()))
        .purge(PurgeOptions {
            dry_run: args.dry_run,
            confirm: args.confirm,
        })
        .await?;
    Ok(report(&summary, formatter))
}

/// Prints a run summary and returns whether it succeeded.
fn report(summary: &RunSummary, formatter: &OutputFormatter) -> bool {
    println!("{}", formatter.format_run(summary));
    summary.success()
}
