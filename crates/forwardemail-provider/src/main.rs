// # forwardemail-provider
//
// Thin command-line shell over `forwardemail-core`. It:
// 1. Reads flags and environment variables
// 2. Initializes logging and the runtime
// 3. Builds the HTTP client and resource registry
// 4. Runs one plan / apply / destroy / import pass and reports it
//
// All reconciliation logic lives in `forwardemail-core`.
//
// ## Configuration
//
// - `FORWARDEMAIL_API_KEY` / `--api-key`: API key (required)
// - `FORWARDEMAIL_API_URL` / `--api-url`: API base URL
// - `FORWARDEMAIL_MANIFEST` / `--manifest`: declared resources (JSON)
// - `FORWARDEMAIL_STATE` / `--state`: state file path
// - `FORWARDEMAIL_LOG_LEVEL` / `--log-level`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export FORWARDEMAIL_API_KEY=your_key
// forwardemail-provider --manifest forwardemail.json plan
// forwardemail-provider --manifest forwardemail.json apply
// forwardemail-provider import forwardemail_alias sales example.com/sales
// ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use forwardemail_core::config::{API_KEY_ENV, API_URL_ENV, DEFAULT_BASE_URL};
use forwardemail_core::traits::StateStore;
use forwardemail_core::{
    Action, ApplyEngine, ApplySummary, EngineConfig, FileStateStore, Manifest, MemoryStateStore,
    Plan, ProviderConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Pass completed cleanly
/// - 1: Configuration error (flags, manifest, declared attributes)
/// - 2: Runtime error (remote failures, state store failures)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderExitCode {
    Clean = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<ProviderExitCode> for ExitCode {
    fn from(code: ProviderExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StateStoreKind {
    File,
    Memory,
}

#[derive(Debug, Parser)]
#[command(name = "forwardemail-provider", version, about)]
struct Cli {
    /// Forward Email API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// API base URL
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_BASE_URL)]
    api_url: String,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Manifest of declared resources
    #[arg(short, long, env = "FORWARDEMAIL_MANIFEST", default_value = "forwardemail.json")]
    manifest: PathBuf,

    /// State file path
    #[arg(long, env = "FORWARDEMAIL_STATE", default_value = "forwardemail.state.json")]
    state: PathBuf,

    /// Where state is kept between passes
    #[arg(long, value_enum, default_value_t = StateStoreKind::File)]
    state_store: StateStoreKind,

    /// Log level
    #[arg(long, env = "FORWARDEMAIL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Plan and log, but never change anything
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show what apply would change
    Plan,
    /// Reconcile remote resources with the manifest
    Apply,
    /// Delete every resource recorded in state
    Destroy,
    /// Adopt an existing remote entity into state
    Import {
        /// Resource type, e.g. forwardemail_alias
        resource_type: String,
        /// Local name for the new address
        name: String,
        /// Identity key, e.g. example.com or example.com/sales
        id: String,
    },
}

fn parse_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

impl Cli {
    fn provider_config(&self) -> Result<ProviderConfig> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                forwardemail_core::Error::config(format!(
                    "{API_KEY_ENV} is required. Set it via: export {API_KEY_ENV}=your_key"
                ))
            })?;

        let config = ProviderConfig::new(api_key)
            .with_base_url(self.api_url.clone())
            .with_timeout_secs(self.timeout_secs);
        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let Some(log_level) = parse_level(&cli.log_level) else {
        eprintln!(
            "Configuration error: log level '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            cli.log_level
        );
        return ProviderExitCode::ConfigError.into();
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ProviderExitCode::ConfigError.into();
    }

    let config = match cli.provider_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ProviderExitCode::ConfigError.into();
        }
    };
    debug!("Provider configuration: {:?}", config);

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ProviderExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run(&cli, &config).await {
            Ok(code) => code,
            Err(e) => {
                error!("{:#}", e);
                exit_code_for(&e)
            }
        }
    });

    code.into()
}

/// Config errors exit 1, everything else exits 2
fn exit_code_for(err: &anyhow::Error) -> ProviderExitCode {
    match err.downcast_ref::<forwardemail_core::Error>() {
        Some(e) if e.is_config() => ProviderExitCode::ConfigError,
        _ => ProviderExitCode::RuntimeError,
    }
}

async fn run(cli: &Cli, config: &ProviderConfig) -> Result<ProviderExitCode> {
    let registry = forwardemail_client::registry(config)?;

    let state_store: Box<dyn StateStore> = match cli.state_store {
        StateStoreKind::File => Box::new(
            FileStateStore::new(&cli.state)
                .await
                .with_context(|| format!("Opening state file {}", cli.state.display()))?,
        ),
        StateStoreKind::Memory => Box::new(MemoryStateStore::new()),
    };

    let engine_config = EngineConfig {
        dry_run: cli.dry_run,
        ..Default::default()
    };
    let (engine, mut events) = ApplyEngine::new(registry, state_store, engine_config);

    // Drain events so the channel never fills; ends when the engine drops
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!("Engine event: {:?}", event);
        }
    });

    match &cli.command {
        Command::Plan => {
            let manifest = Manifest::load(&cli.manifest).await?;
            let plan = engine.plan(&manifest).await?;
            print_plan(&plan);
            Ok(if plan.failures.is_empty() {
                ProviderExitCode::Clean
            } else {
                ProviderExitCode::RuntimeError
            })
        }
        Command::Apply => {
            let manifest = Manifest::load(&cli.manifest).await?;
            info!(
                "Applying {} resource(s) and {} data source(s) from {}",
                manifest.resources.len(),
                manifest.data.len(),
                cli.manifest.display()
            );
            let summary = engine.apply(&manifest).await?;
            Ok(report(&summary))
        }
        Command::Destroy => {
            let summary = engine.destroy().await?;
            Ok(report(&summary))
        }
        Command::Import {
            resource_type,
            name,
            id,
        } => {
            let state = engine.import(resource_type, name, id).await?;
            println!("Imported {} as {}.{}", state.id, resource_type, name);
            Ok(ProviderExitCode::Clean)
        }
    }
}

fn symbol(action: Action) -> &'static str {
    match action {
        Action::Create => "+",
        Action::Update => "~",
        Action::Replace => "-/+",
        Action::Delete => "-",
        Action::Read => "<=",
        Action::NoOp => " ",
    }
}

fn print_plan(plan: &Plan) {
    for change in &plan.changes {
        if change.action == Action::NoOp {
            continue;
        }
        if change.changed_attributes.is_empty() {
            println!("{:>3} {}", symbol(change.action), change.address);
        } else {
            println!(
                "{:>3} {} ({})",
                symbol(change.action),
                change.address,
                change.changed_attributes.join(", ")
            );
        }
    }
    for failure in &plan.failures {
        println!("  ! {}: {}", failure.address, failure.error);
    }

    println!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        plan.count(Action::Create),
        plan.count(Action::Update),
        plan.count(Action::Replace),
        plan.count(Action::Delete)
    );
}

fn report(summary: &ApplySummary) -> ProviderExitCode {
    for (address, action) in &summary.applied {
        println!("{:>3} {} ({} complete)", symbol(*action), address, action);
    }
    for (address, action) in &summary.skipped {
        println!("{:>3} {} (dry run, {} skipped)", symbol(*action), address, action);
    }
    for failure in &summary.failures {
        println!("  ! {}: {}", failure.address, failure.error);
    }

    println!(
        "{} applied, {} skipped, {} failed.",
        summary.applied.len(),
        summary.skipped.len(),
        summary.failures.len()
    );

    if summary.is_success() {
        ProviderExitCode::Clean
    } else {
        ProviderExitCode::RuntimeError
    }
}
