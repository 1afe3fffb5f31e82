//! temporal-provider CLI entrypoint.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use temporal_provider::cli::{Cli, Commands, OutputFormatter, StateCommands};
use temporal_provider::client::{Connection, GrpcNamespaceClient};
use temporal_provider::config::{find_config_file, ConfigParser, EndpointConfig, Manifest};
use temporal_provider::context::CallContext;
use temporal_provider::driver::ProviderDriver;
use temporal_provider::error::{ProviderError, Result};
use temporal_provider::model::{namespace_schema, provider_schema, Diagnostics};
use temporal_provider::planner::{ProviderPlan, RetryPolicy};
use temporal_provider::state::{
    HistoryEntry, LocalStateStore, ProviderState, StateOperation, StateStore,
};

type Driver = ProviderDriver<GrpcNamespaceClient>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(cli))
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_logging(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> ExitCode {
    let formatter = OutputFormatter::new(cli.output);

    match execute(cli, &formatter).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprint!("{}", formatter.format_diagnostics(&e.to_diagnostics()));
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli, formatter: &OutputFormatter) -> Result<ExitCode> {
    if matches!(cli.command, Commands::Schema) {
        emit(&formatter.format_schemas(&[provider_schema(), namespace_schema()]));
        return Ok(ExitCode::SUCCESS);
    }

    let manifest_path = resolve_config_path(cli.config.as_ref())?;
    let base_dir = manifest_path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    let parser = ConfigParser::new().with_base_path(&base_dir);
    parser.load_dotenv()?;
    let manifest = parser.load_file(&manifest_path)?;

    let store = cli.state.map_or_else(
        || LocalStateStore::in_dir(&base_dir),
        LocalStateStore::with_state_path,
    );

    match cli.command {
        Commands::Validate => Ok(cmd_validate(&manifest, formatter)),
        Commands::State { command } => cmd_state(command, &store, formatter).await,
        command => {
            let endpoint = manifest.provider.resolve()?;
            let lock = if command.is_mutating() {
                Some(store.acquire_lock("", command_name(&command)).await?)
            } else {
                None
            };

            let result = with_connection(command, &endpoint, &manifest, &store, formatter).await;

            if let Some(lock) = lock {
                if let Err(e) = store.release_lock(&lock.lock_id).await {
                    warn!("Failed to release state lock: {e}");
                }
            }
            result
        }
    }
}

async fn with_connection(
    command: Commands,
    endpoint: &EndpointConfig,
    manifest: &Manifest,
    store: &LocalStateStore,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let connection = if command.needs_connection() {
        Connection::establish(endpoint).await?
    } else {
        Connection::disconnected(endpoint.uri())
    };

    let ctx = CallContext::new();
    let interrupt = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling in-flight operations");
                ctx.cancel();
            }
        })
    };

    let ctx = &ctx;
    let result = connection
        .scoped(|connection| async move {
            let client = Arc::new(GrpcNamespaceClient::new(connection));
            let driver = ProviderDriver::new(client, RetryPolicy::from(&manifest.provider.retry));
            dispatch(command, &driver, endpoint, manifest, store, ctx, formatter).await
        })
        .await;

    interrupt.abort();
    result
}

async fn dispatch(
    command: Commands,
    driver: &Driver,
    endpoint: &EndpointConfig,
    manifest: &Manifest,
    store: &LocalStateStore,
    ctx: &CallContext,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let mut state = store.load().await?.unwrap_or_default();

    match command {
        Commands::Plan { no_refresh } => {
            cmd_plan(driver, manifest, &mut state, no_refresh, ctx, formatter).await
        }
        Commands::Apply { yes, no_refresh } => {
            let code =
                cmd_apply(driver, manifest, &mut state, yes, no_refresh, ctx, formatter).await;
            state.endpoint = endpoint.uri();
            save_after(store, &state, code).await
        }
        Commands::Read { name_or_id } => {
            let code = cmd_read(driver, &name_or_id, &mut state, ctx, formatter).await;
            save_after(store, &state, code).await
        }
        Commands::Import { id } => {
            let code = driver
                .import(&id, &mut state, ctx)
                .await
                .map(|imported| {
                    emit(&formatter.format_namespace(&imported));
                    ExitCode::SUCCESS
                });
            save_after(store, &state, code).await
        }
        Commands::Destroy { yes } => {
            let code = cmd_destroy(driver, &mut state, yes, ctx, formatter).await;
            save_after(store, &state, code).await
        }
        Commands::Validate | Commands::Schema | Commands::State { .. } => {
            Err(ProviderError::internal("command does not use the Temporal connection"))
        }
    }
}

/// Persists state even when the command failed part-way, so every
/// namespace that did change is remembered.
async fn save_after(
    store: &LocalStateStore,
    state: &ProviderState,
    result: Result<ExitCode>,
) -> Result<ExitCode> {
    store.save(state).await?;
    result
}

fn cmd_validate(manifest: &Manifest, formatter: &OutputFormatter) -> ExitCode {
    let mut diagnostics = Diagnostics::new();

    if let Err(e) = manifest.provider.resolve() {
        diagnostics.extend(e.to_diagnostics());
    }
    for spec in &manifest.namespaces {
        if let Err(e) = spec.resolve(None) {
            diagnostics.extend(
                ProviderError::from(e)
                    .with_resource(spec.display_name())
                    .to_diagnostics(),
            );
        }
    }

    if diagnostics.has_errors() {
        eprint!("{}", formatter.format_diagnostics(&diagnostics));
        return ExitCode::FAILURE;
    }

    emit(&formatter.message(
        true,
        &format!(
            "Manifest is valid ({} namespace(s))",
            manifest.namespaces.len()
        ),
    ));
    ExitCode::SUCCESS
}

async fn cmd_plan(
    driver: &Driver,
    manifest: &Manifest,
    state: &mut ProviderState,
    no_refresh: bool,
    ctx: &CallContext,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    if !no_refresh {
        driver.refresh(state, ctx).await?;
    }

    let plan = driver.plan(manifest, state)?;
    emit(&formatter.format_plan(&plan));
    warn_plan(&plan, formatter);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_apply(
    driver: &Driver,
    manifest: &Manifest,
    state: &mut ProviderState,
    auto_approve: bool,
    no_refresh: bool,
    ctx: &CallContext,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    if !no_refresh {
        let dropped = driver.refresh(state, ctx).await?;
        for name in dropped {
            warn!(namespace = %name, "Namespace was removed outside of configuration and will be recreated");
        }
    }

    let plan = driver.plan(manifest, state)?;
    if plan.is_empty() {
        emit(&formatter.message(true, "No changes to apply"));
        return Ok(ExitCode::SUCCESS);
    }

    emit(&formatter.format_plan(&plan));
    warn_plan(&plan, formatter);
    if !auto_approve && !confirm("Do you want to apply this plan? [y/N]: ", "y")? {
        eprintln!("Apply cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = driver.apply(manifest, state, ctx).await;
    emit(&formatter.format_report(&report));

    Ok(if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn warn_plan(plan: &ProviderPlan, formatter: &OutputFormatter) {
    let diagnostics = plan.diagnostics();
    if !diagnostics.is_empty() {
        eprint!("{}", formatter.format_diagnostics(&diagnostics));
    }
}

async fn cmd_read(
    driver: &Driver,
    name_or_id: &str,
    state: &mut ProviderState,
    ctx: &CallContext,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    match driver.read(name_or_id, state, ctx).await? {
        Some(current) => {
            emit(&formatter.format_namespace(&current));
            Ok(ExitCode::SUCCESS)
        }
        None => {
            emit(&formatter.message(false, &format!("Namespace '{name_or_id}' does not exist")));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cmd_destroy(
    driver: &Driver,
    state: &mut ProviderState,
    auto_approve: bool,
    ctx: &CallContext,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    if state.namespaces.is_empty() {
        emit(&formatter.message(true, "No namespaces to destroy"));
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!("The following namespaces will be deleted:");
    for record in state.namespaces.values() {
        eprintln!("  - {} ({})", record.state.name, record.state.id);
    }

    if !auto_approve
        && !confirm("\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ", "destroy")?
    {
        eprintln!("Destroy cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let report = driver.destroy(state, ctx).await;
    emit(&formatter.format_report(&report));

    Ok(if report.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn cmd_state(
    command: StateCommands,
    store: &LocalStateStore,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    match command {
        StateCommands::List => {
            let state = store.load().await?.unwrap_or_default();
            emit(&formatter.format_state(&state));
        }
        StateCommands::Show { name } => {
            let state = store.load().await?.unwrap_or_default();
            let Some(current) = state.get(&name) else {
                emit(&formatter.message(false, &format!("Namespace '{name}' is not managed")));
                return Ok(ExitCode::FAILURE);
            };
            emit(&formatter.format_namespace(current));
        }
        StateCommands::Rm { name } => {
            let lock = store.acquire_lock("", "state rm").await?;
            let result = forget(store, &name).await;
            store.release_lock(&lock.lock_id).await?;

            let removed = result?;
            emit(&formatter.message(
                removed,
                &if removed {
                    format!("Namespace '{name}' is no longer managed")
                } else {
                    format!("Namespace '{name}' is not managed")
                },
            ));
            if !removed {
                return Ok(ExitCode::FAILURE);
            }
        }
        StateCommands::Unlock { force } => match store.get_lock_info().await? {
            Some(lock) if force || lock.is_expired() => {
                store.release_lock(&lock.lock_id).await?;
                emit(&formatter.message(true, &format!("Removed lock held by {}", lock.holder)));
            }
            Some(lock) => {
                emit(&formatter.message(
                    false,
                    &format!(
                        "Lock held by {} expires in {}s; use --force to remove it",
                        lock.holder,
                        lock.remaining_secs()
                    ),
                ));
                return Ok(ExitCode::FAILURE);
            }
            None => emit(&formatter.message(true, "State is not locked")),
        },
    }

    Ok(ExitCode::SUCCESS)
}

async fn forget(store: &LocalStateStore, name: &str) -> Result<bool> {
    let mut state = store.load().await?.unwrap_or_default();
    if state.remove(name).is_none() {
        return Ok(false);
    }

    state.add_history(HistoryEntry::new(
        StateOperation::Forget,
        vec![name.to_string()],
        None,
    ));
    store.save(&state).await?;
    info!(namespace = name, "Removed namespace from state");
    Ok(true)
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Validate => "validate",
        Commands::Schema => "schema",
        Commands::Plan { .. } => "plan",
        Commands::Apply { .. } => "apply",
        Commands::Read { .. } => "read",
        Commands::Import { .. } => "import",
        Commands::Destroy { .. } => "destroy",
        Commands::State { .. } => "state",
    }
}

fn confirm(prompt: &str, expected: &str) -> Result<bool> {
    eprint!("{prompt}");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case(expected))
}

fn emit(text: &str) {
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{}", text.trim_end()) {
        debug!("Failed to write output: {e}");
    }
}

fn resolve_config_path(config_path: Option<&PathBuf>) -> Result<PathBuf> {
    config_path.map_or_else(|| find_config_file("."), |path| Ok(path.clone()))
}
