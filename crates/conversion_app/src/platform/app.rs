use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use conversion_core::{
    catalogue, find_tool, format_megabytes, update, update_batch, BatchMsg, BatchState, FileRef,
    Msg, ProgressEstimator, SessionState, SessionStatus, ToolOptions, ToolSpec,
};
use conversion_engine::worker::{
    FetchOutcome, FetchRequest, MemoryCacheStorage, ReqwestAssetNetwork, WorkerCacheController,
    WorkerConfig, WorkerRegistry,
};
use conversion_engine::{save_result, ApiConfig, AuthClient, EngineConfig};
use engine_logging::{engine_info, engine_warn};

use super::effects::EffectRunner;
use super::persistence::{load_client_state, save_client_state};
use crate::cli::{Cli, Command};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let api = match &cli.api_url {
        Some(url) => ApiConfig::with_base(url.as_str()),
        None => ApiConfig::from_env(),
    };
    engine_info!("Using API {}", api.api_base());
    let registry = Arc::new(WorkerRegistry::new());

    match cli.command {
        Command::Tools => {
            list_tools();
            Ok(())
        }
        Command::Run {
            tool,
            file,
            out,
            options,
        } => {
            let tool = lookup_tool(&tool)?;
            let options = options.for_tool(&tool.id).map_err(|err| anyhow!(err))?;
            let runner = effect_runner(api, registry);
            let saved = run_single(&runner, tool, file_ref(&file)?, options, &out)?;
            println!("{}", saved.display());
            Ok(())
        }
        Command::Batch { tool, files, out } => {
            let tool = lookup_tool(&tool)?;
            let mut refs = Vec::with_capacity(files.len());
            for path in &files {
                let file = file_ref(path)?;
                if tool.accepts(&file.name) {
                    refs.push(file);
                } else {
                    engine_warn!("Skipping {}: {} does not accept it", file.name, tool.title);
                }
            }
            if refs.is_empty() {
                bail!("none of the files can be converted with {}", tool.title);
            }
            let runner = effect_runner(api, registry);
            for saved in run_batch(&runner, tool, refs, &out)? {
                println!("{}", saved.display());
            }
            Ok(())
        }
        Command::Login { email, password } => {
            let session = block_on(async {
                AuthClient::new(api)?.login(&email, &password).await
            })??;
            let mut state = load_client_state(&cli.state_dir);
            println!("Signed in as {}", session.user.name);
            state.login(session);
            save_client_state(&cli.state_dir, &state);
            Ok(())
        }
        Command::Signup {
            name,
            email,
            password,
        } => {
            let session = block_on(async {
                AuthClient::new(api)?.signup(&name, &email, &password).await
            })??;
            let mut state = load_client_state(&cli.state_dir);
            println!("Account created for {}", session.user.email);
            state.login(session);
            save_client_state(&cli.state_dir, &state);
            Ok(())
        }
        Command::ForgotPassword { email } => {
            let message =
                block_on(async { AuthClient::new(api)?.forgot_password(&email).await })??;
            println!("{message}");
            Ok(())
        }
        Command::ResetPassword {
            token,
            new_password,
        } => {
            let message = block_on(async {
                AuthClient::new(api)?.reset_password(&token, &new_password).await
            })??;
            println!("{message}");
            Ok(())
        }
        Command::Logout => {
            let mut state = load_client_state(&cli.state_dir);
            if state.logout() {
                save_client_state(&cli.state_dir, &state);
                println!("Signed out");
            } else {
                println!("Not signed in");
            }
            Ok(())
        }
        Command::Theme => {
            let mut state = load_client_state(&cli.state_dir);
            let theme = state.toggle_theme();
            save_client_state(&cli.state_dir, &state);
            println!("Theme: {theme:?}");
            Ok(())
        }
        Command::Worker {
            origin,
            worker_mode,
            cache_name,
            manifest,
            paths,
        } => {
            let api_base = api.base_url().context("invalid API url")?;
            let mut config = WorkerConfig::new(origin, api_base).with_mode(worker_mode);
            if let Some(cache_name) = cache_name {
                config = config.with_cache_name(cache_name);
            }
            if !manifest.is_empty() {
                config = config.with_manifest(manifest);
            }
            block_on(run_worker(&registry, config, paths))?
        }
    }
}

async fn run_worker(
    registry: &WorkerRegistry,
    config: WorkerConfig,
    paths: Vec<String>,
) -> anyhow::Result<()> {
    let controller = WorkerCacheController::new(
        config,
        Arc::new(MemoryCacheStorage::new()),
        Arc::new(ReqwestAssetNetwork::new()?),
    );
    let report = registry.register(controller).await?;
    println!(
        "Worker active; deleted caches: {:?}; clients claimed: {}",
        report.deleted_caches, report.clients_claimed
    );

    let Some(active) = registry.active() else {
        bail!("worker did not activate");
    };
    let origin = &active.config().origin;
    for path in paths {
        let url = origin
            .join(&path)
            .with_context(|| format!("invalid path {path}"))?;
        let outcome = active.handle_fetch(&FetchRequest::get(url)).await?;
        let label = match outcome {
            FetchOutcome::Passthrough => "passthrough".to_string(),
            FetchOutcome::FromCache(response) => {
                format!("cache ({} bytes)", response.body.len())
            }
            FetchOutcome::FromNetwork(response) => {
                format!("network {} ({} bytes)", response.status, response.body.len())
            }
        };
        println!("{path}: {label}");
    }
    Ok(())
}

fn list_tools() {
    for tool in catalogue() {
        println!(
            "{:<18} {:<20} {:<26} {}",
            tool.id,
            tool.title,
            tool.endpoint,
            tool.accept.join(",")
        );
    }
}

fn lookup_tool(id: &str) -> anyhow::Result<ToolSpec> {
    find_tool(id).ok_or_else(|| anyhow!("unknown tool '{id}'; run `convert tools` for the list"))
}

/// Network failures deregister through `registry`, the one shared with `worker`.
fn effect_runner(api: ApiConfig, registry: Arc<WorkerRegistry>) -> EffectRunner {
    let config = EngineConfig {
        api,
        ..EngineConfig::default()
    };
    EffectRunner::new(config, registry)
}

fn block_on<F: std::future::Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    Ok(runtime.block_on(future))
}

/// Describes a file on disk the way a file picker would.
pub fn file_ref(path: &Path) -> anyhow::Result<FileRef> {
    let metadata =
        fs::metadata(path).with_context(|| format!("cannot read {}", path.display()))?;
    if !metadata.is_file() {
        bail!("{} is not a file", path.display());
    }
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", path.display()))?;
    let mut file = FileRef::new(path, name, metadata.len());
    if let Some(mime) = mime_guess::from_path(path).first() {
        file = file.with_mime_type(mime.essence_str());
    }
    Ok(file)
}

/// Runs one session to completion and saves the result into `out`.
pub fn run_single(
    runner: &EffectRunner,
    tool: ToolSpec,
    file: FileRef,
    options: ToolOptions,
    out: &Path,
) -> anyhow::Result<PathBuf> {
    if !tool.accepts(&file.name) {
        bail!(
            "{} accepts {}, not {}",
            tool.title,
            tool.accept.join(", "),
            file.name
        );
    }
    eprintln!("{} ({})", file.name, format_megabytes(file.size));

    let state = SessionState::new(tool);
    let (state, effects) = update(state, Msg::FileSelected(file));
    runner.enqueue(effects);
    let (state, effects) = update(state, Msg::OptionsChanged(options));
    runner.enqueue(effects);
    let (mut state, effects) = update(state, Msg::SubmitClicked);
    runner.enqueue(effects);

    while state.status().is_in_flight() {
        let msg = match runner.next_msg(POLL_INTERVAL) {
            Ok(msg) => msg,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => bail!("conversion engine stopped"),
        };
        let (next, effects) = update(state, msg);
        state = next;
        runner.enqueue(effects);
        if state.consume_dirty() {
            render_progress(&state);
        }
    }
    eprintln!();

    let outcome = match (state.status(), state.result(), state.error()) {
        (SessionStatus::Done, Some(result), _) => {
            save_result(runner.blobs(), &result.object_url, out, &result.filename)
                .context("saving converted file")
        }
        (_, _, Some(error)) => Err(anyhow!("{}", error.message)),
        (status, _, _) => Err(anyhow!("conversion ended in unexpected state {status:?}")),
    };

    // Releases the in-memory result either way.
    let (_, effects) = update(state, Msg::ResetClicked);
    runner.enqueue(effects);
    outcome
}

fn render_progress<E: ProgressEstimator>(state: &SessionState<E>) {
    let view = state.view();
    if let Some(label) = view.stage_label {
        eprint!("\r{:<16}{:>3}%", label, view.progress);
    }
}

/// Converts `files` one after another. Fails when any item failed, after
/// saving the ones that succeeded.
pub fn run_batch(
    runner: &EffectRunner,
    tool: ToolSpec,
    files: Vec<FileRef>,
    out: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let state = BatchState::new(tool);
    let (state, effects) = update_batch(state, BatchMsg::FilesAdded(files));
    runner.enqueue(effects);
    let (mut state, effects) = update_batch(state, BatchMsg::ProcessClicked);
    runner.enqueue(effects);

    while state.is_running() {
        let msg = match runner.next_batch_msg(POLL_INTERVAL) {
            Ok(Some(msg)) => msg,
            Ok(None) | Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => bail!("conversion engine stopped"),
        };
        let (next, effects) = update_batch(state, msg);
        state = next;
        runner.enqueue(effects);
        if state.consume_dirty() {
            let view = state.view();
            eprintln!(
                "{}/{} converted, {} failed",
                view.completed_count,
                view.rows.len(),
                view.error_count
            );
        }
    }

    let mut saved = Vec::new();
    for result in state.downloadable() {
        saved.push(
            save_result(runner.blobs(), &result.object_url, out, &result.filename)
                .with_context(|| format!("saving {}", result.filename))?,
        );
    }
    for item in state.items() {
        if let Some(error) = &item.error {
            eprintln!("{}: {}", item.file.name, error.message);
        }
    }
    let failed = state.error_count();
    let total = state.items().len();

    let (_, effects) = update_batch(state, BatchMsg::Cleared);
    runner.enqueue(effects);

    if failed > 0 {
        bail!("{failed} of {total} files failed");
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conversion_core::Effect;
    use conversion_engine::worker::InterceptMode;
    use tempfile::TempDir;

    #[test]
    fn file_ref_reads_size_and_mime_type() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.png");
        fs::write(&path, [0u8; 10]).unwrap();

        let file = file_ref(&path).unwrap();
        assert_eq!(file.name, "scan.png");
        assert_eq!(file.size, 10);
        assert_eq!(file.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn file_ref_rejects_directories_and_missing_files() {
        let dir = TempDir::new().unwrap();
        assert!(file_ref(dir.path()).is_err());
        assert!(file_ref(&dir.path().join("missing.pdf")).is_err());
    }

    #[test]
    fn deregistration_clears_workers_registered_by_this_process() {
        let registry = Arc::new(WorkerRegistry::new());
        let api = ApiConfig::with_base("http://127.0.0.1:9");
        let config = WorkerConfig::new(
            url::Url::parse("https://app.example.com").unwrap(),
            api.base_url().unwrap(),
        )
        .with_mode(InterceptMode::Disabled);
        block_on(run_worker(&registry, config, Vec::new()))
            .unwrap()
            .unwrap();
        assert_eq!(registry.registrations().len(), 1);

        let runner = effect_runner(api, registry.clone());
        runner.enqueue(vec![Effect::DeregisterWorkers]);
        runner.next_msg(Duration::from_secs(5)).unwrap();
        assert!(registry.registrations().is_empty());
        assert!(registry.active().is_none());
    }

    #[test]
    fn unknown_tool_is_an_error() {
        assert!(lookup_tool("pdf-to-fax").is_err());
        assert_eq!(lookup_tool("crop-pdf").unwrap().endpoint, "/edit/crop-pdf");
    }
}
