use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use suitehooks::{
    CommandExecutor, HookFunction, HookOutput, HookReference, HookRegistry, LifecycleRunner,
    RunConfig, TestCommand, TestId, TracingReporter,
};

const DEFAULT_GLOBAL_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_WORKERS: usize = 2;
const DEFAULT_LOG_DIRECTIVE: &str = "info";
const WORKSPACE_VAR: &str = "SUITEHOOKS_DEMO_WORKSPACE";

#[tokio::main]
async fn main() -> Result<()> {
    init_example_tracing();

    let timeout_ms =
        parse_env_with_default::<u64>("SUITEHOOKS_GLOBAL_TIMEOUT_MS", DEFAULT_GLOBAL_TIMEOUT_MS)?;
    let workers = parse_env_with_default::<usize>("SUITEHOOKS_WORKERS", DEFAULT_WORKERS)?;
    ensure!(workers > 0, "SUITEHOOKS_WORKERS must be greater than 0");

    let config_dir = env::current_dir().context("failed to read the current directory")?;
    let config = RunConfig::builder()
        .config_dir(config_dir)
        .global_setup(HookReference::parse("./global-setup")?)
        .global_timeout(Duration::from_millis(timeout_ms))
        .workers(workers)
        .project("demo")
        .build()?;

    let mut registry = HookRegistry::new();
    registry.register_file(
        config.config_dir().join("global-setup"),
        HookFunction::new(|_config| async { prepare_workspace() }),
    );

    let commands = vec![
        TestCommand::shell(
            TestId::in_project("demo", "workspace.spec"),
            format!(r#"test -d "${WORKSPACE_VAR}" && echo "workspace at ${WORKSPACE_VAR}""#),
        ),
        TestCommand::shell(
            TestId::in_project("demo", "write.spec"),
            format!(r#"echo ok > "${WORKSPACE_VAR}/write.txt""#),
        ),
        TestCommand::shell(
            TestId::in_project("demo", "read.spec"),
            format!(r#"ls "${WORKSPACE_VAR}""#),
        ),
    ];

    let summary = LifecycleRunner::new(
        config,
        registry,
        CommandExecutor::new(commands),
        TracingReporter,
    )
    .run()
    .await;

    println!(
        "{:?}: setup {}, {} hook(s) invoked, exit code {}",
        summary.outcome,
        if summary.ran_setup { "ran" } else { "skipped" },
        summary.telemetry.hooks_invoked,
        summary.exit_code()
    );
    std::process::exit(summary.exit_code());
}

/// Creates a scratch workspace, exports it to the test processes and hands
/// back a teardown that removes it again.
fn prepare_workspace() -> Result<HookOutput> {
    let workspace = env::temp_dir().join(format!("suitehooks-demo-{}", std::process::id()));
    std::fs::create_dir_all(&workspace)
        .with_context(|| format!("failed to create {}", workspace.display()))?;
    env::set_var(WORKSPACE_VAR, &workspace);
    tracing::info!(workspace = %workspace.display(), "demo workspace ready");

    Ok(HookOutput::teardown(move |_config| {
        let workspace = workspace.clone();
        async move {
            std::fs::remove_dir_all(&workspace)
                .with_context(|| format!("failed to remove {}", workspace.display()))?;
            tracing::info!(workspace = %workspace.display(), "demo workspace removed");
            Ok(HookOutput::None)
        }
    }))
}

fn init_example_tracing() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", DEFAULT_LOG_DIRECTIVE);
    }
    suitehooks::init_tracing();
}

fn parse_env_with_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("failed to parse {key}='{value}'")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("failed to read {key}")),
    }
}
