use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use cadence_core::config::{CadenceConfig, LogFormat, LoggingConfig};
use cadence_core::domain::{
    PendingReason, PendingRequestId, PendingTaskId, Placement, RequestPatch, RequestSubmission,
    Task, normalize_schedule,
};
use cadence_core::impls::{InMemoryCoordinationStore, TimeoutStore};
use cadence_core::ports::{Clock, ClusterView, DriverStatus, HostInfo, LocalHost, SystemClock};
use cadence_core::{RequestManager, StateGenerator, TaskManager};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(about = "Scheduler state-coordination tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file (missing file means defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a request submission (JSON) and print the canonical definition
    Validate { file: PathBuf },

    /// Translate a cron expression into the 6/7-field form
    Cron { expr: String },

    /// Run one request through its whole lifecycle against an in-memory store
    Demo,
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
            .context("failed to install json logger")?,
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()
            .context("failed to install pretty logger")?,
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config =
        CadenceConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_logging(&config.logging)?;

    match cli.command {
        Command::Validate { file } => validate(&file),
        Command::Cron { expr } => cron(&expr),
        Command::Demo => {
            demo(&config).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn validate(file: &Path) -> Result<ExitCode> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let submission: RequestSubmission = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a request submission", file.display()))?;

    match submission.validate() {
        Ok(definition) => {
            println!("{}", serde_json::to_string_pretty(&definition)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("invalid request: {err}");
            Ok(ExitCode::from(2))
        }
    }
}

fn cron(expr: &str) -> Result<ExitCode> {
    match normalize_schedule(expr) {
        Ok(schedule) => {
            println!("{schedule}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{err}");
            Ok(ExitCode::from(2))
        }
    }
}

/// Cluster state reported by the demo's pretend offer loop.
struct DemoCluster {
    last_offer_at: Mutex<Option<DateTime<Utc>>>,
}

impl DemoCluster {
    fn offer_received(&self, at: DateTime<Utc>) {
        if let Ok(mut last) = self.last_offer_at.lock() {
            *last = Some(at);
        }
    }
}

impl ClusterView for DemoCluster {
    fn is_leader(&self) -> bool {
        true
    }

    fn driver_status(&self) -> DriverStatus {
        DriverStatus::Running
    }

    fn last_offer_at(&self) -> Option<DateTime<Utc>> {
        self.last_offer_at.lock().ok().and_then(|last| *last)
    }

    fn master_address(&self) -> Option<String> {
        None
    }
}

async fn demo(config: &CadenceConfig) -> Result<()> {
    let store = Arc::new(TimeoutStore::new(
        InMemoryCoordinationStore::new(),
        config.store.operation_timeout(),
    ));
    let requests = RequestManager::new(store.clone(), &config.layout);
    let tasks = TaskManager::new(store, &config.layout);

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cluster = Arc::new(DemoCluster {
        last_offer_at: Mutex::new(None),
    });
    let host = Arc::new(LocalHost);
    let hostname = host.hostname().unwrap_or_else(|| "localhost".to_string());
    let state = StateGenerator::new(
        requests.clone(),
        tasks.clone(),
        cluster.clone(),
        host,
        clock.clone(),
    );

    // 1) 検証して保存
    let definition = RequestSubmission {
        id: Some("demo-report".into()),
        command: Some("./report.sh".into()),
        schedule: Some("*/15 * * * *".into()),
        ..Default::default()
    }
    .validate()
    .context("demo request is invalid")?;
    info!(schedule = ?definition.schedule(), "validated request");
    requests.persist(&definition).await?;

    // 2) 更新も同じ persist で上書き
    let patch = RequestPatch {
        command: Some("./report.sh --full".into()),
        ..Default::default()
    };
    let updated = definition.with_overrides(&patch).validate()?;
    requests.persist(&updated).await?;

    // 3) pending run を投入し、タスクマーカーに展開
    let now = epoch_millis(clock.as_ref())?;
    requests
        .enqueue_pending_run(&PendingRequestId::new(updated.id(), PendingReason::Manual, now))
        .await?;

    let pending_runs = requests.pending_requests().await?;
    for run in &pending_runs.entries {
        let task_ids: Vec<_> = (1..=updated.instances())
            .map(|instance_no| PendingTaskId::new(run.request_id(), now, instance_no))
            .collect();
        let report = tasks.schedule(&task_ids).await;
        for (task_id, err) in &report.failed {
            warn!(task_id = %task_id, error = %err, "could not schedule task");
        }
        requests.dequeue_pending_run(run).await?;
    }

    // 4) オファーが来た体で launch
    cluster.offer_received(clock.now());
    let mut pending_tasks = tasks.pending_task_ids().await?.entries;
    pending_tasks.sort();
    let started_at = epoch_millis(clock.as_ref())?;
    for task_request in requests.fetch_task_requests(&pending_tasks).await? {
        let placement = Placement {
            host: hostname.clone(),
            ..Default::default()
        };
        tasks
            .launch(&Task::new(task_request, started_at, placement))
            .await?;
    }

    println!("{}", serde_json::to_string_pretty(&state.state().await?)?);

    // 5) 終了したタスクを片付け、リクエストを削除
    for task in tasks.active_tasks().await? {
        tasks.teardown(task.task_id()).await?;
    }
    if let Some(deleted) = requests.delete(updated.id()).await? {
        info!(request_id = deleted.id(), "request deleted, cleaning up");
        requests.remove_from_cleanup(deleted.id()).await?;
    }

    println!("{}", serde_json::to_string_pretty(&state.state().await?)?);
    Ok(())
}

fn epoch_millis(clock: &dyn Clock) -> Result<u64> {
    u64::try_from(clock.now_millis()).context("system clock is before the epoch")
}
