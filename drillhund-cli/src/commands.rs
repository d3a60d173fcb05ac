use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use parking_lot::Mutex;
use tracing::{info, warn};

use drillhund_config::DrillhundConfig;
use drillhund_core::time::VirtualClock;
use drillhund_engine::driver::{drain_virtual, transcript_hash};
use drillhund_engine::engine::{DrillEngine, TaskView};
use drillhund_engine::{DrillError, ScenarioProvider, TaskProvider, TaskService};
use drillhund_telemetry::metrics::MetricsRecorder;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay a scenario deterministically and print the transcript
    Replay(ReplayArgs),
    /// Run the built-in demo drill without any scenario files
    Demo(DemoArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// Scenario file to replay; defaults to looking the task up in the
    /// configured scenario directory.
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,
    /// Task id to load (defaults to the configured one)
    #[arg(long)]
    pub task: Option<String>,
    /// Answer indices submitted in order, e.g. --answers 0,2,1
    #[arg(long, value_delimiter = ',')]
    pub answers: Vec<usize>,
    /// Fail unless the transcript digest matches
    #[arg(long)]
    pub validate_hash: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DemoArgs {
    /// Answer indices submitted in order
    #[arg(long, value_delimiter = ',')]
    pub answers: Vec<usize>,
}

pub async fn run_replay_mode(
    args: ReplayArgs,
    config: DrillhundConfig,
    metrics: MetricsRecorder,
) -> Result<(), DrillError> {
    let provider: Arc<dyn TaskProvider> = match &args.scenario {
        Some(path) => Arc::new(ScenarioProvider::single(path.clone())),
        None => Arc::new(ScenarioProvider::new(config.scenario.dir.clone())),
    };
    let task_id = args
        .task
        .unwrap_or_else(|| config.scenario.default_task.clone());

    run_drill(
        Some(provider),
        &task_id,
        &args.answers,
        args.validate_hash.as_deref(),
        metrics,
    )
    .await
}

pub async fn run_demo_mode(args: DemoArgs, metrics: MetricsRecorder) -> Result<(), DrillError> {
    run_drill(None, "demo", &args.answers, None, metrics).await
}

async fn run_drill(
    provider: Option<Arc<dyn TaskProvider>>,
    task_id: &str,
    answers: &[usize],
    validate_hash: Option<&str>,
    metrics: MetricsRecorder,
) -> Result<(), DrillError> {
    let metrics = Arc::new(metrics);
    let clock = VirtualClock::new(0);
    let engine = Arc::new(Mutex::new(DrillEngine::new(clock.clone())));
    let service = TaskService::new(engine.clone(), provider, metrics.clone());

    service.load_task(task_id).await;
    if let Some(error) = &service.view().error {
        warn!(%error, "load finished with an advisory");
    }
    drain(&engine, &clock, &metrics);

    for &answer in answers {
        if engine.lock().session_finished() {
            info!("session already finished, remaining answers skipped");
            break;
        }
        service.select_option(answer);
        service.submit_answer().await;
        drain(&engine, &clock, &metrics);
    }

    let view = service.view();
    print_transcript(&view);

    let hash = transcript_hash(&view);
    println!("transcript digest: {hash}");
    if let Some(expected) = validate_hash {
        if expected != hash {
            return Err(DrillError::Validation(format!(
                "transcript digest mismatch\nExpected: {expected}\nActual: {hash}"
            )));
        }
        info!("transcript digest validated");
    }
    Ok(())
}

fn drain(
    engine: &Arc<Mutex<DrillEngine<VirtualClock>>>,
    clock: &VirtualClock,
    metrics: &Arc<MetricsRecorder>,
) {
    let mut engine = engine.lock();
    let delivered = drain_virtual(&mut engine, clock);
    metrics.record_deliveries(delivered, engine.pending_count());
}

fn print_transcript(view: &TaskView) {
    println!("== {} ==", view.title);
    if let Some(description) = &view.description {
        println!("{description}");
    }
    for terminal in &view.terminals {
        println!("\n-- [{}] {} --", terminal.id, terminal.title);
        for line in &terminal.log {
            println!("{line}");
        }
        if let Some(metrics) = &terminal.latest_metrics {
            let network = metrics
                .network
                .map(|value| format!(" | NET: {value} MB/s"))
                .unwrap_or_default();
            println!("gauge: CPU: {}% | RAM: {}%{network}", metrics.cpu, metrics.memory);
        }
        for capture in &terminal.captures {
            println!(
                "row: {} {} -> {} [{}] {}",
                capture.time, capture.source, capture.destination, capture.protocol, capture.info
            );
        }
    }
    println!();
    match &view.session_message {
        Some(message) => println!("session: {:?} - {message}", view.session_status),
        None => println!("session: {:?}", view.session_status),
    }
}
