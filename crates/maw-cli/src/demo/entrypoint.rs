use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::info;
use maw_common::config::{AppConfig, TelemetryConfig};
use maw_execution::error::{ExecutionError, ExecutionResult};
use maw_execution::job::{Job, JobOutcome};
use maw_execution::transport::LocalCluster;
use maw_execution::{Engine, EngineOptions};
use maw_telemetry::telemetry::{init_telemetry, shutdown_telemetry};

use crate::demo::job::{DemoJob, MAX_SLOWDOWN};
use crate::runner::DemoArgs;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    with_telemetry(&config.telemetry, || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(demo(&config, args))?;
        Ok(())
    })
}

/// Runs the function with telemetry initialized, and shuts telemetry down
/// whether the function succeeds or not.
fn with_telemetry<T>(
    config: &TelemetryConfig,
    f: impl FnOnce() -> Result<T, Box<dyn std::error::Error>>,
) -> Result<T, Box<dyn std::error::Error>> {
    init_telemetry(config)?;
    let result = f();
    shutdown_telemetry();
    result
}

fn validate(args: &DemoArgs) -> ExecutionResult<()> {
    if args.workers == 0 {
        return Err(ExecutionError::InvalidArgument(
            "at least one worker is required".to_string(),
        ));
    }
    if let Some(factor) = args
        .slowdown
        .iter()
        .find(|x| !(0.0..=MAX_SLOWDOWN).contains(*x))
    {
        return Err(ExecutionError::InvalidArgument(format!(
            "slowdown factor {factor} is not in the range [0, {MAX_SLOWDOWN}]"
        )));
    }
    Ok(())
}

async fn demo(config: &AppConfig, args: DemoArgs) -> ExecutionResult<()> {
    validate(&args)?;
    let options = EngineOptions::new(config);
    let cluster = LocalCluster::new();
    let master = cluster.launch(options.clone())?;
    let mut workers = vec![];
    let mut slowdown = HashMap::new();
    for i in 0..args.workers {
        let worker = cluster.launch(options.clone())?;
        let factor = args.slowdown.get(i).copied().unwrap_or(1.0);
        info!("worker {} has slowdown factor {factor}", worker.node());
        slowdown.insert(Engine::thread_name(worker.node()), factor);
        workers.push(worker);
    }

    let job: Arc<dyn Job> = Arc::new(DemoJob {
        base: Duration::from_millis(args.job_millis),
        slowdown,
        fail_every: args.fail_every,
    });
    let started = Instant::now();
    let tickets = (0..args.jobs as u64)
        .map(|i| master.submit(Arc::clone(&job), i.to_le_bytes().to_vec()))
        .collect::<Vec<_>>();
    master.end_submissions();

    let mut succeeded = 0;
    let mut failed = 0;
    let mut abandoned = 0;
    for ticket in tickets {
        match ticket.wait().await? {
            JobOutcome::Succeeded { .. } => succeeded += 1,
            JobOutcome::Failed { .. } => failed += 1,
            JobOutcome::Abandoned { .. } => abandoned += 1,
        }
    }
    let elapsed = started.elapsed();

    let report = master.wait_for_stop().await.ok_or_else(|| {
        ExecutionError::InternalError("the master stopped without a report".to_string())
    })?;
    for worker in workers {
        worker.wait_for_stop().await;
    }

    println!(
        "{} job(s) in {:.3}s: {succeeded} succeeded, {failed} failed, {abandoned} abandoned",
        args.jobs,
        elapsed.as_secs_f64()
    );
    let total = report.workers.iter().map(|x| x.completed).sum::<u64>().max(1);
    for worker in &report.workers {
        println!(
            "worker {}: {} job(s) ({:.1}%), average {:.3}s over {} sample(s)",
            worker.worker,
            worker.completed,
            worker.completed as f64 * 100.0 / total as f64,
            worker.average_seconds,
            worker.sample_count
        );
    }
    println!(
        "master: message handling {:.3}s, request handling {:.3}s, idle {:.3}s",
        report.message_handling_time.as_secs_f64(),
        report.requests_handling_time.as_secs_f64(),
        report.idle_time.as_secs_f64()
    );
    Ok(())
}
