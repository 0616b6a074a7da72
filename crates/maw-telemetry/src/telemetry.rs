use std::io::Write;
use std::sync::Mutex;
use std::thread;

use log::debug;
use maw_common::config::TelemetryConfig;

use crate::error::{TelemetryError, TelemetryResult};

enum TelemetryStatus {
    Uninitialized,
    Initialized,
    Failed,
    Finalized,
}

static TELEMETRY_STATUS: Mutex<TelemetryStatus> = Mutex::new(TelemetryStatus::Uninitialized);

const DEFAULT_LOG_FILTER: &str = "info";

pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    let mut status = TELEMETRY_STATUS
        .lock()
        .map_err(|e| TelemetryError::internal(e.to_string()))?;

    match *status {
        TelemetryStatus::Uninitialized => match init_logs(config) {
            Ok(()) => {
                debug!("telemetry initialized");
                *status = TelemetryStatus::Initialized;
                Ok(())
            }
            Err(e) => {
                *status = TelemetryStatus::Failed;
                Err(e)
            }
        },
        TelemetryStatus::Initialized => {
            Err(TelemetryError::internal("telemetry already initialized"))
        }
        TelemetryStatus::Failed => Err(TelemetryError::internal(
            "telemetry failed to initialize previously",
        )),
        TelemetryStatus::Finalized => Err(TelemetryError::internal(
            "telemetry has been finalized and cannot be re-initialized",
        )),
    }
}

pub fn shutdown_telemetry() {
    let Ok(mut status) = TELEMETRY_STATUS.lock() else {
        return;
    };
    if let TelemetryStatus::Initialized = *status {
        log::logger().flush();
        *status = TelemetryStatus::Finalized;
    }
}

fn init_logs(config: &TelemetryConfig) -> TelemetryResult<()> {
    let filter = config
        .log_filter
        .clone()
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter))
        .format(move |buf, record| {
            let level = record.level();
            let target = record.target();
            let style = buf.default_level_style(level);
            let timestamp = buf.timestamp();
            let current = thread::current();
            let thread = current.name().unwrap_or("unnamed");
            let args = record.args();
            writeln!(
                buf,
                "[{timestamp} {style}{level}{style:#} {thread} {target}] {args}"
            )
        })
        .try_init()?;
    Ok(())
}
