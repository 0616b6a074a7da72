use std::time::Duration;

use maw_common::config::AppConfig;

use crate::scheduler::SchedulerOptions;

#[readonly::make]
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// The maximum time the engine waits for an event when it has nothing to do.
    pub sleep_interval: Duration,
    /// A wait longer than this fraction of the sleep interval triggers a state dump.
    pub long_sleep_ratio: f64,
    pub transport_shutdown_timeout: Duration,
    pub scheduler: SchedulerOptions,
}

impl EngineOptions {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            sleep_interval: Duration::from_millis(config.engine.sleep_interval_millis),
            long_sleep_ratio: config.engine.long_sleep_ratio,
            transport_shutdown_timeout: Duration::from_millis(
                config.engine.transport_shutdown_timeout_millis,
            ),
            scheduler: SchedulerOptions::new(config),
        }
    }
}
