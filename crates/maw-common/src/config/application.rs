use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::config::loader::{deserialize_non_empty_string, deserialize_non_zero};
use crate::error::{CommonError, CommonResult};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub scheduler: SchedulerConfig,
    pub estimator: EstimatorConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> CommonResult<Self> {
        Self::from_figment(
            Figment::from(Toml::string(DEFAULT_CONFIG))
                .admerge(Env::prefixed("MAW__").map(|p| p.as_str().replace("__", ".").into())),
        )
    }

    /// Loads the default configuration without looking at the environment.
    pub fn load_default() -> CommonResult<Self> {
        Self::from_figment(Figment::from(Toml::string(DEFAULT_CONFIG)))
    }

    fn from_figment(figment: Figment) -> CommonResult<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CommonResult<()> {
        if self.scheduler.max_outstanding_per_worker == 0 {
            return Err(CommonError::invalid(
                "scheduler.max_outstanding_per_worker must be positive",
            ));
        }
        if !(self.estimator.decay_alpha > 0.0 && self.estimator.decay_alpha < 1.0) {
            return Err(CommonError::invalid(format!(
                "estimator.decay_alpha must be in the range (0, 1), got {}",
                self.estimator.decay_alpha
            )));
        }
        if !(self.engine.long_sleep_ratio > 0.0 && self.engine.long_sleep_ratio <= 1.0) {
            return Err(CommonError::invalid(format!(
                "engine.long_sleep_ratio must be in the range (0, 1], got {}",
                self.engine.long_sleep_ratio
            )));
        }
        if self.engine.sleep_interval_millis == 0 {
            return Err(CommonError::invalid(
                "engine.sleep_interval_millis must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sleep_interval_millis: u64,
    pub long_sleep_ratio: f64,
    pub transport_shutdown_timeout_millis: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectorKind {
    Learning,
    RoundRobin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub selector: SelectorKind,
    pub max_outstanding_per_worker: usize,
    /// The value 0 in the configuration source means unlimited attempts.
    #[serde(deserialize_with = "deserialize_non_zero")]
    pub job_max_attempts: Option<usize>,
    pub learn_from_failures: bool,
    pub account_queued_work: bool,
    /// The value 0 in the configuration source means the seed comes from the operating system.
    #[serde(deserialize_with = "deserialize_non_zero")]
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimatorKind {
    Exact,
    Decay,
    LogExact,
    LogDecay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub kind: EstimatorKind,
    pub decay_alpha: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    pub log_filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn test_load_default_config() -> CommonResult<()> {
        let config = AppConfig::load_default()?;
        assert_eq!(config.engine.sleep_interval_millis, 1000);
        assert_eq!(config.scheduler.selector, SelectorKind::Learning);
        assert_eq!(config.scheduler.max_outstanding_per_worker, 2);
        assert_eq!(config.scheduler.job_max_attempts, Some(4));
        assert_eq!(config.scheduler.rng_seed, None);
        assert_eq!(config.estimator.kind, EstimatorKind::Exact);
        assert_eq!(config.telemetry.log_filter.as_deref(), Some("info"));
        Ok(())
    }

    #[test]
    fn test_load_config_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("MAW__SCHEDULER__MAX_OUTSTANDING_PER_WORKER", "4");
            jail.set_env("MAW__SCHEDULER__SELECTOR", "round-robin");
            jail.set_env("MAW__SCHEDULER__RNG_SEED", "42");
            jail.set_env("MAW__SCHEDULER__JOB_MAX_ATTEMPTS", "0");
            jail.set_env("MAW__ESTIMATOR__KIND", "log-decay");
            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.scheduler.max_outstanding_per_worker, 4);
            assert_eq!(config.scheduler.selector, SelectorKind::RoundRobin);
            assert_eq!(config.scheduler.rng_seed, Some(42));
            assert_eq!(config.scheduler.job_max_attempts, None);
            assert_eq!(config.estimator.kind, EstimatorKind::LogDecay);
            Ok(())
        });
    }

    #[test]
    fn test_reject_malformed_config() {
        Jail::expect_with(|jail| {
            jail.set_env("MAW__ESTIMATOR__KIND", "median");
            assert!(matches!(AppConfig::load(), Err(CommonError::ConfigError(_))));
            Ok(())
        });
    }

    #[test]
    fn test_reject_invalid_config() {
        Jail::expect_with(|jail| {
            jail.set_env("MAW__ESTIMATOR__DECAY_ALPHA", "1.5");
            assert!(matches!(
                AppConfig::load(),
                Err(CommonError::InvalidArgument(_))
            ));
            jail.set_env("MAW__ESTIMATOR__DECAY_ALPHA", "0.5");
            jail.set_env("MAW__SCHEDULER__MAX_OUTSTANDING_PER_WORKER", "0");
            assert!(matches!(
                AppConfig::load(),
                Err(CommonError::InvalidArgument(_))
            ));
            Ok(())
        });
    }
}
