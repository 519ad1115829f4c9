// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::assignment::WorkerRegistry;
use crate::core::types::DEFAULT_SENDER;
use crate::infra::errors::FlowingError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Registered workers, in assignment order.
    #[serde(default)]
    pub workers: Vec<WorkerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub initial_balance: f64,
    pub tasks_per_cycle: usize,
    pub cycles: u32,
    pub interval_seconds: f64,
    #[serde(default = "default_sender")]
    pub sender: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initial_balance: 100.0,
            tasks_per_cycle: 5,
            cycles: 3,
            interval_seconds: 2.0,
            sender: default_sender(),
        }
    }
}

impl ControllerConfig {
    /// Saturates instead of failing; `Config::validate` rejects bad values on load.
    pub fn interval(&self) -> Duration {
        duration_from_secs("interval_seconds", self.interval_seconds).unwrap_or(Duration::MAX)
    }
}

/// Seconds from config or a flag as a `Duration`. Negative values mean zero;
/// NaN, infinity and values too large for a `Duration` are rejected.
pub fn duration_from_secs(field: &str, secs: f64) -> Result<Duration, FlowingError> {
    if secs.is_nan() {
        return Err(FlowingError::Config(format!("{field} must be a number")));
    }
    Duration::try_from_secs_f64(secs.max(0.0))
        .map_err(|_| FlowingError::Config(format!("{field} is out of range: {secs}")))
}

fn default_sender() -> String {
    DEFAULT_SENDER.into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub timeout_seconds: f64,
    /// In-flight dispatch calls per cycle. 0 means one per registered worker.
    #[serde(default)]
    pub max_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 5.0,
            max_concurrency: 0,
        }
    }
}

impl DispatchConfig {
    /// Saturates instead of failing; `Config::validate` rejects bad values on load.
    pub fn timeout(&self) -> Duration {
        duration_from_secs("timeout_seconds", self.timeout_seconds).unwrap_or(Duration::MAX)
    }

    /// Effective concurrency bound for a registry of `workers` entries.
    pub fn concurrency_for(&self, workers: usize) -> usize {
        match self.max_concurrency {
            0 => workers.max(1),
            n => n,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub trace_dir: Option<PathBuf>,
}

impl ObservabilityConfig {
    pub fn trace_dir(&self) -> PathBuf {
        self.trace_dir.clone().unwrap_or_else(paths::traces_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerEntry {
    pub id: String,
    pub url: String,
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject durations that cannot be represented.
    pub fn validate(&self) -> Result<(), FlowingError> {
        duration_from_secs("controller.interval_seconds", self.controller.interval_seconds)?;
        duration_from_secs("dispatch.timeout_seconds", self.dispatch.timeout_seconds)?;
        Ok(())
    }

    /// Build the validated worker registry from the `[[workers]]` entries.
    pub fn registry(&self) -> Result<WorkerRegistry, FlowingError> {
        let mut registry = WorkerRegistry::new();
        for entry in &self.workers {
            registry.register(&entry.id, &entry.url)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert!((c.controller.initial_balance - 100.0).abs() < 0.001);
        assert_eq!(c.controller.tasks_per_cycle, 5);
        assert_eq!(c.controller.cycles, 3);
        assert_eq!(c.controller.interval(), Duration::from_secs(2));
        assert_eq!(c.controller.sender, "AutonomousController");
        assert_eq!(c.dispatch.timeout(), Duration::from_secs(5));
        assert!(!c.observability.trace);
        assert!(c.workers.is_empty());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.controller.cycles, 3);
        assert_eq!(config.dispatch.max_concurrency, 0);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[controller]
initial_balance = 50.0
tasks_per_cycle = 8
cycles = 10
interval_seconds = 0.5

[dispatch]
timeout_seconds = 1.5
max_concurrency = 1

[observability]
trace = true
trace_dir = "/tmp/flowing-traces"

[[workers]]
id = "AgentB"
url = "http://localhost:5001"

[[workers]]
id = "AgentA"
url = "http://localhost:5000"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!((config.controller.initial_balance - 50.0).abs() < 0.001);
        assert_eq!(config.controller.tasks_per_cycle, 8);
        assert_eq!(config.controller.interval(), Duration::from_millis(500));
        assert_eq!(config.controller.sender, "AutonomousController");
        assert_eq!(config.dispatch.timeout(), Duration::from_millis(1500));
        assert_eq!(config.dispatch.concurrency_for(4), 1);
        assert!(config.observability.trace);
        assert_eq!(
            config.observability.trace_dir(),
            PathBuf::from("/tmp/flowing-traces")
        );

        let registry = config.registry().unwrap();
        let ids: Vec<&str> = registry.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["AgentB", "AgentA"]);
    }

    #[test]
    fn test_concurrency_defaults_to_worker_count() {
        let d = DispatchConfig::default();
        assert_eq!(d.concurrency_for(3), 3);
        assert_eq!(d.concurrency_for(0), 1);
    }

    #[test]
    fn test_registry_rejects_bad_url() {
        let config = Config {
            workers: vec![WorkerEntry {
                id: "AgentA".into(),
                url: "not a url".into(),
            }],
            ..Default::default()
        };
        assert!(matches!(
            config.registry(),
            Err(FlowingError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.controller.cycles, config.controller.cycles);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[controller]\ninitial_balance = 10.0\ntasks_per_cycle = 2\ncycles = 1\ninterval_seconds = 0.0\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.controller.tasks_per_cycle, 2);
        assert_eq!(config.controller.interval(), Duration::ZERO);
    }

    #[test]
    fn test_unrepresentable_durations_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        for (section, value) in [
            ("[controller]\ninterval_seconds", "inf"),
            ("[controller]\ninterval_seconds", "1e30"),
            ("[dispatch]\ntimeout_seconds", "inf"),
            ("[dispatch]\ntimeout_seconds", "nan"),
        ] {
            let path = dir.path().join("config.toml");
            let body = if section.starts_with("[controller]") {
                format!("{section} = {value}\ninitial_balance = 1.0\ntasks_per_cycle = 1\ncycles = 1\n")
            } else {
                format!("{section} = {value}\n")
            };
            std::fs::write(&path, body).unwrap();
            let err = Config::load_from(&path).unwrap_err();
            assert!(
                err.to_string().contains("Configuration error"),
                "{section} = {value}: {err}"
            );
        }
    }

    #[test]
    fn test_duration_accessors_do_not_panic() {
        let mut config: Config = toml::from_str("[controller]\ninterval_seconds = inf\ninitial_balance = 1.0\ntasks_per_cycle = 1\ncycles = 1\n").unwrap();
        assert_eq!(config.controller.interval(), Duration::MAX);
        config.dispatch.timeout_seconds = 1e30;
        assert_eq!(config.dispatch.timeout(), Duration::MAX);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_from_secs() {
        assert_eq!(duration_from_secs("x", -3.0).unwrap(), Duration::ZERO);
        assert_eq!(duration_from_secs("x", 0.25).unwrap(), Duration::from_millis(250));
        assert!(matches!(
            duration_from_secs("x", f64::INFINITY),
            Err(FlowingError::Config(_))
        ));
        assert!(duration_from_secs("x", 1e30).is_err());
        assert!(duration_from_secs("x", f64::NAN).is_err());
    }
}
