// Configuration management with layered configuration (file, env)

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Source of the current runtime assault cron expression.
///
/// The scheduler re-reads through this seam on every reload; implementations
/// must return the live value, not a snapshot taken at construction.
#[cfg_attr(test, mockall::automock)]
pub trait ScheduleConfigSource: Send + Sync {
    /// Current cron expression driving runtime assaults, or the `OFF`
    /// sentinel when scheduling is disabled.
    fn runtime_assault_cron_expression(&self) -> String;
}

/// Assault configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssaultProperties {
    /// Cron expression for runtime assaults, or `"OFF"` to disable.
    #[serde(default = "default_cron_expression")]
    pub runtime_assault_cron_expression: String,
    /// Whether the kill-application assault may run.
    #[serde(default)]
    pub kill_application_active: bool,
    /// Whether the memory assault may run.
    #[serde(default)]
    pub memory_active: bool,
    /// How many bytes the memory assault allocates per attack.
    #[serde(default = "default_memory_fill_target_bytes")]
    pub memory_fill_target_bytes: usize,
    /// How long the memory assault holds its allocation before releasing.
    #[serde(default = "default_memory_hold_millis")]
    pub memory_hold_millis: u64,
}

fn default_cron_expression() -> String {
    crate::scheduler::SCHEDULE_OFF.to_string()
}

fn default_memory_fill_target_bytes() -> usize {
    256 * 1024 * 1024
}

fn default_memory_hold_millis() -> u64 {
    90_000
}

impl Default for AssaultProperties {
    fn default() -> Self {
        Self {
            runtime_assault_cron_expression: default_cron_expression(),
            kill_application_active: false,
            memory_active: false,
            memory_fill_target_bytes: default_memory_fill_target_bytes(),
            memory_hold_millis: default_memory_hold_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Main settings structure containing all configuration options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub assaults: AssaultProperties,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Load configuration with layered precedence: defaults → file → env
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path("config")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default configuration
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Add local configuration (not committed to git)
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // Add environment-specific configuration
            .add_source(
                Environment::with_prefix("CHAOS")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

/// Live, shared view over [`AssaultProperties`].
///
/// The owning application updates it when configuration changes and then
/// calls `reload()` on the scheduler, which observes the new expression
/// through [`ScheduleConfigSource`].
#[derive(Clone, Default)]
pub struct SharedAssaultProperties {
    inner: Arc<RwLock<AssaultProperties>>,
}

impl SharedAssaultProperties {
    pub fn new(properties: AssaultProperties) -> Self {
        Self {
            inner: Arc::new(RwLock::new(properties)),
        }
    }

    /// Snapshot of the current properties.
    pub fn get(&self) -> AssaultProperties {
        self.inner
            .read()
            .expect("assault properties lock poisoned")
            .clone()
    }

    /// Replace the current properties.
    pub fn set(&self, properties: AssaultProperties) {
        *self
            .inner
            .write()
            .expect("assault properties lock poisoned") = properties;
    }
}

impl ScheduleConfigSource for SharedAssaultProperties {
    fn runtime_assault_cron_expression(&self) -> String {
        self.inner
            .read()
            .expect("assault properties lock poisoned")
            .runtime_assault_cron_expression
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_disable_scheduling() {
        let settings = Settings::default();
        assert_eq!(
            settings.assaults.runtime_assault_cron_expression,
            crate::scheduler::SCHEDULE_OFF
        );
        assert!(!settings.assaults.kill_application_active);
        assert!(!settings.assaults.memory_active);
    }

    #[test]
    fn test_load_from_missing_dir_falls_back_to_defaults() {
        let settings = Settings::load_from_path("does-not-exist").unwrap();
        assert_eq!(
            settings.assaults.runtime_assault_cron_expression,
            crate::scheduler::SCHEDULE_OFF
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.toml"),
            r#"
[assaults]
runtime_assault_cron_expression = "*/5 * * * * ?"
memory_active = true
memory_fill_target_bytes = 1048576

[observability]
log_level = "debug"
"#,
        )
        .unwrap();

        let settings = Settings::load_from_path(dir.path()).unwrap();
        assert_eq!(
            settings.assaults.runtime_assault_cron_expression,
            "*/5 * * * * ?"
        );
        assert!(settings.assaults.memory_active);
        assert_eq!(settings.assaults.memory_fill_target_bytes, 1_048_576);
        assert_eq!(settings.observability.log_level, "debug");
        // Unset fields keep their defaults
        assert!(!settings.assaults.kill_application_active);
    }

    #[test]
    fn test_shared_properties_expose_live_value() {
        let shared = SharedAssaultProperties::default();
        assert_eq!(
            shared.runtime_assault_cron_expression(),
            crate::scheduler::SCHEDULE_OFF
        );

        let mut updated = shared.get();
        updated.runtime_assault_cron_expression = "*/1 * * * * ?".to_string();
        shared.set(updated);

        assert_eq!(shared.runtime_assault_cron_expression(), "*/1 * * * * ?");
    }
}
