use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::progress::{DelayThresholds, ProgressSettings};
use crate::workflow::{Role, RolePolicy};

/// Main configuration structure for the project monitor
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProjectMonitorConfig {
    /// Logging and metrics settings
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Progress aggregation settings
    #[serde(default)]
    pub progress: ProgressSettings,
    /// Severity thresholds for overdue milestones
    #[serde(default)]
    pub delays: DelayThresholds,
    /// Workflow authorization overrides
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Database settings (optional)
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
    pub log_format: LogFormat,
    /// Enable in-process metrics counters
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            metrics_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Role overrides keyed by `"from->to"`, `"manage_milestones"` or
    /// `"validate_milestones"`
    #[serde(default)]
    pub permissions: HashMap<String, Vec<Role>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://project-monitor.db".to_string(),
            max_connections: 5,
            auto_migrate: true,
        }
    }
}

impl Default for ProjectMonitorConfig {
    fn default() -> Self {
        Self {
            observability: ObservabilityConfig::default(),
            progress: ProgressSettings::default(),
            delays: DelayThresholds::default(),
            workflow: WorkflowConfig::default(),
            database: Some(DatabaseConfig::default()),
        }
    }
}

impl ProjectMonitorConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. project-monitor.toml in the working directory
    /// 3. Environment variables (PROJECT_MONITOR__SECTION__KEY)
    pub fn load() -> Result<Self> {
        let file = Path::new("project-monitor.toml");
        Self::load_with(file.exists().then_some(file))
    }

    /// Same as [`load`](Self::load) with an explicit configuration file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with(Some(path.as_ref()))
    }

    fn load_with(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(file) = file {
            builder = builder.add_source(File::from(file));
        }

        builder = builder.add_source(
            Environment::with_prefix("PROJECT_MONITOR")
                .separator("__")
                .try_parsing(true),
        );

        let config: ProjectMonitorConfig = builder.build()?.try_deserialize()?;
        // Reject bad permission keys at load time rather than at first use
        config.role_policy()?;
        Ok(config)
    }

    /// Default role policy with the configured overrides applied.
    pub fn role_policy(&self) -> Result<RolePolicy> {
        RolePolicy::default()
            .with_overrides(&self.workflow.permissions)
            .map_err(|e| anyhow::anyhow!("Invalid workflow.permissions entry: {}", e))
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<ProjectMonitorConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = ProjectMonitorConfig::load_env_file();
        ProjectMonitorConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static ProjectMonitorConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}

/// Initialize configuration (called at startup)
pub fn init_config() -> Result<()> {
    let _config = config()?;
    tracing::info!("Configuration loaded successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::Percent;
    use crate::workflow::{Actor, AuthorizationPolicy, Permission, TransitionEdge, WorkflowStatus};

    #[test]
    fn test_saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project-monitor.toml");
        let mut original = ProjectMonitorConfig::default();
        original.progress.strict_weights = true;
        original.delays.critical_days = 45;
        original.save_to_file(&path).unwrap();

        let loaded = ProjectMonitorConfig::load_from(&path).unwrap();

        assert!(loaded.progress.strict_weights);
        assert_eq!(loaded.delays.critical_days, 45);
        assert_eq!(loaded.delays.critical_weight, Percent::whole(50));
    }

    #[test]
    fn test_permission_override_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overrides.toml");
        std::fs::write(
            &path,
            r#"
[workflow.permissions]
"ongoing->completed" = ["implementing_unit"]
"#,
        )
        .unwrap();

        let loaded = ProjectMonitorConfig::load_from(&path).unwrap();

        let policy = loaded.role_policy().unwrap();
        let complete = Permission::Transition(TransitionEdge::new(
            WorkflowStatus::Ongoing,
            WorkflowStatus::Completed,
        ));
        assert!(policy.can_perform(&Actor::with_role(Role::ImplementingUnit), &complete));
        assert!(!policy.can_perform(&Actor::with_role(Role::Secretariat), &complete));
    }

    #[test]
    fn test_illegal_permission_key_is_rejected() {
        let mut config = ProjectMonitorConfig::default();
        config
            .workflow
            .permissions
            .insert("draft->ongoing".to_string(), vec![Role::Secretariat]);
        assert!(config.role_policy().is_err());
    }
}
