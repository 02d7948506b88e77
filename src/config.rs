use crate::recovery::{Backoff, RecoveryPolicy};
use crate::supervisor::SupervisorConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CasebotConfig {
    pub monitor: MonitorConfig,
    pub chat: ChatConfig,
    pub model: ModelConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Seconds between health check passes
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,

    /// Seconds between logged health reports
    #[serde(default = "default_report_interval")]
    pub report_interval_seconds: u64,

    /// Fail any lifecycle hook that runs longer than this
    #[serde(default)]
    pub hook_timeout_seconds: Option<u64>,

    /// Suspend recovery after this many consecutive failed attempts
    #[serde(default)]
    pub max_recovery_attempts: Option<u32>,

    /// First delay between failed recovery attempts; unset disables backoff
    #[serde(default)]
    pub recovery_backoff_base_seconds: Option<u64>,

    /// Upper bound for the recovery backoff delay
    #[serde(default = "default_backoff_max")]
    pub recovery_backoff_max_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ChatConfig {
    /// Bot token for the chat platform
    #[serde(default)]
    pub token: Option<String>,

    /// Outbound message queue size
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: ModelProvider,

    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    #[default]
    Claude,
    OpenAi,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// Prefix applied to every key
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,

    /// Default entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    /// Serve component status over HTTP
    #[serde(default)]
    pub enabled: bool,

    /// IP address to bind to
    #[serde(default = "default_http_ip")]
    pub ip: String,

    /// Port to listen on
    #[serde(default = "default_http_port")]
    pub port: u16,
}

impl CasebotConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("casebot.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("monitor.check_interval_seconds", default_check_interval())?
            .set_default("monitor.report_interval_seconds", default_report_interval())?
            .set_default("monitor.recovery_backoff_max_seconds", default_backoff_max())?
            .set_default("chat.queue_capacity", default_queue_capacity() as u64)?
            .set_default("model.provider", "claude")?
            .set_default("cache.prefix", default_cache_prefix())?
            .set_default("cache.ttl_seconds", default_cache_ttl())?
            .set_default("http.enabled", false)?
            .set_default("http.ip", default_http_ip())?
            .set_default("http.port", default_http_port())?
            .add_source(File::with_name(&path_str).required(false))
            // CASEBOT_MONITOR__CHECK_INTERVAL_SECONDS=30
            .add_source(
                Environment::with_prefix("CASEBOT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: CasebotConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.check_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Monitor check_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.monitor.report_interval_seconds == 0 {
            return Err(ConfigError::Message(
                "Monitor report_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.monitor.hook_timeout_seconds == Some(0) {
            return Err(ConfigError::Message(
                "Monitor hook_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.monitor.max_recovery_attempts == Some(0) {
            return Err(ConfigError::Message(
                "Monitor max_recovery_attempts must be greater than 0".to_string(),
            ));
        }

        if let Some(base) = self.monitor.recovery_backoff_base_seconds {
            if base == 0 {
                return Err(ConfigError::Message(
                    "Monitor recovery_backoff_base_seconds must be greater than 0".to_string(),
                ));
            }
            if self.monitor.recovery_backoff_max_seconds < base {
                return Err(ConfigError::Message(format!(
                    "Monitor recovery_backoff_max_seconds ({}) must not be below recovery_backoff_base_seconds ({})",
                    self.monitor.recovery_backoff_max_seconds, base
                )));
            }
        }

        if self.chat.queue_capacity == 0 {
            return Err(ConfigError::Message(
                "Chat queue_capacity must be greater than 0".to_string(),
            ));
        }

        if self.cache.ttl_seconds == 0 {
            return Err(ConfigError::Message(
                "Cache ttl_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl MonitorConfig {
    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout_seconds.map(Duration::from_secs)
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_seconds)
    }

    pub fn recovery_policy(&self) -> RecoveryPolicy {
        let mut policy = RecoveryPolicy::unlimited();
        if let Some(max_attempts) = self.max_recovery_attempts {
            policy = policy.with_max_attempts(max_attempts);
        }
        if let Some(base) = self.recovery_backoff_base_seconds {
            policy = policy.with_backoff(Backoff::new(
                Duration::from_secs(base),
                Duration::from_secs(self.recovery_backoff_max_seconds),
            ));
        }
        policy
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig::default()
            .with_check_interval(Duration::from_secs(self.check_interval_seconds))
            .with_recovery(self.recovery_policy())
    }
}

impl Default for CasebotConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig {
                check_interval_seconds: default_check_interval(),
                report_interval_seconds: default_report_interval(),
                hook_timeout_seconds: None,
                max_recovery_attempts: None,
                recovery_backoff_base_seconds: None,
                recovery_backoff_max_seconds: default_backoff_max(),
            },
            chat: ChatConfig {
                token: None,
                queue_capacity: default_queue_capacity(),
            },
            model: ModelConfig {
                provider: ModelProvider::default(),
                api_key: None,
            },
            cache: CacheConfig {
                prefix: default_cache_prefix(),
                ttl_seconds: default_cache_ttl(),
            },
            http: HttpConfig {
                enabled: false,
                ip: default_http_ip(),
                port: default_http_port(),
            },
        }
    }
}

// Default value functions
fn default_check_interval() -> u64 {
    60
}
fn default_report_interval() -> u64 {
    60
}
fn default_backoff_max() -> u64 {
    300
}

fn default_queue_capacity() -> usize {
    100
}

fn default_cache_prefix() -> String {
    "cache:".to_string()
}
fn default_cache_ttl() -> u64 {
    3600
}

fn default_http_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_http_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = CasebotConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.monitor.check_interval_seconds, 60);
        assert_eq!(config.cache.prefix, "cache:");
        assert_eq!(config.model.provider, ModelProvider::Claude);
        assert_eq!(config.monitor.recovery_policy(), RecoveryPolicy::unlimited());
        assert!(config.monitor.hook_timeout().is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CasebotConfig::load_from_file(dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.monitor.report_interval_seconds, 60);
        assert_eq!(config.chat.queue_capacity, 100);
        assert!(config.chat.token.is_none());
        assert!(!config.http.enabled);
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
[monitor]
check_interval_seconds = 15
hook_timeout_seconds = 5
max_recovery_attempts = 3
recovery_backoff_base_seconds = 2

[chat]
token = "123:abc"

[model]
provider = "openai"
api_key = "sk-test"

[http]
enabled = true
port = 9191
"#,
        );

        let config = CasebotConfig::load_from_file(file.path()).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.monitor.check_interval_seconds, 15);
        assert_eq!(config.monitor.hook_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.chat.token.as_deref(), Some("123:abc"));
        assert_eq!(config.model.provider, ModelProvider::OpenAi);
        assert!(config.http.enabled);
        assert_eq!(config.http.port, 9191);
        assert_eq!(config.http.ip, "127.0.0.1");

        let supervisor = config.monitor.supervisor_config();
        assert_eq!(supervisor.check_interval, Duration::from_secs(15));
        assert_eq!(supervisor.recovery.max_attempts, Some(3));
        assert_eq!(
            supervisor.recovery.backoff,
            Some(Backoff::new(Duration::from_secs(2), Duration::from_secs(300)))
        );
    }

    #[test]
    fn test_environment_variable_override() {
        let dir = tempfile::tempdir().unwrap();
        env::set_var("CASEBOT_CACHE__TTL_SECONDS", "42");

        let config = CasebotConfig::load_from_file(dir.path().join("casebot.toml"));
        env::remove_var("CASEBOT_CACHE__TTL_SECONDS");

        assert_eq!(config.unwrap().cache.ttl_seconds, 42);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = CasebotConfig::default();
        config.monitor.check_interval_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = CasebotConfig::default();
        config.chat.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = CasebotConfig::default();
        config.monitor.hook_timeout_seconds = Some(0);
        assert!(config.validate().is_err());

        let mut config = CasebotConfig::default();
        config.monitor.max_recovery_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_inverted_backoff() {
        let mut config = CasebotConfig::default();
        config.monitor.recovery_backoff_base_seconds = Some(600);
        config.monitor.recovery_backoff_max_seconds = 60;

        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("recovery_backoff_max_seconds"));
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let rendered = toml::to_string_pretty(&CasebotConfig::default()).unwrap();
        assert!(rendered.contains("[monitor]"));
        assert!(rendered.contains("check_interval_seconds = 60"));

        let parsed: CasebotConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, CasebotConfig::default());
    }
}
