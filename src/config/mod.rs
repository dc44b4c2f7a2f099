//! Configuration Module
//!
//! One `Config` value is built at startup and handed to every component.
//! Nothing in the crate reads configuration from globals.

pub mod secrets;

pub use secrets::{KeyringStore, SecretString};

use crate::speech::{AudioFormat, RateStrategy};
use crate::utils::RetryConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote TTS service
    #[serde(default)]
    pub api: ApiConfig,

    /// Local storage layout
    #[serde(default)]
    pub paths: PathsConfig,

    /// Voice cloning call
    #[serde(default)]
    pub enrollment: EnrollmentConfig,

    /// Speech synthesis call
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Web page
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bearer token for the TTS service
    #[serde(default, skip_serializing_if = "SecretString::is_empty")]
    pub api_key: SecretString,

    /// Base URL; endpoint paths are appended to it
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://api.sws.speechify.com".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::default(),
            base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Uploaded voice samples
    #[serde(default = "default_records_dir")]
    pub records_dir: PathBuf,

    /// Root of the per-owner output directories
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,

    /// Two-column table of (text, output name)
    #[serde(default = "default_text_input")]
    pub text_input: PathBuf,

    /// Append-only (owner, voice, timestamp) table
    #[serde(default = "default_result_log")]
    pub result_log: PathBuf,
}

fn default_records_dir() -> PathBuf {
    PathBuf::from("User_Records")
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("Generated_Audio")
}

fn default_text_input() -> PathBuf {
    PathBuf::from("Text_Input.csv")
}

fn default_result_log() -> PathBuf {
    PathBuf::from("User_Data.csv")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            records_dir: default_records_dir(),
            generated_dir: default_generated_dir(),
            text_input: default_text_input(),
            result_log: default_result_log(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentConfig {
    /// Largest sample accepted locally (the service rejects anything bigger)
    #[serde(default = "default_max_sample_bytes")]
    pub max_sample_bytes: u64,

    /// Per-attempt request timeout
    #[serde(default = "default_enrollment_timeout")]
    pub timeout_secs: u64,

    /// Display name sent in the consent blob
    #[serde(default = "default_consent_name")]
    pub consent_name: String,

    /// Email sent in the consent blob
    #[serde(default = "default_consent_email")]
    pub consent_email: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_sample_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_enrollment_timeout() -> u64 {
    30
}

fn default_consent_name() -> String {
    "User".to_string()
}

fn default_consent_email() -> String {
    "user@example.com".to_string()
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            max_sample_bytes: default_max_sample_bytes(),
            timeout_secs: default_enrollment_timeout(),
            consent_name: default_consent_name(),
            consent_email: default_consent_email(),
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// How the requested rate is applied
    #[serde(default)]
    pub rate_strategy: RateStrategy,

    /// Container requested from the service (`wav` is required for `local`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<AudioFormat>,

    /// Request timeout; unset means the transport default (none)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl SynthesisConfig {
    /// Effective container: explicit setting, else the strategy's default.
    pub fn effective_format(&self) -> AudioFormat {
        self.audio_format
            .unwrap_or_else(|| self.rate_strategy.default_format())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_bind")]
    pub bind: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Largest accepted upload request body
    #[serde(default = "default_body_limit")]
    pub max_body_bytes: usize,
}

fn default_server_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    5000
}

fn default_body_limit() -> usize {
    64 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_server_bind(),
            port: default_server_port(),
            max_body_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. Default values
    /// 2. System config: ~/.config/voicebatch/config.toml
    /// 3. Local config: ./voicebatch.toml
    /// 4. Environment variables
    /// 5. OS keyring (API key only, when still unset)
    pub fn load() -> Result<Self> {
        tracing::debug!("Loading configuration...");

        let mut layers = Vec::new();
        if let Some(system_config_path) = Self::system_config_path()
            && system_config_path.exists()
        {
            tracing::debug!("Loading system config from: {:?}", system_config_path);
            layers.push(system_config_path);
        }

        let local_config_path = Self::local_config_path();
        if local_config_path.exists() {
            tracing::debug!("Loading local config from: {:?}", local_config_path);
            layers.push(local_config_path);
        }

        let mut config = Self::read_layers(&layers)?;
        config.apply_env_overrides();
        config.apply_keyring_fallback();

        tracing::debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load configuration from a specific file, then apply env overrides.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from custom path: {:?}", path);

        if !path.exists() {
            anyhow::bail!("Config file not found: {:?}", path);
        }
        let mut config = Self::read_file(path)?;

        config.apply_env_overrides();
        config.apply_keyring_fallback();
        Ok(config)
    }

    /// System config path: ~/.config/voicebatch/config.toml
    pub fn system_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("voicebatch").join("config.toml"))
    }

    /// Local config path: ./voicebatch.toml
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("./voicebatch.toml")
    }

    /// Merge the files key by key, later files winning, over the defaults.
    fn read_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Table::new();
        for path in paths {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let table: toml::Table = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            merge_tables(&mut merged, table);
        }

        toml::Value::Table(merged)
            .try_into()
            .context("Failed to apply merged configuration")
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        toml::from_str(&contents).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from a variable lookup (the process env in production).
    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("SPEECHIFY_API_KEY") {
            self.api.api_key = SecretString::new(key);
        }
        if let Some(url) = lookup("VOICEBATCH_API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Some(dir) = lookup("VOICEBATCH_RECORDS_DIR") {
            self.paths.records_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("VOICEBATCH_GENERATED_DIR") {
            self.paths.generated_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("VOICEBATCH_TEXT_INPUT") {
            self.paths.text_input = PathBuf::from(path);
        }
        if let Some(path) = lookup("VOICEBATCH_RESULT_LOG") {
            self.paths.result_log = PathBuf::from(path);
        }
        if let Some(strategy) = lookup("VOICEBATCH_RATE_STRATEGY") {
            match strategy.parse() {
                Ok(s) => self.synthesis.rate_strategy = s,
                Err(e) => tracing::warn!("Ignoring VOICEBATCH_RATE_STRATEGY: {}", e),
            }
        }
        if let Some(port) = lookup("VOICEBATCH_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!("Ignoring VOICEBATCH_PORT: not a port number: {}", port),
            }
        }
        if let Some(level) = lookup("VOICEBATCH_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    fn apply_keyring_fallback(&mut self) {
        if self.api.api_key.is_empty()
            && let Some(key) = KeyringStore::load()
        {
            tracing::debug!("Using API key from OS keyring");
            self.api.api_key = key;
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api.api_key.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        tracing::debug!("Validating configuration...");

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }

        if self.enrollment.max_sample_bytes == 0 {
            anyhow::bail!("enrollment.max_sample_bytes must be greater than zero");
        }

        if self.synthesis.rate_strategy == RateStrategy::Local
            && self.synthesis.effective_format() != AudioFormat::Wav
        {
            anyhow::bail!(
                "synthesis.rate_strategy = \"local\" requires audio_format = \"wav\" (got {})",
                self.synthesis.effective_format()
            );
        }

        if !self.has_api_key() {
            tracing::warn!("No API key configured; remote calls will be rejected");
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        fs::write(path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        tracing::info!("Configuration saved to: {:?}", path);
        Ok(())
    }
}

/// Overlay `overlay` onto `base`, descending into nested tables.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.enrollment.max_sample_bytes, 5 * 1024 * 1024);
        assert_eq!(config.enrollment.timeout_secs, 30);
        assert_eq!(config.enrollment.retry.max_retries, 3);
        assert_eq!(config.synthesis.rate_strategy, RateStrategy::Native);
        assert_eq!(config.synthesis.effective_format(), AudioFormat::Mp3);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_strategy_defaults_to_wav() {
        let mut config = Config::default();
        config.synthesis.rate_strategy = RateStrategy::Local;
        assert_eq!(config.synthesis.effective_format(), AudioFormat::Wav);
        assert!(config.validate().is_ok());

        config.synthesis.audio_format = Some(AudioFormat::Mp3);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("wav"), "unexpected error: {}", err);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_content = r#"
[api]
api_key = "file-key"
base_url = "http://localhost:9999"

[paths]
records_dir = "/srv/records"
text_input = "/srv/texts.csv"

[enrollment]
timeout_secs = 10

[enrollment.retry]
max_retries = 1
initial_backoff_ms = 50

[synthesis]
rate_strategy = "local"

[logging]
level = "debug"
        "#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.api_key.expose(), "file-key");
        assert_eq!(config.api.base_url, "http://localhost:9999");
        assert_eq!(config.paths.records_dir, PathBuf::from("/srv/records"));
        assert_eq!(config.paths.generated_dir, PathBuf::from("Generated_Audio"));
        assert_eq!(config.enrollment.timeout_secs, 10);
        assert_eq!(config.enrollment.retry.max_retries, 1);
        assert_eq!(config.enrollment.retry.retryable_statuses, vec![429, 500, 502, 503, 504]);
        assert_eq!(config.synthesis.rate_strategy, RateStrategy::Local);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SPEECHIFY_API_KEY", "env-key"),
            ("VOICEBATCH_GENERATED_DIR", "/out"),
            ("VOICEBATCH_RATE_STRATEGY", "local"),
            ("VOICEBATCH_PORT", "not-a-port"),
        ]);

        let mut config = Config::default();
        config.apply_overrides_from(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.api.api_key.expose(), "env-key");
        assert_eq!(config.paths.generated_dir, PathBuf::from("/out"));
        assert_eq!(config.synthesis.rate_strategy, RateStrategy::Local);
        // invalid values are ignored
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.server.port = 8123;

        config.save(temp_file.path()).unwrap();

        let contents = std::fs::read_to_string(temp_file.path()).unwrap();
        let loaded: Config = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.server.port, 8123);
        assert_eq!(loaded.logging.level, config.logging.level);
        // empty key is not written out
        assert!(!contents.contains("api_key"));
    }

    #[test]
    fn test_layers_merge_key_by_key() {
        let system = NamedTempFile::new().unwrap();
        std::fs::write(
            system.path(),
            "[api]\napi_key = \"system-key\"\n\n[server]\nport = 8123\n\n[enrollment.retry]\nmax_retries = 5\n",
        )
        .unwrap();
        let local = NamedTempFile::new().unwrap();
        std::fs::write(
            local.path(),
            "[server]\nbind = \"0.0.0.0\"\n\n[enrollment.retry]\ninitial_backoff_ms = 10\n",
        )
        .unwrap();

        let config =
            Config::read_layers(&[system.path().to_path_buf(), local.path().to_path_buf()])
                .unwrap();

        assert_eq!(config.api.api_key.expose(), "system-key");
        assert_eq!(config.server.port, 8123);
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.enrollment.retry.max_retries, 5);
        assert_eq!(config.enrollment.retry.initial_backoff_ms, 10);
        assert_eq!(config.logging.level, "info");

        assert_eq!(Config::read_layers(&[]).unwrap().server.port, 5000);
    }

    #[test]
    fn test_load_from_missing_path() {
        assert!(Config::load_from_path("/no/such/voicebatch.toml").is_err());
    }

    #[test]
    fn test_local_config_path() {
        assert_eq!(Config::local_config_path(), PathBuf::from("./voicebatch.toml"));
    }
}
