//! TOML configuration and credential resolution.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration. Credentials are never part of the file: only the
//! names of the environment variables holding them are.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use shared_utils::config::ConfigError;
use shared_utils::env::get_non_empty_env_var;

use crate::providers::alpha_vantage::{self, OutputSize};
use crate::providers::quiver;
use crate::requests::ScheduleConfig;

pub const DEFAULT_CONFIG_PATH: &str = "configs/ingestor.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestorConfig {
    pub cache: CacheCfg,
    pub output: OutputCfg,
    pub schedule: ScheduleCfg,
    pub http: HttpCfg,
    pub quiver: QuiverCfg,
    pub alpha_vantage: AlphaVantageCfg,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheCfg {
    /// Directory holding one CSV file per cached request.
    pub dir: PathBuf,
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/cache"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    /// Arrow IPC (feather).
    Ipc,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputCfg {
    pub dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for OutputCfg {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/output"),
            format: OutputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleCfg {
    /// Values per window.
    pub window_size: usize,
    /// Pause between the end of one window and the start of the next.
    pub window_delay_secs: u64,
    /// Fetches in flight within a window.
    pub pool_size: usize,
}

impl Default for ScheduleCfg {
    fn default() -> Self {
        let defaults = ScheduleConfig::default();
        Self {
            window_size: defaults.window_size,
            window_delay_secs: defaults.window_delay.as_secs(),
            pool_size: defaults.pool_size,
        }
    }
}

impl ScheduleCfg {
    pub fn to_schedule(&self) -> ScheduleConfig {
        ScheduleConfig {
            window_size: self.window_size,
            window_delay: Duration::from_secs(self.window_delay_secs),
            pool_size: self.pool_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpCfg {
    pub request_timeout_secs: u64,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

impl HttpCfg {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuiverCfg {
    pub base_url: String,
    pub api_key_env: String,
}

impl Default for QuiverCfg {
    fn default() -> Self {
        Self {
            base_url: quiver::DEFAULT_BASE_URL.to_string(),
            api_key_env: "QQ_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlphaVantageCfg {
    pub base_url: String,
    pub api_key_env: String,
    /// `compact` (latest 100 days) or `full`.
    pub outputsize: String,
}

impl Default for AlphaVantageCfg {
    fn default() -> Self {
        Self {
            base_url: alpha_vantage::DEFAULT_BASE_URL.to_string(),
            api_key_env: "AV_API_KEY".to_string(),
            outputsize: OutputSize::Compact.to_string(),
        }
    }
}

impl AlphaVantageCfg {
    pub fn outputsize(&self) -> Result<OutputSize, ConfigError> {
        self.outputsize
            .parse()
            .map_err(|reason: String| ConfigError::invalid("alpha_vantage.outputsize", reason))
    }
}

impl IngestorConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Load {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let load_error = |reason: String| ConfigError::Load {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| load_error(e.to_string()))
    }

    /// Loads `path` when it exists, otherwise returns the defaults.
    pub fn from_file_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.to_schedule().validate()?;
        if self.http.request_timeout_secs == 0 {
            return Err(ConfigError::invalid("http.request_timeout_secs", "must be at least 1"));
        }
        for (field, url) in [
            ("quiver.base_url", &self.quiver.base_url),
            ("alpha_vantage.base_url", &self.alpha_vantage.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::invalid(field, format!("`{url}` is not an http(s) URL")));
            }
        }
        self.alpha_vantage.outputsize()?;
        Ok(())
    }
}

/// Provider API keys, supplied explicitly to the ingestor.
#[derive(Debug, Default)]
pub struct Credentials {
    pub quiver: Option<SecretString>,
    pub alpha_vantage: Option<SecretString>,
}

impl Credentials {
    pub fn new(quiver: impl Into<String>, alpha_vantage: impl Into<String>) -> Self {
        let quiver: String = quiver.into();
        let alpha_vantage: String = alpha_vantage.into();
        Self {
            quiver: Some(SecretString::new(quiver.into())),
            alpha_vantage: Some(SecretString::new(alpha_vantage.into())),
        }
    }

    /// Reads both keys from the variables named in `config`. A variable that
    /// is unset or blank leaves its key absent.
    pub fn from_env(config: &IngestorConfig) -> Self {
        let read = |name: &str| {
            get_non_empty_env_var(name)
                .ok()
                .map(|key| SecretString::new(key.into()))
        };
        Self {
            quiver: read(&config.quiver.api_key_env),
            alpha_vantage: read(&config.alpha_vantage.api_key_env),
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serial_test::serial;

    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = IngestorConfig::from_toml_str("").unwrap();
        assert_eq!(config, IngestorConfig::default());
        assert_eq!(config.schedule.window_size, 25);
        assert_eq!(config.schedule.window_delay_secs, 70);
        assert_eq!(config.http.request_timeout_secs, 30);
        config.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = IngestorConfig::from_toml_str(
            r#"
            [schedule]
            window_size = 5

            [output]
            format = "ipc"
            "#,
        )
        .unwrap();
        assert_eq!(config.schedule.window_size, 5);
        assert_eq!(config.schedule.pool_size, 10);
        assert_eq!(config.output.format, OutputFormat::Ipc);
        assert_eq!(config.output.dir, PathBuf::from("data/output"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = IngestorConfig::from_toml_str("[schedule]\nwindow = 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = IngestorConfig::default();
        config.schedule.window_size = 0;
        assert!(config.validate().is_err());

        let mut config = IngestorConfig::default();
        config.http.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = IngestorConfig::default();
        config.alpha_vantage.outputsize = "everything".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "alpha_vantage.outputsize"
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = IngestorConfig::from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }

    #[test]
    #[serial]
    fn credentials_come_from_configured_variables() {
        let mut config = IngestorConfig::default();
        config.quiver.api_key_env = "INGESTOR_TEST_QQ".into();
        config.alpha_vantage.api_key_env = "INGESTOR_TEST_AV".into();
        unsafe {
            std::env::set_var("INGESTOR_TEST_QQ", "qq-key");
            std::env::remove_var("INGESTOR_TEST_AV");
        }
        let creds = Credentials::from_env(&config);
        assert_eq!(creds.quiver.as_ref().map(|k| k.expose_secret()), Some("qq-key"));
        assert!(creds.alpha_vantage.is_none());
        unsafe { std::env::remove_var("INGESTOR_TEST_QQ") };
    }
}
