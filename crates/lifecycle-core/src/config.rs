use crate::dispatch::TtlPolicy;
use crate::error::{LifecycleError, Result};
use crate::types::{RenderTarget, RenderingStyle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "lifecycle.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// RenderingConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderingConfig {
    #[serde(default)]
    pub style: RenderingStyle,
    /// Used when a repository does not name its default branch.
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub target: RenderTarget,
}

fn default_branch() -> String {
    "master".to_string()
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            style: RenderingStyle::default(),
            default_branch: default_branch(),
            target: RenderTarget::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// EnrichmentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Upper bound for each contributor call, enrichment lookups included.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    2000
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl EnrichmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// DeliveryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlConfig {
    #[serde(default = "default_lifecycle_ttl")]
    pub lifecycle: u64,
    #[serde(default = "default_notification_ttl")]
    pub notification: u64,
}

fn default_lifecycle_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_notification_ttl() -> u64 {
    5 * 60
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            lifecycle: default_lifecycle_ttl(),
            notification: default_notification_ttl(),
        }
    }
}

impl TtlConfig {
    pub fn policy(&self) -> TtlPolicy {
        TtlPolicy {
            lifecycle: Duration::from_secs(self.lifecycle),
            notification: Duration::from_secs(self.notification),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Deliveries are only logged when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,
    #[serde(default)]
    pub ttl: TtlConfig,
}

// ---------------------------------------------------------------------------
// ServerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    2866
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rendering: RenderingConfig,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LifecycleError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        // An empty file parses as YAML null.
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(LifecycleError::ConfigNotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.delivery.ttl.lifecycle == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "delivery.ttl.lifecycle is 0; lifecycle messages would expire immediately".to_string(),
            });
        }
        if self.delivery.ttl.notification == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "delivery.ttl.notification is 0; notifications would expire immediately".to_string(),
            });
        }

        if self.enrichment.timeout_ms == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "enrichment.timeout_ms is 0; every action contributor will time out".to_string(),
            });
        } else if self.enrichment.timeout_ms > 10_000 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "enrichment.timeout_ms={} (>10000 holds up every render)",
                    self.enrichment.timeout_ms
                ),
            });
        }

        if let Some(url) = &self.delivery.gateway_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("delivery.gateway_url '{url}' is not an http(s) URL"),
                });
            }
        }

        if self.rendering.default_branch.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "rendering.default_branch is empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.rendering.default_branch, "master");
        assert_eq!(parsed.server.port, 2866);
        assert_eq!(parsed.enrichment.timeout_ms, 2000);
        assert!(parsed.delivery.gateway_url.is_none());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "rendering:\n  style: compact\n  target: card\ndelivery:\n  ttl:\n    notification: 60\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.rendering.style, RenderingStyle::Compact);
        assert_eq!(cfg.rendering.target, RenderTarget::Card);
        assert_eq!(cfg.rendering.default_branch, "master");
        assert_eq!(cfg.delivery.ttl.notification, 60);
        assert_eq!(cfg.delivery.ttl.lifecycle, 604_800);
        assert_eq!(cfg.delivery.ttl.policy().notification, Duration::from_secs(60));
    }

    #[test]
    fn missing_file_is_error_for_load_but_default_otherwise() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        assert!(matches!(Config::load(&path), Err(LifecycleError::ConfigNotFound(_))));
        let cfg = Config::load_or_default(&path).unwrap();
        assert_eq!(cfg.server.port, 2866);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "server:\n  port: 9000\n").unwrap();
        assert_eq!(Config::load(&path).unwrap().server.port, 9000);

        std::fs::write(&path, "").unwrap();
        assert_eq!(Config::load(&path).unwrap().server.port, 2866);
    }

    #[test]
    fn validate_valid_config_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_zero_ttl_and_bad_url() {
        let mut cfg = Config::default();
        cfg.delivery.ttl.lifecycle = 0;
        cfg.delivery.gateway_url = Some("gateway.local".to_string());
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.level == WarnLevel::Error));
        assert!(warnings[1].message.contains("gateway.local"));
    }

    #[test]
    fn validate_long_timeout_warning() {
        let mut cfg = Config::default();
        cfg.enrichment.timeout_ms = 30_000;
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Warning);
        assert!(warnings[0].message.contains("30000"));
    }
}
