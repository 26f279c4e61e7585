//! 统一配置加载（默认值 + TOML 文件 + 环境变量覆盖）
//!
//! 环境变量使用 `TALLY_` 前缀，双下划线分段，例如
//! `TALLY_API__BASE_URL` 覆盖 `api.base_url`。

use crate::error::{Result, SyncError};
use crate::retry::RetryPolicy;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 默认排除的软件名关键字（子串匹配，大小写不敏感）
pub const DEFAULT_EXCLUDED_SOFTWARE: &[&str] = &[
    "Windows Update",
    "Microsoft Visual C++",
    "Microsoft .NET Framework",
    "KB",
    "Security Update",
    "Hotfix",
];

/// Agent 统一配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub api: ApiSection,
    pub scan: ScanSection,
    pub collect: CollectSection,
    pub telemetry: TelemetrySection,
}

/// 远端服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSection {
    pub base_url: String,
    /// 单次网络调用的超时（秒）
    pub timeout_sec: u64,
}

/// 扫描与重试配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    pub interval_sec: u64,
    pub retry_attempts: u32,
    pub retry_delay_sec: u64,
    /// stop() 等待当前轮结束的上限（秒）
    pub stop_timeout_sec: u64,
    pub excluded_software: Vec<String>,
}

/// 分区采集开关
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectSection {
    pub system: bool,
    pub hardware: bool,
    pub network: bool,
    pub software: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySection {
    pub log_level: String,
    pub log_format: String,
    pub no_ansi: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api: ApiSection::default(),
            scan: ScanSection::default(),
            collect: CollectSection::default(),
            telemetry: TelemetrySection::default(),
        }
    }
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_sec: 30,
        }
    }
}

impl Default for ScanSection {
    fn default() -> Self {
        Self {
            interval_sec: 300,
            retry_attempts: 3,
            retry_delay_sec: 5,
            stop_timeout_sec: 10,
            excluded_software: DEFAULT_EXCLUDED_SOFTWARE
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for CollectSection {
    fn default() -> Self {
        Self {
            system: true,
            hardware: true,
            network: true,
            software: true,
        }
    }
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            no_ansi: false,
        }
    }
}

impl AgentConfig {
    /// 加载配置：默认值 <- TOML 文件（如存在） <- 环境变量
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(SyncError::config_error(format!(
                        "Config file not found: {}",
                        p.display()
                    )));
                }
                figment = figment.merge(Toml::file(p));
            }
            None => {
                // 默认位置，缺失时仅用默认值
                let default_path = Path::new("config/tally.toml");
                if default_path.exists() {
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        let config: Self = figment
            .merge(Env::prefixed("TALLY_").split("__"))
            .extract()
            .map_err(|e| SyncError::config_error(format!("Failed to extract config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// GraphQL 端点，由 base_url 推导
    pub fn graphql_endpoint(&self) -> String {
        format!("{}/graphql/", self.api.base_url.trim_end_matches('/'))
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan.interval_sec)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.scan.stop_timeout_sec)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_sec)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.scan.retry_attempts,
            Duration::from_secs(self.scan.retry_delay_sec),
        )
    }

    /// 业务规则验证
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(SyncError::config_error("api.base_url cannot be empty"));
        }

        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(SyncError::config_error(
                "api.base_url must be an http(s) URL",
            ));
        }

        if self.api.timeout_sec == 0 {
            return Err(SyncError::config_error(
                "api.timeout_sec must be greater than 0",
            ));
        }

        if self.scan.interval_sec == 0 {
            return Err(SyncError::config_error(
                "scan.interval_sec must be greater than 0",
            ));
        }

        if self.scan.retry_attempts == 0 {
            return Err(SyncError::config_error(
                "scan.retry_attempts must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AgentConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.scan.interval_sec, 300);
        assert_eq!(cfg.scan.retry_attempts, 3);
        assert_eq!(cfg.scan.retry_delay_sec, 5);
        assert_eq!(cfg.scan.excluded_software.len(), 6);
        assert!(cfg.collect.software);
    }

    #[test]
    fn test_graphql_endpoint_strips_trailing_slash() {
        let mut cfg = AgentConfig::default();
        cfg.api.base_url = "http://inventory.local:8000/".to_string();
        assert_eq!(
            cfg.graphql_endpoint(),
            "http://inventory.local:8000/graphql/"
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[api]\nbase_url = \"https://inv.example.com\"\n\n[scan]\ninterval_sec = 60\nexcluded_software = [\"KB\"]\n"
        )
        .unwrap();

        let cfg = AgentConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.api.base_url, "https://inv.example.com");
        assert_eq!(cfg.scan.interval_sec, 60);
        assert_eq!(cfg.scan.excluded_software, vec!["KB".to_string()]);
        // 未覆盖的段保持默认
        assert_eq!(cfg.scan.retry_attempts, 3);
        assert_eq!(cfg.api.timeout_sec, 30);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = AgentConfig::load(Some(Path::new("/nonexistent/tally.toml"))).unwrap_err();
        assert_eq!(err.kind_label(), "config");
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut cfg = AgentConfig::default();
        cfg.api.base_url = "ftp://inv".to_string();
        assert!(cfg.validate().is_err());

        cfg.api.base_url = String::new();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_intervals() {
        let mut cfg = AgentConfig::default();
        cfg.scan.interval_sec = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AgentConfig::default();
        cfg.scan.retry_attempts = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_retry_policy_mirrors_scan_section() {
        let cfg = AgentConfig::default();
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay, Duration::from_secs(5));
    }
}
