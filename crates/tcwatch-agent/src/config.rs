//! 配置管理模块
//!
//! 该模块负责 Agent 的配置：所有字段都有默认值（对应原部署的固定常量），
//! 可选地从 YAML 配置文件加载，再由命令行参数覆盖。
//! 轮询间隔、filter 优先级等常量在此提升为按实例配置。

use std::path::Path;
use std::time::Duration;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use tcwatch_common::{Error, Result};

/// Agent 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// 要挂载的网络接口
    pub iface: String,
    /// eBPF 字节码路径
    pub bpf_path: String,
    /// 分类器程序名
    pub program_name: String,
    /// 计数器 Map 名
    pub counter_map: String,
    /// 轮询间隔（秒）
    pub poll_interval_secs: u64,
    /// filter 优先级
    pub filter_priority: u16,
    /// 指标导出配置
    pub metrics: MetricsConfig,
}

/// 指标导出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 是否启用 /metrics 端点
    pub enabled: bool,
    /// 监听地址
    pub listen_address: String,
    /// 监听端口
    pub port: u16,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            iface: "wan".to_string(),
            bpf_path: "/opt/tcwatch/bpf/tcwatch.o".to_string(),
            program_name: "tcwatch_egress".to_string(),
            counter_map: "PKT_COUNT".to_string(),
            poll_interval_secs: 1,
            filter_priority: 1,
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_address: "0.0.0.0".to_string(),
            port: 9090,
        }
    }
}

impl AgentConfig {
    /// 加载配置；未给出配置文件时使用默认值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let config_file = path
            .to_str()
            .ok_or_else(|| Error::Config("配置路径无效".to_string()))?;

        let config = Config::builder()
            .add_source(File::with_name(config_file).format(FileFormat::Yaml))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        config
            .try_deserialize::<AgentConfig>()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// 轮询间隔
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_original_constants() {
        let config = AgentConfig::default();
        assert_eq!(config.iface, "wan");
        assert_eq!(config.poll_interval_secs, 1);
        assert_eq!(config.filter_priority, 1);
        assert_eq!(config.program_name, "tcwatch_egress");
        assert_eq!(config.counter_map, "PKT_COUNT");
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = AgentConfig::load(None).unwrap();
        assert_eq!(config.iface, "wan");
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_partial_yaml_overrides() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(
            file,
            "iface: eth0\npoll_interval_secs: 5\nmetrics:\n  enabled: true\n  port: 9091\n"
        )
        .unwrap();

        let config = AgentConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.iface, "eth0");
        assert_eq!(config.poll_interval_secs, 5);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.port, 9091);
        // 未覆盖的字段保持默认
        assert_eq!(config.filter_priority, 1);
        assert_eq!(config.bpf_path, "/opt/tcwatch/bpf/tcwatch.o");
    }

    #[test]
    fn test_load_invalid_yaml_is_config_error() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(file, "poll_interval_secs: [not, a, number]\n").unwrap();

        let err = AgentConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
