//! 共享数据模型
//!
//! 该模块定义挂载生命周期中流转的核心数据结构：已解析的网络接口引用、
//! 流量方向、计数器采样值以及挂载管理器的生命周期状态机。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 已解析的网络接口标识
///
/// 由接口解析器在启动时创建，之后只读，进程退出时丢弃。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRef {
    /// 接口名称（如 "wan"）
    pub name: String,
    /// 内核接口索引
    pub index: u32,
}

impl InterfaceRef {
    /// 创建新的接口引用
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

impl std::fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.name, self.index)
    }
}

/// 流量方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// 出站流量（本部署使用的方向）
    Egress,
    /// 入站流量
    Ingress,
}

impl Direction {
    /// 方向名称，用于日志输出
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Egress => "egress",
            Direction::Ingress => "ingress",
        }
    }
}

/// 某一时刻从计数器存储读出的单次采样
///
/// 采样之间相互独立；分类器运行期间数值单调不减。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSample {
    /// 观测到的数据包总数
    pub packets: u64,
    /// 读取时间
    pub observed_at: DateTime<Utc>,
}

impl CounterSample {
    /// 以当前时间创建采样
    pub fn now(packets: u64) -> Self {
        Self {
            packets,
            observed_at: Utc::now(),
        }
    }
}

/// 挂载管理器的生命周期状态机
///
/// Unattached → Attaching → Attached → Detaching → Detached；
/// 挂载失败进入 Failed。Detached 与 Failed 为终止状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// 未挂载（初始状态）
    Unattached,
    /// 挂载中
    Attaching,
    /// 已挂载
    Attached,
    /// 卸载中
    Detaching,
    /// 已卸载（终止状态）
    Detached,
    /// 挂载失败（终止状态）
    Failed,
}

impl LifecycleState {
    /// 是否为终止状态
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Detached | LifecycleState::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_ref_display() {
        let iface = InterfaceRef::new("wan", 3);
        assert_eq!(iface.to_string(), "wan#3");
        assert_eq!(iface.name, "wan");
        assert_eq!(iface.index, 3);
    }

    #[test]
    fn test_direction_names() {
        assert_eq!(Direction::Egress.as_str(), "egress");
        assert_eq!(Direction::Ingress.as_str(), "ingress");
    }

    #[test]
    fn test_counter_sample_monotonic_sequence() {
        // 连续采样在分类器运行期间单调不减
        let samples = [CounterSample::now(0), CounterSample::now(42)];
        assert!(samples.windows(2).all(|w| w[0].packets <= w[1].packets));
    }

    #[test]
    fn test_terminal_states() {
        assert!(LifecycleState::Detached.is_terminal());
        assert!(LifecycleState::Failed.is_terminal());
        assert!(!LifecycleState::Unattached.is_terminal());
        assert!(!LifecycleState::Attached.is_terminal());
    }
}
