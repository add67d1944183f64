//! tcwatch Agent - 用户态守护进程管理 TC 分类器挂载生命周期
//!
//! 该模块把各组件按固定流程接线：接口解析 → 分类器加载 → hook 挂载 →
//! 计数轮询（后台）→ 信号等待 → 同步卸载 → 进程退出。
//! 启动与挂载阶段任何错误都立即终止进程；卸载阶段尽力而为。

pub mod config;
pub mod iface;
pub mod metrics;
pub mod poller;
pub mod shutdown;
pub mod tc_manager;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use tcwatch_ebpf::{ClassifierLoader, KernelTransport};

use crate::config::AgentConfig;
use crate::metrics::MetricsExporter;
use crate::poller::CounterPoller;
use crate::tc_manager::TcManager;

/// Agent 主结构体
pub struct Agent {
    /// 运行配置
    config: AgentConfig,
}

impl Agent {
    /// 创建新的 Agent 实例
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// 运行至收到终止信号
    pub async fn run(self) -> Result<()> {
        let config = self.config;

        // 接口解析：一次性查询，失败即终止
        let iface = iface::resolve(&config.iface).context("解析网络接口失败")?;

        // 加载分类器（加载器拥有内核程序与计数器存储）
        let loaded = ClassifierLoader::new(&config.bpf_path)
            .with_program_name(&config.program_name)
            .with_counter_map(&config.counter_map)
            .load()
            .context("加载 eBPF 分类器失败")?;
        let counter = Arc::new(loaded.counter);

        // 挂载：qdisc 替换 + filter 安装（含单次恢复重试）
        let transport = KernelTransport::new(loaded.bpf, config.program_name.clone())
            .with_priority(config.filter_priority);
        let mut manager = TcManager::new(transport, iface);
        manager.attach().context("挂载分类器失败")?;

        // 计数轮询后台任务
        let mut poller = CounterPoller::new(counter, config.poll_interval());
        if config.metrics.enabled {
            let exporter = MetricsExporter::new().context("创建指标导出器失败")?;
            let addr: SocketAddr = format!(
                "{}:{}",
                config.metrics.listen_address, config.metrics.port
            )
            .parse()
            .context("指标监听地址无效")?;
            exporter.serve(addr);
            poller = poller.with_gauge(exporter.packets_gauge());
        }
        let stop = poller.stop_flag();
        let poller_handle = poller.spawn();

        // 阻塞至终止信号，然后同步卸载
        shutdown::wait_for_termination()
            .await
            .context("信号监听失败")?;

        info!("开始卸载 filter 与 qdisc...");
        stop.store(true, Ordering::Relaxed);
        manager.detach();
        poller_handle.abort();

        Ok(())
    }
}
