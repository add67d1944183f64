//! tcwatch 入口
//!
//! 解析命令行参数、初始化日志订阅器，然后把控制权交给 Agent。
//! 致命错误以非零状态退出并打印原因；信号触发的正常停机以状态 0 退出。

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tcwatch_agent::config::AgentConfig;
use tcwatch_agent::Agent;

/// TC 分类器挂载守护进程
#[derive(Parser, Debug)]
#[command(name = "tcwatch", version, about = "管理 TC 分类器的挂载生命周期并周期上报数据包计数")]
struct Cli {
    /// 要挂载的网络接口
    #[arg(long)]
    iface: Option<String>,

    /// YAML 配置文件路径
    #[arg(long)]
    config: Option<PathBuf>,

    /// eBPF 字节码路径
    #[arg(long)]
    bpf_path: Option<String>,

    /// 轮询间隔（秒）
    #[arg(long)]
    interval_secs: Option<u64>,
}

impl Cli {
    /// 命令行参数覆盖配置文件与默认值
    fn apply(self, config: &mut AgentConfig) {
        if let Some(iface) = self.iface {
            config.iface = iface;
        }
        if let Some(bpf_path) = self.bpf_path {
            config.bpf_path = bpf_path;
        }
        if let Some(interval) = self.interval_secs {
            config.poll_interval_secs = interval;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AgentConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    Agent::new(config).run().await
}
