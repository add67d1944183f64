//! 停机协调
//!
//! 阻塞等待一次中断或终止信号；收到后由主流程同步执行卸载，随后进程退出。
//! 第一次信号之后不再轮询信号流，卸载期间到达的重复信号被忽略。

use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use tcwatch_common::Result;

/// 等待 SIGINT 或 SIGTERM，进程生命周期内只调用一次
pub async fn wait_for_termination() -> Result<()> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = interrupt.recv() => info!("收到中断信号"),
        _ = terminate.recv() => info!("收到终止信号"),
    }

    Ok(())
}
