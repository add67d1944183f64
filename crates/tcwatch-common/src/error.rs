//! 错误处理模块
//!
//! 该模块提供 tcwatch 项目的统一错误处理机制。错误分为两类：
//! 启动与挂载阶段的错误是致命的，进程必须立即退出；
//! 卸载与轮询阶段的错误是非致命的，记录日志后继续执行。

use std::io;
use thiserror::Error;

/// tcwatch 统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    /// 网络接口不存在（启动阶段，致命）
    #[error("网络接口不存在: {0}")]
    InterfaceNotFound(String),

    /// 解除内存锁定限制失败（启动阶段，致命）
    #[error("解除内存锁定限制失败: {0}")]
    MemoryLockRemovalFailed(String),

    /// eBPF 程序加载失败（启动阶段，致命）
    #[error("eBPF 程序加载失败: {0}")]
    ProgramLoadFailed(String),

    /// 创建 clsact qdisc 失败（挂载阶段，致命）
    #[error("创建 qdisc 失败: {0}")]
    QdiscCreateFailed(String),

    /// Filter 挂载失败（挂载阶段，致命，仅在一次恢复重试后抛出）
    #[error("filter 挂载失败: {0}")]
    FilterAttachFailed(String),

    /// Filter 卸载失败（卸载阶段，非致命）
    #[error("filter 卸载失败: {0}")]
    FilterDetachFailed(String),

    /// qdisc 卸载失败（卸载阶段，非致命）
    #[error("qdisc 卸载失败: {0}")]
    QdiscDetachFailed(String),

    /// 计数器读取失败（轮询阶段，非致命，当次采样跳过）
    #[error("计数器读取失败: {0}")]
    CounterReadFailed(String),

    /// 生命周期状态错误（操作与当前状态不符）
    #[error("生命周期状态错误: {0}")]
    InvalidState(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// 该错误是否允许进程继续运行
    ///
    /// 卸载阶段与轮询阶段的错误只记录日志；其余错误必须终止进程。
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::FilterDetachFailed(_)
                | Error::QdiscDetachFailed(_)
                | Error::CounterReadFailed(_)
        )
    }
}

/// tcwatch 结果类型别名
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detach_errors_are_recoverable() {
        assert!(Error::FilterDetachFailed("x".into()).is_recoverable());
        assert!(Error::QdiscDetachFailed("x".into()).is_recoverable());
        assert!(Error::CounterReadFailed("x".into()).is_recoverable());
    }

    #[test]
    fn test_startup_and_attach_errors_are_fatal() {
        assert!(!Error::InterfaceNotFound("ghost".into()).is_recoverable());
        assert!(!Error::MemoryLockRemovalFailed("rlimit".into()).is_recoverable());
        assert!(!Error::ProgramLoadFailed("elf".into()).is_recoverable());
        assert!(!Error::QdiscCreateFailed("netlink".into()).is_recoverable());
        assert!(!Error::FilterAttachFailed("netlink".into()).is_recoverable());
    }

    #[test]
    fn test_error_display_carries_detail() {
        let err = Error::InterfaceNotFound("ghost".to_string());
        assert!(err.to_string().contains("ghost"));
    }
}
