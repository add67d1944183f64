//! tcwatch Common - 跨模块共享工具与数据结构
//!
//! 该模块提供 tcwatch 项目中所有组件共享的数据结构、错误处理和协作方接口。
//! 包括网络接口引用、生命周期状态等数据模型以及统一的错误处理机制。

pub mod error;
pub mod transport;
pub mod types;

/// 重新导出常用类型，方便使用
pub use error::Error;
pub use error::Result;
pub use transport::{CounterStore, TcTransport};
pub use types::*;
