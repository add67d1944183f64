//! 协作方接口定义
//!
//! 该模块定义挂载管理器与计数轮询器所依赖的两个外部协作方的边界：
//! 内核传输层（qdisc 与 filter 的原语操作）和计数器存储。
//! 以 trait 形式抽象，便于在测试中用假实现替代真实内核。

use crate::error::Result;
use crate::types::{CounterSample, Direction, InterfaceRef};

/// 内核传输层协作方
///
/// 提供以接口、方向、优先级为键的 qdisc 创建/替换/删除与 filter 安装/删除原语。
/// qdisc 替换必须是幂等的：同属性的 hook 已存在时复用而不报错。
pub trait TcTransport {
    /// filter 卸载所需的凭据类型（真实实现中为内核返回的链接标识）
    type Link;

    /// 创建或替换接口上的 clsact 根 hook
    fn replace_qdisc(&mut self, iface: &InterfaceRef) -> Result<()>;

    /// 删除接口上的 clsact 根 hook
    fn delete_qdisc(&mut self, iface: &InterfaceRef) -> Result<()>;

    /// 在指定方向与优先级上安装分类器 filter（direct-action 模式）
    ///
    /// 同一 (接口, 方向, 优先级) 上已有 filter 时必须失败，由调用方决定恢复策略。
    fn attach_filter(&mut self, iface: &InterfaceRef, direction: Direction)
        -> Result<Self::Link>;

    /// 清除指定 (接口, 方向) 上占用目标优先级的既有 filter
    ///
    /// 用于挂载冲突后的单次恢复；目标位置为空时也应成功。
    fn purge_filter(&mut self, iface: &InterfaceRef, direction: Direction) -> Result<()>;

    /// 按凭据卸载此前安装的 filter
    fn detach_filter(
        &mut self,
        iface: &InterfaceRef,
        direction: Direction,
        link: Self::Link,
    ) -> Result<()>;
}

/// 计数器存储协作方
///
/// 加载器拥有的内核 Map 中固定键位上的一个无符号 64 位计数值。
/// 读取是纯观测操作，不做任何内核修改。
pub trait CounterStore: Send + Sync {
    /// 读取当前计数值
    fn read(&self) -> Result<CounterSample>;
}
