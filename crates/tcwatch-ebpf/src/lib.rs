//! tcwatch eBPF 模块
//!
//! 该模块实现规格中的两个外部协作方：程序加载器（加载内核态分类器并提供
//! 计数器存储访问）与内核传输层（clsact qdisc 与 bpf filter 的原语操作）。
//! 使用 Aya 框架进行 eBPF 程序的加载和管理，qdisc 的替换/删除通过 netlink 直接完成。

mod hooks;
mod loader;
mod maps;
mod netlink;

pub use hooks::*;
pub use loader::*;
pub use maps::*;
