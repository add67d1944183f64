//! 内核传输层实现
//!
//! 该模块把共享的 `TcTransport` 接口落到真实内核上：qdisc 的替换/删除
//! 走 netlink 原语，filter 的安装/清除/卸载走 Aya 的 SchedClassifier。
//! filter 以 direct-action 模式安装，分类器判决即为最终判决。

use aya::programs::tc::{self, SchedClassifierLinkId, TcOptions};
use aya::programs::{SchedClassifier, TcAttachType};
use aya::Bpf;
use tracing::debug;

use tcwatch_common::{Direction, Error, InterfaceRef, Result, TcTransport};

use crate::netlink;

/// 默认的 filter 优先级（对应原部署中的固定优先级 1）
pub const DEFAULT_FILTER_PRIORITY: u16 = 1;

/// 默认的 filter 句柄 0:1
pub const DEFAULT_FILTER_HANDLE: u32 = 1;

/// 真实内核传输层
///
/// 持有已加载的 eBPF 对象；filter 的挂载需要对程序的可变访问，
/// 因此对象所有权归于此处，进程退出时随 Drop 释放。
pub struct KernelTransport {
    /// 已加载的 eBPF 对象
    bpf: Bpf,
    /// 分类器程序名
    program_name: String,
    /// filter 优先级
    priority: u16,
    /// filter 句柄
    handle: u32,
}

impl KernelTransport {
    /// 基于加载产物创建传输层
    pub fn new(bpf: Bpf, program_name: impl Into<String>) -> Self {
        Self {
            bpf,
            program_name: program_name.into(),
            priority: DEFAULT_FILTER_PRIORITY,
            handle: DEFAULT_FILTER_HANDLE,
        }
    }

    /// 覆盖 filter 优先级
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    /// 获取分类器程序的可变引用
    fn classifier(&mut self) -> std::result::Result<&mut SchedClassifier, String> {
        self.bpf
            .program_mut(&self.program_name)
            .ok_or_else(|| format!("未找到分类器程序 {}", self.program_name))?
            .try_into()
            .map_err(|e: aya::programs::ProgramError| e.to_string())
    }
}

/// 方向到 Aya 挂载点的映射
fn attach_type(direction: Direction) -> TcAttachType {
    match direction {
        Direction::Egress => TcAttachType::Egress,
        Direction::Ingress => TcAttachType::Ingress,
    }
}

impl TcTransport for KernelTransport {
    type Link = SchedClassifierLinkId;

    fn replace_qdisc(&mut self, iface: &InterfaceRef) -> Result<()> {
        netlink::replace_clsact(iface.index)
            .map_err(|e| Error::QdiscCreateFailed(format!("{}: {}", iface, e)))
    }

    fn delete_qdisc(&mut self, iface: &InterfaceRef) -> Result<()> {
        netlink::delete_clsact(iface.index)
            .map_err(|e| Error::QdiscDetachFailed(format!("{}: {}", iface, e)))
    }

    fn attach_filter(
        &mut self,
        iface: &InterfaceRef,
        direction: Direction,
    ) -> Result<Self::Link> {
        let name = iface.name.clone();
        let options = TcOptions {
            priority: self.priority,
            handle: self.handle,
        };

        let program = self
            .classifier()
            .map_err(Error::FilterAttachFailed)?;

        program
            .attach_with_options(&name, attach_type(direction), options)
            .map_err(|e| Error::FilterAttachFailed(format!("{}: {}", iface, e)))
    }

    /// 按程序名清除该挂载点上占位的既有 filter
    ///
    /// 注意：清除以程序名为键，只命中本程序此前运行留下的绑定；
    /// 其它程序占用目标优先级时不会被移除，随后的重试会以致命错误上报。
    fn purge_filter(&mut self, iface: &InterfaceRef, direction: Direction) -> Result<()> {
        // 位置为空时内核返回 ENOENT，忽略
        match tc::qdisc_detach_program(&iface.name, attach_type(direction), &self.program_name) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("无需清除的 filter: {} ({})", iface, direction.as_str());
                Ok(())
            }
            Err(e) => Err(Error::FilterAttachFailed(format!("{}: {}", iface, e))),
        }
    }

    fn detach_filter(
        &mut self,
        iface: &InterfaceRef,
        direction: Direction,
        link: Self::Link,
    ) -> Result<()> {
        let program = self.classifier().map_err(Error::FilterDetachFailed)?;

        program.detach(link).map_err(|e| {
            Error::FilterDetachFailed(format!("{} ({}): {}", iface, direction.as_str(), e))
        })
    }
}
