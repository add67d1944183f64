//! TC 挂载/卸载管理器
//!
//! 该模块是本系统的核心：管理单个接口上 clsact hook 与分类器 filter 的
//! 生命周期状态机。挂载阶段严格失败（半挂载的分类器会悄悄放行或错分流量），
//! 卸载阶段尽力而为（清理失败不得阻止进程退出）。

use tracing::{debug, error, info, warn};

use tcwatch_common::{Direction, Error, InterfaceRef, LifecycleState, Result, TcTransport};

/// 记录卸载阶段的错误
///
/// 卸载错误按约定是可恢复的，记 warn；传输层若返回了其它类别的错误，
/// 以 error 级别暴露出来。
fn log_teardown_error(e: &Error) {
    if e.is_recoverable() {
        warn!("{}", e);
    } else {
        error!("卸载阶段出现非卸载类错误: {}", e);
    }
}

/// TC 挂载/卸载管理器
///
/// 每个接口构造一个实例；操作只从主流程同步调用，不存在并发自调用。
/// 挂载成功后保留 filter 的链接凭据用于卸载。
pub struct TcManager<T: TcTransport> {
    /// 内核传输层协作方
    transport: T,
    /// 目标接口
    iface: InterfaceRef,
    /// 流量方向（本部署固定为 egress）
    direction: Direction,
    /// 生命周期状态
    state: LifecycleState,
    /// 已安装 filter 的卸载凭据
    link: Option<T::Link>,
}

impl<T: TcTransport> TcManager<T> {
    /// 创建新的管理器
    pub fn new(transport: T, iface: InterfaceRef) -> Self {
        Self {
            transport,
            iface,
            direction: Direction::Egress,
            state: LifecycleState::Unattached,
            link: None,
        }
    }

    /// 当前生命周期状态
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// 目标接口
    pub fn interface(&self) -> &InterfaceRef {
        &self.iface
    }

    /// 执行挂载
    ///
    /// 1. 创建/替换 clsact qdisc（幂等替换，已存在则复用）；
    /// 2. 以 direct-action 模式安装 egress filter；
    /// 3. 安装冲突时执行恰好一次恢复：清除既有 filter 后重试一次，
    ///    再失败即进入 Failed 并返回致命错误。
    pub fn attach(&mut self) -> Result<()> {
        if self.state != LifecycleState::Unattached {
            return Err(Error::InvalidState(format!(
                "attach 仅允许在 Unattached 状态调用, 当前: {:?}",
                self.state
            )));
        }
        self.state = LifecycleState::Attaching;

        if let Err(e) = self.transport.replace_qdisc(&self.iface) {
            self.state = LifecycleState::Failed;
            return Err(e);
        }
        info!("clsact qdisc 就绪: {}", self.iface);

        let link = match self.transport.attach_filter(&self.iface, self.direction) {
            Ok(link) => link,
            Err(first) => {
                // 上次运行残留的 filter 可能占用同一优先级；清理后仅重试一次
                warn!("filter 挂载失败, 清理既有绑定后重试: {}", first);
                if let Err(e) = self.transport.purge_filter(&self.iface, self.direction) {
                    self.state = LifecycleState::Failed;
                    return Err(e);
                }
                match self.transport.attach_filter(&self.iface, self.direction) {
                    Ok(link) => link,
                    Err(second) => {
                        self.state = LifecycleState::Failed;
                        return Err(second);
                    }
                }
            }
        };

        self.link = Some(link);
        self.state = LifecycleState::Attached;
        info!(
            "分类器已挂载: {} ({})",
            self.iface,
            self.direction.as_str()
        );
        Ok(())
    }

    /// 执行卸载
    ///
    /// filter 与 qdisc 的移除各自独立尝试，失败只记录日志；
    /// 无论结果如何最终都进入 Detached。非 Attached 状态下调用是空操作，
    /// 因此卸载期间的重复信号不会引起二次清理。
    pub fn detach(&mut self) {
        if self.state != LifecycleState::Attached {
            debug!("跳过卸载, 当前状态: {:?}", self.state);
            return;
        }
        self.state = LifecycleState::Detaching;

        if let Some(link) = self.link.take() {
            if let Err(e) = self.transport.detach_filter(&self.iface, self.direction, link) {
                log_teardown_error(&e);
            }
        }

        if let Err(e) = self.transport.delete_qdisc(&self.iface) {
            log_teardown_error(&e);
        }

        self.state = LifecycleState::Detached;
        info!("filter 与 qdisc 已卸载: {}", self.iface);
    }
}

impl<T: TcTransport> Drop for TcManager<T> {
    fn drop(&mut self) {
        // 任何退出路径上恰好一次的尽力释放
        self.detach();
    }
}
