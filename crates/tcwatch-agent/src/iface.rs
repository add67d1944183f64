//! 网络接口解析
//!
//! 把人类可读的接口名映射为内核接口索引。一次性的只读查询，不做重试；
//! 接口不存在是致命的启动错误。

use pnet::datalink;
use tracing::debug;

use tcwatch_common::{Error, InterfaceRef, Result};

/// 按名称解析网络接口
pub fn resolve(name: &str) -> Result<InterfaceRef> {
    let iface = datalink::interfaces()
        .into_iter()
        .find(|i| i.name == name)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))?;

    debug!("接口解析完成: {} -> {}", name, iface.index);
    Ok(InterfaceRef::new(iface.name, iface.index))
}
