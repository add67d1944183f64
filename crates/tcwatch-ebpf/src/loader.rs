//! eBPF 分类器加载器
//!
//! 该模块负责把内核态分类器字节码装入内核：先解除内存锁定限制，
//! 再加载 ELF 对象并完成程序校验，最后取出计数器 Map 的所有权。
//! 加载产物的内核资源在对象 Drop 时由 Aya 统一释放。

use std::path::{Path, PathBuf};

use aya::maps::Array;
use aya::programs::SchedClassifier;
use aya::Bpf;
use aya_log::BpfLogger;
use tracing::{debug, info, warn};

use tcwatch_common::{Error, Result};

use crate::maps::PacketCounter;

/// 默认的分类器程序名（ELF 中的 section 名称）
pub const DEFAULT_PROGRAM_NAME: &str = "tcwatch_egress";

/// 默认的计数器 Map 名称
pub const DEFAULT_COUNTER_MAP: &str = "PKT_COUNT";

/// 加载完成的分类器对象
///
/// `bpf` 持有已校验的程序与剩余 Map 的所有权；`counter` 是取出的计数器存储。
/// 二者 Drop 时释放各自的内核资源，满足加载器在进程退出时的释放义务。
pub struct LoadedClassifier {
    /// Aya eBPF 对象（含已加载的分类器程序）
    pub bpf: Bpf,
    /// 计数器存储访问器
    pub counter: PacketCounter,
}

/// 分类器加载器
pub struct ClassifierLoader {
    /// 字节码文件路径
    bpf_path: PathBuf,
    /// 分类器程序名
    program_name: String,
    /// 计数器 Map 名
    counter_map: String,
}

impl ClassifierLoader {
    /// 创建新的加载器
    pub fn new(bpf_path: impl AsRef<Path>) -> Self {
        Self {
            bpf_path: bpf_path.as_ref().to_path_buf(),
            program_name: DEFAULT_PROGRAM_NAME.to_string(),
            counter_map: DEFAULT_COUNTER_MAP.to_string(),
        }
    }

    /// 覆盖分类器程序名
    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = name.into();
        self
    }

    /// 覆盖计数器 Map 名
    pub fn with_counter_map(mut self, name: impl Into<String>) -> Self {
        self.counter_map = name.into();
        self
    }

    /// 程序名访问器
    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    /// 执行加载
    ///
    /// 任一步骤失败都是致命错误：没有正确加载的分类器，后续挂载无从谈起。
    pub fn load(self) -> Result<LoadedClassifier> {
        remove_memlock_limit()?;

        if !self.bpf_path.exists() {
            return Err(Error::ProgramLoadFailed(format!(
                "字节码文件不存在: {:?}",
                self.bpf_path
            )));
        }

        info!("加载 eBPF 分类器: {:?}", self.bpf_path);

        let mut bpf = Bpf::load_file(&self.bpf_path)
            .map_err(|e| Error::ProgramLoadFailed(e.to_string()))?;

        // 内核程序若未使用 aya-log 则初始化失败，不影响加载
        if let Err(e) = BpfLogger::init(&mut bpf) {
            debug!("aya-log 初始化跳过: {}", e);
        }

        let program: &mut SchedClassifier = bpf
            .program_mut(&self.program_name)
            .ok_or_else(|| {
                Error::ProgramLoadFailed(format!("未找到分类器程序 {}", self.program_name))
            })?
            .try_into()
            .map_err(|e: aya::programs::ProgramError| Error::ProgramLoadFailed(e.to_string()))?;

        program
            .load()
            .map_err(|e| Error::ProgramLoadFailed(e.to_string()))?;

        let map = bpf.take_map(&self.counter_map).ok_or_else(|| {
            Error::ProgramLoadFailed(format!("未找到计数器 Map {}", self.counter_map))
        })?;
        let counter = PacketCounter::new(
            Array::try_from(map).map_err(|e| Error::ProgramLoadFailed(e.to_string()))?,
        );

        info!("eBPF 分类器加载完成: {}", self.program_name);

        Ok(LoadedClassifier { bpf, counter })
    }
}

/// 解除内存锁定限制
///
/// 加载 eBPF 程序需要锁定内存页，默认的 RLIMIT_MEMLOCK 往往不够。
fn remove_memlock_limit() -> Result<()> {
    let rlim = libc::rlimit {
        rlim_cur: libc::RLIM_INFINITY,
        rlim_max: libc::RLIM_INFINITY,
    };

    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        warn!("解除内存锁定限制失败: {}", err);
        return Err(Error::MemoryLockRemovalFailed(err.to_string()));
    }

    debug!("已解除内存锁定限制");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_defaults() {
        let loader = ClassifierLoader::new("/opt/tcwatch/bpf/tcwatch.o");
        assert_eq!(loader.program_name(), DEFAULT_PROGRAM_NAME);
        assert_eq!(loader.counter_map, DEFAULT_COUNTER_MAP);
    }

    #[test]
    fn test_loader_name_overrides() {
        let loader = ClassifierLoader::new("/tmp/obj.o")
            .with_program_name("mvp_prog")
            .with_counter_map("pkt_count_map");
        assert_eq!(loader.program_name(), "mvp_prog");
        assert_eq!(loader.counter_map, "pkt_count_map");
    }

    #[test]
    fn test_load_missing_object_is_fatal() {
        // 字节码不存在时必须以 ProgramLoadFailed 失败，且不进行任何内核修改
        let result = ClassifierLoader::new("/nonexistent/tcwatch.o").load();
        match result {
            Err(Error::ProgramLoadFailed(_)) => {}
            Err(Error::MemoryLockRemovalFailed(_)) => {
                // 非特权测试环境下 setrlimit 可能先行失败，同样是致命启动错误
            }
            other => panic!("预期启动阶段致命错误, 实际: {:?}", other.map(|_| ())),
        }
    }
}
