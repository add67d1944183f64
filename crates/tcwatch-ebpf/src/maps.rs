//! 计数器 Map 访问
//!
//! 该模块实现计数器存储协作方：内核态分类器维护的单键 u64 计数 Map。
//! 用户态只读，内核态分类器是唯一写方，读取为单值原子宽度取数，无需加锁。

use aya::maps::{Array, MapData};

use tcwatch_common::{CounterSample, CounterStore, Error, Result};

/// 计数器所在的固定键位
pub const COUNTER_KEY: u32 = 0;

/// 数据包计数器存储
pub struct PacketCounter {
    /// 内核 Map（键 0 处保存通过分类器的数据包总数）
    map: Array<MapData, u64>,
}

impl PacketCounter {
    /// 基于已取出的内核 Map 创建访问器
    pub fn new(map: Array<MapData, u64>) -> Self {
        Self { map }
    }
}

impl CounterStore for PacketCounter {
    fn read(&self) -> Result<CounterSample> {
        self.map
            .get(&COUNTER_KEY, 0)
            .map(CounterSample::now)
            .map_err(|e| Error::CounterReadFailed(e.to_string()))
    }
}
