//! 固定容量的并发Cuckoo哈希表
//! 
//! 每个键有两个候选桶，每桶4个槽位。候选桶都满时，通过有界广度优先搜索
//! 找到一条踢出路径，把路径上的条目逐个搬到各自的备选桶，腾出空位。
//! 
//! ## 主要特性
//! - 装载因子可达90%以上
//! - 锁分段，读写可跨线程并发
//! - 容量耗尽时返回错误，不破坏已有数据
//! - 操作统计与Prometheus文本导出
//! 
//! ## 快速开始
//! 
//! ```rust
//! use striped_cuckoo::*;
//! 
//! fn main() {
//!     // 2^10 个槽位
//!     let map: CuckooMap<String, String> = CuckooMap::new(10);
//!     
//!     // 插入键值对
//!     map.put("key1".to_string(), "value1".to_string()).expect("插入失败");
//!     
//!     // 获取值
//!     if let Some(value) = map.get(&"key1".to_string()) {
//!         println!("key1: {}", value);
//!     }
//!     
//!     // 删除键
//!     assert!(map.delete(&"key1".to_string()));
//!     
//!     // 打印统计信息
//!     println!("{:?}", map.stats());
//! }
//! ```


#![warn(clippy::all)]
#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {};
}
// 核心模块导出
pub mod error;
pub mod types;
pub mod hash;
pub mod map;
pub mod stats;

// 公共接口导出
pub use crate::{
    error::CuckooError,
    hash::{DigestHasher, HashAlgorithm, HasherFunction},
    map::{CuckooMap, CuckooMapConfig, CuckooMapStats, DEFAULT_CONFIG},
    stats::{GlobalStatsRecorder, StatsRecorder, StatsRecorderFactory},
    types::{ByteKey, Key, Value},
};

// 简化默认类型别名
pub type DefaultMap = CuckooMap<String, String>;

// 便捷功能函数

/// 批量插入，返回成功写入的条数
///
/// 遇到容量耗尽不会中止，后续条目继续尝试。
pub fn batch_insert<K: Key, V: Value>(
    map: &CuckooMap<K, V>,
    items: impl IntoIterator<Item = (K, V)>,
) -> usize {
    items
        .into_iter()
        .map(|(k, v)| map.put(k, v))
        .filter(Result::is_ok)
        .count()
}

/// 批量查询
pub fn batch_get<'a, K: Key, V: Value>(
    map: &CuckooMap<K, V>,
    keys: impl IntoIterator<Item = &'a K>,
) -> Vec<Option<V>> {
    keys.into_iter().map(|k| map.get(k)).collect()
}
