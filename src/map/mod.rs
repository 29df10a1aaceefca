//! 哈希表核心模块 - 实现Cuckoo哈希表及其组件

pub mod config;
pub mod cuckoo_map;
pub mod locks;
pub mod path;
pub mod storage;

pub use config::{CuckooMapConfig, DEFAULT_START_POWER, MAX_HASHPOWER, MIN_HASHPOWER};
pub use cuckoo_map::{CuckooMap, CuckooMapStats};
pub use locks::N_LOCKS;
pub use path::{MAX_PATH_DEPTH, MAX_REACH};
pub use storage::SLOTS_PER_BUCKET;

use once_cell::sync::Lazy;

/// 全局默认配置
pub static DEFAULT_CONFIG: Lazy<CuckooMapConfig> = Lazy::new(CuckooMapConfig::default);
