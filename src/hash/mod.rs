//! 哈希模块 - 摘要计算与桶定位

pub mod indexer;
pub mod strategy;

pub use indexer::{Indexer, ODD_MULTIPLIER};
pub use strategy::{build_hasher_function, DigestHasher, HashAlgorithm, HasherFunction};
