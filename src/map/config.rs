//! 哈希表配置

use crate::{
    error::CuckooError,
    hash::HashAlgorithm,
    map::{locks::N_LOCKS, DEFAULT_CONFIG},
};

/// 默认槽位总数为 2^16
pub const DEFAULT_START_POWER: u32 = 16;

/// 允许的 hashpower 范围；至少要能组成一个桶
pub const MIN_HASHPOWER: u32 = 2;
pub const MAX_HASHPOWER: u32 = 40;

/// 提交冲突的默认重试上限
pub const DEFAULT_COMMIT_RETRIES: usize = 8;

/// 哈希表配置
#[derive(Clone, Debug, PartialEq)]
pub struct CuckooMapConfig {
    /// 槽位总数的2次幂
    pub hashpower: u32,
    pub hash_algorithm: HashAlgorithm,
    /// 踢出路径提交冲突后的最大重试次数
    pub max_commit_retries: usize,
    /// 锁分段数，须为2的幂；实际取值不超过桶数
    pub lock_stripes: usize,
}

impl Default for CuckooMapConfig {
    fn default() -> Self {
        Self {
            hashpower: DEFAULT_START_POWER,
            hash_algorithm: HashAlgorithm::default(),
            max_commit_retries: DEFAULT_COMMIT_RETRIES,
            lock_stripes: N_LOCKS,
        }
    }
}

impl CuckooMapConfig {
    /// 指定 hashpower，其余取默认值
    pub fn with_hashpower(hashpower: u32) -> Self {
        Self {
            hashpower,
            ..DEFAULT_CONFIG.clone()
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), CuckooError> {
        if !(MIN_HASHPOWER..=MAX_HASHPOWER).contains(&self.hashpower) {
            return Err(CuckooError::InvalidConfig {
                reason: format!(
                    "hashpower {} 超出范围 {}..={}",
                    self.hashpower, MIN_HASHPOWER, MAX_HASHPOWER
                ),
            });
        }
        if !self.lock_stripes.is_power_of_two() {
            return Err(CuckooError::InvalidConfig {
                reason: format!("lock_stripes {} 不是2的幂", self.lock_stripes),
            });
        }
        Ok(())
    }

    /// 槽位总数
    pub fn capacity(&self) -> usize {
        1usize << self.hashpower
    }
}
