//! 哈希策略模块 - 键到64位摘要的映射

use crate::types::{Digest, Key};
use ahash::RandomState;
use std::{
    fmt,
    hash::{BuildHasher, Hasher},
    sync::Arc,
};

/// 默认哈希种子
pub const DEFAULT_SEED: u64 = 42;

/// 哈希算法选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashAlgorithm {
    AHash,
    #[default]
    XxHash,
    Default,
}

/// 哈希函数特征
pub trait HasherFunction: Send + Sync {
    fn hash_bytes(&self, data: &[u8]) -> u64;
}

impl<T> HasherFunction for T
where
    T: Fn(&[u8]) -> u64 + Send + Sync,
{
    fn hash_bytes(&self, data: &[u8]) -> u64 {
        self(data)
    }
}

/// 构建哈希函数
pub fn build_hasher_function(algorithm: HashAlgorithm, seed: u64) -> Arc<dyn HasherFunction> {
    match algorithm {
        HashAlgorithm::AHash => {
            let state = RandomState::with_seed(seed as usize);
            Arc::new(move |data: &[u8]| {
                let mut hasher = state.build_hasher();
                hasher.write(data);
                hasher.finish()
            })
        }
        HashAlgorithm::XxHash => Arc::new(move |data: &[u8]| {
            let mut hasher = twox_hash::XxHash64::with_seed(seed);
            hasher.write(data);
            hasher.finish()
        }),
        HashAlgorithm::Default => Arc::new(|data: &[u8]| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            hasher.write(data);
            hasher.finish()
        }),
    }
}

/// 摘要哈希器
///
/// 包装任意64位哈希函数，对结果强制置最高位，摘要永不为零。
#[derive(Clone)]
pub struct DigestHasher {
    function: Arc<dyn HasherFunction>,
    algorithm: Option<HashAlgorithm>,
}

impl DigestHasher {
    /// 使用内置算法创建
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            function: build_hasher_function(algorithm, DEFAULT_SEED),
            algorithm: Some(algorithm),
        }
    }

    /// 使用自定义哈希函数创建
    pub fn with_function(function: Arc<dyn HasherFunction>) -> Self {
        Self {
            function,
            algorithm: None,
        }
    }

    /// 内置算法；自定义函数时为 `None`
    pub fn algorithm(&self) -> Option<HashAlgorithm> {
        self.algorithm
    }

    #[inline]
    pub fn digest_bytes(&self, bytes: &[u8]) -> Digest {
        Digest::from_hash(self.function.hash_bytes(bytes))
    }

    /// 计算键摘要
    #[inline]
    pub fn digest<K: Key>(&self, key: &K) -> Digest {
        self.digest_bytes(key.as_bytes())
    }
}

impl Default for DigestHasher {
    fn default() -> Self {
        Self::new(HashAlgorithm::default())
    }
}

impl fmt::Debug for DigestHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.algorithm {
            Some(algorithm) => write!(f, "DigestHasher({:?})", algorithm),
            None => write!(f, "DigestHasher(custom)"),
        }
    }
}
