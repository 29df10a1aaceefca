//! 桶索引计算 - 从摘要推导两个候选桶

use crate::{map::storage::SLOTS_PER_BUCKET, types::Digest};

/// 标签扩散用的奇数乘子
pub const ODD_MULTIPLIER: u64 = 0x5bd1_e995;

/// 桶索引器
///
/// `i1` 取摘要第8位以上的部分，`i2 = i1 ^ (tag * ODD_MULTIPLIER)`。
/// 给定任一候选桶和摘要，`alt_index` 都能求出另一个。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indexer {
    bucket_mask: u64,
}

impl Indexer {
    /// `hashpower` 为槽位总数的2次幂；桶数为其四分之一
    pub fn new(hashpower: u32) -> Self {
        debug_assert!(hashpower >= 2);
        let bucket_power = hashpower - SLOTS_PER_BUCKET.trailing_zeros();
        Self {
            bucket_mask: (1u64 << bucket_power) - 1,
        }
    }

    #[inline]
    pub fn bucket_mask(&self) -> u64 {
        self.bucket_mask
    }

    #[inline]
    pub fn bucket_count(&self) -> usize {
        (self.bucket_mask + 1) as usize
    }

    /// 计算两个候选桶
    #[inline]
    pub fn indexes(&self, digest: Digest) -> (usize, usize) {
        let i1 = (digest.as_u64() >> 8) & self.bucket_mask;
        let i2 = (i1 ^ digest.tag().wrapping_mul(ODD_MULTIPLIER)) & self.bucket_mask;
        (i1 as usize, i2 as usize)
    }

    /// 计算占用者的另一个桶
    #[inline]
    pub fn alt_index(&self, bucket: usize, digest: Digest) -> usize {
        ((bucket as u64 ^ digest.tag().wrapping_mul(ODD_MULTIPLIER)) & self.bucket_mask) as usize
    }
}
