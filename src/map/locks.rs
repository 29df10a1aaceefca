// src/map/locks.rs
//! 锁分段 - 每个分段拥有并保护 `bucket % stripe_count` 相同的所有桶

use crate::map::storage::{Bucket, SLOTS_PER_BUCKET};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};

/// 默认锁分段数
pub const N_LOCKS: usize = 2048;

/// 一个锁分段内的桶
///
/// 全局桶号 `b` 位于分段 `b & mask` 的第 `b >> shift` 个位置。
pub struct Stripe<K, V> {
    buckets: Vec<Bucket<K, V>>,
}

impl<K, V> Stripe<K, V> {
    fn new(len: usize) -> Self {
        Self {
            buckets: (0..len).map(|_| Bucket::new()).collect(),
        }
    }
}

/// 只读快照接口，供踢出搜索读取桶内摘要
pub trait BucketSnapshot {
    fn bucket_digests(&self, bucket: usize) -> [u64; SLOTS_PER_BUCKET];
}

/// 锁分段管理器
pub struct LockStripes<K, V> {
    stripes: Box<[RwLock<Stripe<K, V>>]>,
    stripe_mask: usize,
    stripe_shift: u32,
}

impl<K, V> LockStripes<K, V> {
    /// `bucket_count` 与 `max_stripes` 都须为2的幂
    pub fn new(bucket_count: usize, max_stripes: usize) -> Self {
        debug_assert!(bucket_count.is_power_of_two());
        debug_assert!(max_stripes.is_power_of_two());
        let stripe_count = max_stripes.min(bucket_count);
        let per_stripe = bucket_count / stripe_count;
        let stripes = (0..stripe_count)
            .map(|_| RwLock::new(Stripe::new(per_stripe)))
            .collect();

        Self {
            stripes,
            stripe_mask: stripe_count - 1,
            stripe_shift: stripe_count.trailing_zeros(),
        }
    }

    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }

    #[inline]
    pub fn stripe_index(&self, bucket: usize) -> usize {
        bucket & self.stripe_mask
    }

    /// 排序去重后的分段号，即加锁顺序
    pub fn ordered_stripes(&self, buckets: &[usize]) -> Vec<usize> {
        let mut order: Vec<usize> = buckets.iter().map(|&b| self.stripe_index(b)).collect();
        order.sort_unstable();
        order.dedup();
        order
    }

    /// 短暂共享锁下读取单个桶
    pub fn read_bucket<R>(&self, bucket: usize, f: impl FnOnce(&Bucket<K, V>) -> R) -> R {
        let stripe = self.stripes[self.stripe_index(bucket)].read();
        f(&stripe.buckets[bucket >> self.stripe_shift])
    }

    /// 按升序获取覆盖这些桶的共享锁
    pub fn lock_read(&self, buckets: &[usize]) -> ReadStripes<'_, K, V> {
        let guards = self
            .ordered_stripes(buckets)
            .into_iter()
            .map(|s| (s, self.stripes[s].read()))
            .collect();
        self.stripe_set(guards)
    }

    /// 按升序获取覆盖这些桶的独占锁
    pub fn lock_write(&self, buckets: &[usize]) -> WriteStripes<'_, K, V> {
        let guards = self
            .ordered_stripes(buckets)
            .into_iter()
            .map(|s| (s, self.stripes[s].write()))
            .collect();
        self.stripe_set(guards)
    }

    fn stripe_set<G>(&self, guards: Vec<(usize, G)>) -> StripeSet<G> {
        StripeSet {
            guards,
            stripe_mask: self.stripe_mask,
            stripe_shift: self.stripe_shift,
        }
    }
}

impl<K, V> BucketSnapshot for LockStripes<K, V> {
    fn bucket_digests(&self, bucket: usize) -> [u64; SLOTS_PER_BUCKET] {
        self.read_bucket(bucket, Bucket::digests)
    }
}

/// 已加锁的一组分段
///
/// 只能访问其中分段覆盖的桶；访问未加锁的桶属于调用方错误。
pub struct StripeSet<G> {
    guards: Vec<(usize, G)>,
    stripe_mask: usize,
    stripe_shift: u32,
}

pub type ReadStripes<'a, K, V> = StripeSet<RwLockReadGuard<'a, Stripe<K, V>>>;
pub type WriteStripes<'a, K, V> = StripeSet<RwLockWriteGuard<'a, Stripe<K, V>>>;

impl<G> StripeSet<G> {
    /// 已持有的分段号（升序）
    #[cfg(test)]
    fn stripes(&self) -> impl Iterator<Item = usize> + '_ {
        self.guards.iter().map(|(s, _)| *s)
    }

    fn position(&self, bucket: usize) -> usize {
        let stripe = bucket & self.stripe_mask;
        match self.guards.binary_search_by_key(&stripe, |(s, _)| *s) {
            Ok(pos) => pos,
            Err(_) => panic!("桶 {} 所在分段 {} 未加锁", bucket, stripe),
        }
    }
}

impl<G, K, V> StripeSet<G>
where
    G: Deref<Target = Stripe<K, V>>,
{
    pub fn bucket(&self, bucket: usize) -> &Bucket<K, V> {
        let pos = self.position(bucket);
        &self.guards[pos].1.buckets[bucket >> self.stripe_shift]
    }
}

impl<G, K, V> StripeSet<G>
where
    G: DerefMut<Target = Stripe<K, V>>,
{
    pub fn bucket_mut(&mut self, bucket: usize) -> &mut Bucket<K, V> {
        let pos = self.position(bucket);
        let local = bucket >> self.stripe_shift;
        &mut self.guards[pos].1.buckets[local]
    }
}
