// src/map/storage.rs
//! 槽位与桶 - 定长4槽桶，槽位以值拥有键值对

use crate::types::{Digest, Key};
use std::{fmt, mem};

/// 每桶槽位数
pub const SLOTS_PER_BUCKET: usize = 4;

/// 槽位在逻辑存储数组中的偏移
#[inline]
pub const fn slot_offset(bucket: usize, slot: usize) -> usize {
    bucket * SLOTS_PER_BUCKET + slot
}

/// 单个槽位
///
/// `digest == 0` 当且仅当 `entry` 为 `None`。
pub struct Slot<K, V> {
    digest: u64,
    entry: Option<(K, V)>,
}

impl<K, V> Default for Slot<K, V> {
    fn default() -> Self {
        Self {
            digest: 0,
            entry: None,
        }
    }
}

impl<K, V> Slot<K, V> {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.digest == 0
    }

    #[inline]
    pub fn digest(&self) -> u64 {
        self.digest
    }

    pub fn key(&self) -> Option<&K> {
        self.entry.as_ref().map(|(k, _)| k)
    }

    pub fn value(&self) -> Option<&V> {
        self.entry.as_ref().map(|(_, v)| v)
    }
}

impl<K: Key, V> Slot<K, V> {
    /// 摘要过滤后再比较键
    #[inline]
    fn matches(&self, digest: Digest, key: &K) -> bool {
        self.digest == digest.as_u64() && self.key().is_some_and(|k| k == key)
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Slot<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "Slot({:016X}, {:?})", self.digest, key),
            None => write!(f, "Slot(empty)"),
        }
    }
}

/// 桶 - 容量检查与踢出的基本单位
pub struct Bucket<K, V> {
    slots: [Slot<K, V>; SLOTS_PER_BUCKET],
}

impl<K, V> Default for Bucket<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Bucket<K, V> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::default()),
        }
    }

    /// 返回桶中所有槽位
    pub fn slots(&self) -> &[Slot<K, V>] {
        &self.slots
    }

    /// 第一个空槽位
    pub fn has_space(&self) -> Option<usize> {
        self.slots.iter().position(Slot::is_empty)
    }

    #[inline]
    pub fn read_slot_digest(&self, slot: usize) -> u64 {
        self.slots[slot].digest
    }

    pub fn read_slot_key(&self, slot: usize) -> Option<&K> {
        self.slots[slot].key()
    }

    /// 所有槽位摘要的快照
    pub fn digests(&self) -> [u64; SLOTS_PER_BUCKET] {
        std::array::from_fn(|i| self.slots[i].digest)
    }

    /// 覆盖写入槽位
    pub fn write_slot(&mut self, slot: usize, digest: Digest, key: K, value: V) {
        self.slots[slot] = Slot {
            digest: digest.as_u64(),
            entry: Some((key, value)),
        };
    }

    /// 清空槽位，返回原键值对
    pub fn clear_slot(&mut self, slot: usize) -> Option<(K, V)> {
        mem::take(&mut self.slots[slot]).entry
    }

    /// 取出整个槽位，原位置留空
    pub fn take_slot(&mut self, slot: usize) -> Slot<K, V> {
        mem::take(&mut self.slots[slot])
    }

    /// 放入整个槽位；目标必须为空
    pub fn put_slot(&mut self, slot: usize, moved: Slot<K, V>) {
        debug_assert!(self.slots[slot].is_empty(), "目标槽位 {} 非空", slot);
        self.slots[slot] = moved;
    }
}

impl<K: Key, V> Bucket<K, V> {
    /// 查找键所在槽位
    pub fn find(&self, digest: Digest, key: &K) -> Option<usize> {
        self.slots.iter().position(|slot| slot.matches(digest, key))
    }

    /// 摘要与键都匹配时返回值
    pub fn try_read(&self, digest: Digest, key: &K) -> Option<&V> {
        self.find(digest, key).and_then(|slot| self.slots[slot].value())
    }

    /// 原地替换已存在条目的值
    pub fn replace_value(&mut self, slot: usize, value: V) -> Option<V> {
        self.slots[slot]
            .entry
            .as_mut()
            .map(|(_, v)| mem::replace(v, value))
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Bucket<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.slots.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(raw: u64) -> Digest {
        Digest::from_hash(raw)
    }

    #[test]
    fn test_new_bucket_is_empty() {
        let bucket: Bucket<String, String> = Bucket::new();
        assert_eq!(bucket.slots().len(), SLOTS_PER_BUCKET);
        assert_eq!(bucket.has_space(), Some(0));
        assert_eq!(bucket.digests(), [0; SLOTS_PER_BUCKET]);
        assert!(bucket.slots().iter().all(Slot::is_empty));
    }

    #[test]
    fn test_has_space_fills_in_order() {
        let mut bucket = Bucket::new();
        for expected in 0..SLOTS_PER_BUCKET {
            let slot = bucket.has_space().expect("应有空槽位");
            assert_eq!(slot, expected);
            bucket.write_slot(slot, digest(slot as u64), format!("k{}", slot), slot);
        }
        assert_eq!(bucket.has_space(), None);

        bucket.clear_slot(2);
        assert_eq!(bucket.has_space(), Some(2));
    }

    #[test]
    fn test_try_read_requires_key_equality() {
        let mut bucket = Bucket::new();
        let d = digest(7);
        bucket.write_slot(1, d, "alpha".to_string(), 1);

        assert_eq!(bucket.try_read(d, &"alpha".to_string()), Some(&1));
        // 摘要相同但键不同
        assert_eq!(bucket.try_read(d, &"beta".to_string()), None);
        // 键相同但摘要不同
        assert_eq!(bucket.try_read(digest(8), &"alpha".to_string()), None);
    }

    #[test]
    fn test_clear_slot_releases_entry() {
        let mut bucket = Bucket::new();
        bucket.write_slot(0, digest(1), "a".to_string(), "va".to_string());
        let removed = bucket.clear_slot(0);
        assert_eq!(removed, Some(("a".to_string(), "va".to_string())));
        assert_eq!(bucket.read_slot_digest(0), 0);
        assert!(bucket.read_slot_key(0).is_none());
        assert_eq!(bucket.clear_slot(0), None);
    }

    #[test]
    fn test_take_and_put_moves_slot() {
        let mut from = Bucket::new();
        let mut to = Bucket::new();
        from.write_slot(3, digest(9), "moved".to_string(), 99);

        let slot = from.take_slot(3);
        to.put_slot(0, slot);

        assert!(from.slots()[3].is_empty());
        assert_eq!(to.read_slot_key(0), Some(&"moved".to_string()));
        assert_eq!(to.read_slot_digest(0), digest(9).as_u64());
    }

    #[test]
    fn test_replace_value() {
        let mut bucket = Bucket::new();
        let d = digest(3);
        bucket.write_slot(2, d, "k".to_string(), 1);
        assert_eq!(bucket.replace_value(2, 2), Some(1));
        assert_eq!(bucket.try_read(d, &"k".to_string()), Some(&2));
        assert_eq!(bucket.replace_value(0, 5), None);
    }

    #[test]
    fn test_slot_offset_layout() {
        assert_eq!(slot_offset(5, 3), 23);
        assert_eq!(slot_offset(0, SLOTS_PER_BUCKET - 1) + 1, slot_offset(1, 0));
    }
}
