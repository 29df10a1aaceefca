//! Cuckoo哈希表核心实现

use crate::{
    error::CuckooError,
    hash::{DigestHasher, HasherFunction, Indexer},
    map::{
        config::CuckooMapConfig,
        DEFAULT_CONFIG,
        locks::{LockStripes, WriteStripes},
        path::{CuckooPath, PathFinder},
    },
    stats::{
        operation::OperationStatsSnapshot,
        recorder::{StatsRecorder, StatsRecorderFactory},
    },
    types::{Digest, Key, OperationType, Value},
};
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

/// 哈希表统计信息
#[derive(Debug, Default, Clone)]
pub struct CuckooMapStats {
    pub size: usize,
    pub capacity: usize,
    pub bucket_count: usize,
    pub load_factor: f32,
    pub operations: OperationStatsSnapshot,
}

/// 在候选桶中直接放置的结果
enum Placement<K, V> {
    /// 键已存在，原地更新
    Updated(Option<V>),
    Inserted,
    /// 两个候选桶都满，键值原样交还
    Full(K, V),
}

/// 踢出路径提交结果
enum Commit<K, V> {
    Done(Option<V>),
    /// 路径在搜索与加锁之间被并发修改
    CommitConflict(K, V),
}

/// Cuckoo哈希表
///
/// 容量在构造时固定为 `2^hashpower` 个槽位，每桶4个槽位。
/// 所有操作只需 `&self`，可以通过 `Arc` 在线程间共享。
pub struct CuckooMap<K: Key, V: Value> {
    // 桶存储及其锁分段
    stripes: LockStripes<K, V>,

    indexer: Indexer,
    hasher: DigestHasher,
    path_finder: PathFinder,

    config: CuckooMapConfig,

    // 当前条目数
    size: AtomicUsize,

    // 统计记录器
    stats_recorder: Arc<dyn StatsRecorder>,
}

impl<K: Key, V: Value> CuckooMap<K, V> {
    /// 创建容量为 `2^hashpower` 个槽位的哈希表
    ///
    /// # Panics
    ///
    /// `hashpower` 不在 `2..=40` 范围内时 panic；需要错误返回时使用 [`CuckooMap::try_new`]。
    pub fn new(hashpower: u32) -> Self {
        match Self::try_new(hashpower) {
            Ok(map) => map,
            Err(e) => panic!("{}", e),
        }
    }

    /// `new` 的可失败版本
    pub fn try_new(hashpower: u32) -> Result<Self, CuckooError> {
        Self::with_config(CuckooMapConfig::with_hashpower(hashpower))
    }

    /// 按配置创建
    pub fn with_config(config: CuckooMapConfig) -> Result<Self, CuckooError> {
        let hasher = DigestHasher::new(config.hash_algorithm);
        Self::with_parts(config, hasher, StatsRecorderFactory::create_default())
    }

    /// 使用自定义哈希函数创建
    pub fn with_hasher(
        config: CuckooMapConfig,
        function: Arc<dyn HasherFunction>,
    ) -> Result<Self, CuckooError> {
        Self::with_parts(
            config,
            DigestHasher::with_function(function),
            StatsRecorderFactory::create_default(),
        )
    }

    /// 指定全部组件创建
    pub fn with_parts(
        config: CuckooMapConfig,
        hasher: DigestHasher,
        stats_recorder: Arc<dyn StatsRecorder>,
    ) -> Result<Self, CuckooError> {
        config.validate()?;

        let indexer = Indexer::new(config.hashpower);
        let stripes = LockStripes::new(indexer.bucket_count(), config.lock_stripes);

        log_info!(
            "CuckooMap created: capacity={}, buckets={}, stripes={}, hasher={:?}",
            config.capacity(),
            indexer.bucket_count(),
            stripes.stripe_count(),
            hasher
        );

        Ok(Self {
            stripes,
            indexer,
            hasher,
            path_finder: PathFinder::new(indexer),
            config,
            size: AtomicUsize::new(0),
            stats_recorder,
        })
    }

    /// 写入键值对，键已存在时覆盖
    pub fn put(&self, key: K, value: V) -> Result<(), CuckooError> {
        self.insert(key, value).map(|_| ())
    }

    /// 写入键值对，返回被覆盖的旧值
    ///
    /// 两个候选桶都满时搜索踢出路径；找不到路径时返回
    /// [`CuckooError::CapacityExhausted`]，表内容不变。
    pub fn insert(&self, key: K, value: V) -> Result<Option<V>, CuckooError> {
        self.insert_searching(key, value, |i1, i2| self.path_finder.search(&self.stripes, i1, i2))
    }

    /// 写入流程，`search` 负责在不持锁时给出踢出路径
    fn insert_searching(
        &self,
        key: K,
        value: V,
        mut search: impl FnMut(usize, usize) -> Option<CuckooPath>,
    ) -> Result<Option<V>, CuckooError> {
        let digest = self.hasher.digest(&key);
        let (i1, i2) = self.indexer.indexes(digest);

        let (mut key, mut value) = {
            let mut set = self.stripes.lock_write(&[i1, i2]);
            match self.place(&mut set, digest, i1, i2, key, value) {
                Placement::Updated(old) => return Ok(old),
                Placement::Inserted => return Ok(None),
                Placement::Full(key, value) => (key, value),
            }
        };

        let mut retries = 0;
        loop {
            // 搜索期间不持有任何锁
            let path = match search(i1, i2) {
                Some(path) => path,
                None => return Err(self.exhausted()),
            };
            log_debug!("eviction path found for {:?}: depth={}", key, path.depth());

            match self.commit(&path, digest, i1, i2, key, value) {
                Commit::Done(old) => return Ok(old),
                Commit::CommitConflict(k, v) => {
                    if retries >= self.config.max_commit_retries {
                        return Err(self.exhausted());
                    }
                    retries += 1;
                    self.stats_recorder.record_operation_count(OperationType::Retry);
                    log_debug!("eviction path for {:?} changed before commit, retry {}", k, retries);
                    key = k;
                    value = v;
                }
            }
        }
    }

    /// 在候选桶中更新或直接写入
    fn place(
        &self,
        set: &mut WriteStripes<'_, K, V>,
        digest: Digest,
        i1: usize,
        i2: usize,
        key: K,
        value: V,
    ) -> Placement<K, V> {
        // 先查重，保证同一个键只有一份
        for bucket in [i1, i2] {
            if let Some(slot) = set.bucket(bucket).find(digest, &key) {
                let old = set.bucket_mut(bucket).replace_value(slot, value);
                self.stats_recorder.record_operation_count(OperationType::Update);
                return Placement::Updated(old);
            }
        }

        for bucket in [i1, i2] {
            if let Some(slot) = set.bucket(bucket).has_space() {
                set.bucket_mut(bucket).write_slot(slot, digest, key, value);
                self.size.fetch_add(1, Ordering::Relaxed);
                self.stats_recorder.record_operation_count(OperationType::Insert);
                return Placement::Inserted;
            }
        }

        Placement::Full(key, value)
    }

    /// 锁住路径上所有分段，复核后从深到浅依次搬移
    fn commit(
        &self,
        path: &CuckooPath,
        digest: Digest,
        i1: usize,
        i2: usize,
        key: K,
        value: V,
    ) -> Commit<K, V> {
        let mut buckets: Vec<usize> = path.buckets().collect();
        buckets.extend([i1, i2]);
        let mut set = self.stripes.lock_write(&buckets);

        // 释放锁期间可能已有空位或同键写入
        let (key, value) = match self.place(&mut set, digest, i1, i2, key, value) {
            Placement::Updated(old) => return Commit::Done(old),
            Placement::Inserted => return Commit::Done(None),
            Placement::Full(key, value) => (key, value),
        };

        if !path.is_current(|bucket, slot| set.bucket(bucket).read_slot_digest(slot)) {
            return Commit::CommitConflict(key, value);
        }

        let steps = path.steps();
        for i in (1..steps.len()).rev() {
            let (from, to) = (steps[i - 1], steps[i]);
            let moved = set.bucket_mut(from.bucket).take_slot(from.slot);
            set.bucket_mut(to.bucket).put_slot(to.slot, moved);
        }

        let head = path.head();
        set.bucket_mut(head.bucket).write_slot(head.slot, digest, key, value);
        self.size.fetch_add(1, Ordering::Relaxed);

        if path.depth() > 0 {
            self.stats_recorder.record_operation_count(OperationType::Kick);
            self.stats_recorder
                .record_operations(OperationType::Displacement, path.depth() as u64);
        }
        self.stats_recorder.record_operation_count(OperationType::Insert);
        Commit::Done(None)
    }

    fn exhausted(&self) -> CuckooError {
        let size = self.len();
        log_warn!(
            "CuckooMap capacity exhausted: size={}, capacity={}, load_factor={:.3}",
            size,
            self.capacity(),
            self.load_factor()
        );
        self.stats_recorder.record_operation_count(OperationType::Full);
        CuckooError::CapacityExhausted {
            capacity: self.capacity(),
            size,
        }
    }

    /// 获取值的副本
    pub fn get(&self, key: &K) -> Option<V> {
        let digest = self.hasher.digest(key);
        let (i1, i2) = self.indexer.indexes(digest);

        let found = {
            let set = self.stripes.lock_read(&[i1, i2]);
            set.bucket(i1)
                .try_read(digest, key)
                .or_else(|| set.bucket(i2).try_read(digest, key))
                .cloned()
        };

        match found {
            Some(_) => self.stats_recorder.record_operation_count(OperationType::Get),
            None => {
                self.stats_recorder.record_operation_count(OperationType::Miss);
                log_debug!("get miss for {:?}: i1={}, i2={}", key, i1, i2);
            }
        }
        found
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let digest = self.hasher.digest(key);
        let (i1, i2) = self.indexer.indexes(digest);

        let set = self.stripes.lock_read(&[i1, i2]);
        set.bucket(i1).find(digest, key).is_some() || set.bucket(i2).find(digest, key).is_some()
    }

    /// 删除键，返回被删除的值
    pub fn remove(&self, key: &K) -> Option<V> {
        let digest = self.hasher.digest(key);
        let (i1, i2) = self.indexer.indexes(digest);

        let mut set = self.stripes.lock_write(&[i1, i2]);
        for bucket in [i1, i2] {
            if let Some(slot) = set.bucket(bucket).find(digest, key) {
                let removed = set.bucket_mut(bucket).clear_slot(slot);
                self.size.fetch_sub(1, Ordering::Relaxed);
                self.stats_recorder.record_operation_count(OperationType::Remove);
                return removed.map(|(_, value)| value);
            }
        }
        None
    }

    /// 删除键，存在时返回 `true`
    pub fn delete(&self, key: &K) -> bool {
        self.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 槽位总数
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    pub fn bucket_count(&self) -> usize {
        self.indexer.bucket_count()
    }

    pub fn hashpower(&self) -> u32 {
        self.config.hashpower
    }

    pub fn config(&self) -> &CuckooMapConfig {
        &self.config
    }

    pub fn load_factor(&self) -> f32 {
        self.len() as f32 / self.capacity() as f32
    }

    pub fn stats_recorder(&self) -> &Arc<dyn StatsRecorder> {
        &self.stats_recorder
    }

    /// 获取统计信息
    pub fn stats(&self) -> CuckooMapStats {
        CuckooMapStats {
            size: self.len(),
            capacity: self.capacity(),
            bucket_count: self.bucket_count(),
            load_factor: self.load_factor(),
            operations: self.stats_recorder.operation_stats_snapshot(),
        }
    }
}

impl<K: Key, V: Value> Default for CuckooMap<K, V> {
    fn default() -> Self {
        match Self::with_config(DEFAULT_CONFIG.clone()) {
            Ok(map) => map,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<K: Key, V: Value> fmt::Debug for CuckooMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuckooMap")
            .field("size", &self.len())
            .field("capacity", &self.capacity())
            .field("load_factor", &self.load_factor())
            .finish()
    }
}
