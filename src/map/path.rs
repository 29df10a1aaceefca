// src/map/path.rs
//! 踢出路径搜索 - 在桶置换图上做有界广度优先搜索

use crate::{
    hash::Indexer,
    map::{
        locks::BucketSnapshot,
        storage::{slot_offset, SLOTS_PER_BUCKET},
    },
    types::Digest,
};

/// 最多展开的队列条目数
pub const MAX_REACH: usize = 500;

/// 路径最多包含的桶数，即 ceil(log4(MAX_REACH))
pub const MAX_PATH_DEPTH: usize = 5;

/// 搜索队列条目，`parent` 为父条目在队列中的下标
#[derive(Debug, Clone, Copy, Default)]
struct PathEntry {
    bucket: usize,
    depth: usize,
    parent: usize,
    parent_slot: usize,
    parent_digest: u64,
}

/// 路径中的一步
///
/// 除最后一步外，`digest` 是搜索时在该槽位看到的占用者摘要；
/// 最后一步是空槽位，`digest` 为0。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathStep {
    pub bucket: usize,
    pub slot: usize,
    pub digest: u64,
}

impl PathStep {
    #[inline]
    pub fn offset(&self) -> usize {
        slot_offset(self.bucket, self.slot)
    }
}

/// 一条踢出路径
///
/// `steps()[0]` 位于候选桶之一，`steps()[depth]` 是空槽位。
/// 提交时从深到浅依次把 `steps[i-1]` 的占用者搬到 `steps[i]`。
#[derive(Debug, Clone)]
pub struct CuckooPath {
    steps: [PathStep; MAX_PATH_DEPTH],
    depth: usize,
}

impl CuckooPath {
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps[..=self.depth]
    }

    /// 新条目最终写入的位置
    pub fn head(&self) -> PathStep {
        self.steps[0]
    }

    pub fn free_slot(&self) -> PathStep {
        self.steps[self.depth]
    }

    pub fn buckets(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps().iter().map(|step| step.bucket)
    }

    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.steps().iter().map(PathStep::offset)
    }

    pub fn has_distinct_offsets(&self) -> bool {
        self.offsets()
            .enumerate()
            .all(|(i, a)| self.offsets().skip(i + 1).all(|b| a != b))
    }

    /// 路径上每个槽位是否仍是搜索时的样子
    pub fn is_current(&self, read_digest: impl Fn(usize, usize) -> u64) -> bool {
        self.has_distinct_offsets()
            && self
                .steps()
                .iter()
                .all(|step| read_digest(step.bucket, step.slot) == step.digest)
    }
}

/// 踢出路径搜索器
#[derive(Debug, Clone, Copy)]
pub struct PathFinder {
    indexer: Indexer,
}

impl PathFinder {
    pub fn new(indexer: Indexer) -> Self {
        Self { indexer }
    }

    /// 从候选桶 `i1`、`i2` 出发搜索能腾出空槽位的路径
    ///
    /// 每个桶通过 `source` 单独读取快照，搜索期间不持有锁；
    /// 返回的路径需要在加锁后用 [`CuckooPath::is_current`] 复核。
    /// 队列耗尽或达到 `MAX_REACH` 仍未找到时返回 `None`。
    pub fn search<S: BucketSnapshot + ?Sized>(
        &self,
        source: &S,
        i1: usize,
        i2: usize,
    ) -> Option<CuckooPath> {
        let mut queue = [PathEntry::default(); MAX_REACH];
        let mut head = 0;
        let mut tail = 0;

        for bucket in [i1, i2] {
            if tail == 0 || queue[0].bucket != bucket {
                queue[tail] = PathEntry {
                    bucket,
                    ..PathEntry::default()
                };
                tail += 1;
            }
        }

        while head < tail {
            let pos = head;
            let candidate = queue[pos];
            head += 1;

            let digests = source.bucket_digests(candidate.bucket);
            if let Some(free) = digests.iter().position(|&d| d == 0) {
                return Some(Self::reconstruct(&queue, pos, free));
            }

            if candidate.depth + 1 >= MAX_PATH_DEPTH {
                continue;
            }

            for (slot, &digest) in digests.iter().enumerate() {
                if tail >= MAX_REACH {
                    break;
                }
                // 存储的摘要已置最高位
                let alt = self.indexer.alt_index(candidate.bucket, Digest::from_hash(digest));
                if Self::on_chain(&queue, pos, alt) {
                    continue;
                }
                queue[tail] = PathEntry {
                    bucket: alt,
                    depth: candidate.depth + 1,
                    parent: pos,
                    parent_slot: slot,
                    parent_digest: digest,
                };
                tail += 1;
            }
        }

        None
    }

    /// `bucket` 是否已出现在 `pos` 到根的链上
    fn on_chain(queue: &[PathEntry], pos: usize, bucket: usize) -> bool {
        let mut entry = queue[pos];
        loop {
            if entry.bucket == bucket {
                return true;
            }
            if entry.depth == 0 {
                return false;
            }
            entry = queue[entry.parent];
        }
    }

    fn reconstruct(queue: &[PathEntry], pos: usize, free_slot: usize) -> CuckooPath {
        let mut entry = queue[pos];
        let depth = entry.depth;
        let mut steps = [PathStep::default(); MAX_PATH_DEPTH];

        steps[depth] = PathStep {
            bucket: entry.bucket,
            slot: free_slot,
            digest: 0,
        };
        while entry.depth > 0 {
            let parent = queue[entry.parent];
            steps[parent.depth] = PathStep {
                bucket: parent.bucket,
                slot: entry.parent_slot,
                digest: entry.parent_digest,
            };
            entry = parent;
        }

        CuckooPath { steps, depth }
    }
}

const _: () = assert!(SLOTS_PER_BUCKET.pow(MAX_PATH_DEPTH as u32) >= MAX_REACH);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// 只有摘要的桶表
    struct DigestTable {
        buckets: Vec<[u64; SLOTS_PER_BUCKET]>,
    }

    impl BucketSnapshot for DigestTable {
        fn bucket_digests(&self, bucket: usize) -> [u64; SLOTS_PER_BUCKET] {
            self.buckets[bucket]
        }
    }

    /// 16 个桶
    fn indexer() -> Indexer {
        Indexer::new(6)
    }

    /// 构造一个使占用者从 `from` 移向 `to` 的摘要
    fn moving(from: usize, to: usize) -> u64 {
        let indexer = indexer();
        (0..256u64)
            .map(Digest::from_hash)
            .find(|d| indexer.alt_index(from, *d) == to)
            .map(|d| d.as_u64())
            .expect("应存在满足条件的标签")
    }

    /// 所有桶装满，占用者都指向相邻桶 `b ^ 1`
    fn full_table() -> DigestTable {
        let buckets = (0..16).map(|b| [moving(b, b ^ 1); SLOTS_PER_BUCKET]).collect();
        DigestTable { buckets }
    }

    fn assert_valid(table: &DigestTable, path: &CuckooPath, i1: usize, i2: usize) {
        let indexer = indexer();
        let steps = path.steps();
        assert!(steps[0].bucket == i1 || steps[0].bucket == i2);
        assert!(path.has_distinct_offsets());
        for pair in steps.windows(2) {
            let occupant = table.buckets[pair[0].bucket][pair[0].slot];
            assert_ne!(occupant, 0);
            assert_eq!(occupant, pair[0].digest);
            assert_eq!(indexer.alt_index(pair[0].bucket, Digest::from_hash(occupant)), pair[1].bucket);
        }
        let last = path.free_slot();
        assert_eq!(table.buckets[last.bucket][last.slot], 0);
        assert!(path.is_current(|b, s| table.buckets[b][s]));
    }

    #[test]
    fn test_free_candidate_gives_depth_zero() {
        let mut table = full_table();
        table.buckets[8][2] = 0;
        let path = PathFinder::new(indexer()).search(&table, 0, 8).expect("应找到路径");
        assert_eq!(path.depth(), 0);
        assert_eq!(path.head(), PathStep { bucket: 8, slot: 2, digest: 0 });
    }

    #[test]
    fn test_all_full_fails() {
        let table = full_table();
        assert!(PathFinder::new(indexer()).search(&table, 0, 8).is_none());
    }

    #[test]
    fn test_two_hop_path() {
        let mut table = full_table();
        table.buckets[0][2] = moving(0, 5);
        table.buckets[5][1] = moving(5, 12);
        table.buckets[12][3] = 0;

        let path = PathFinder::new(indexer()).search(&table, 0, 8).expect("应找到路径");
        assert_eq!(path.depth(), 2);
        assert_eq!(path.offsets().collect::<Vec<_>>(), vec![2, 21, 51]);
        assert_eq!(path.buckets().collect::<Vec<_>>(), vec![0, 5, 12]);
        assert_valid(&table, &path, 0, 8);
    }

    fn chain_table(length: usize) -> DigestTable {
        // 0 -> 2 -> 4 -> ... 每一跳经槽位0
        let mut table = full_table();
        for hop in 0..length {
            let from = hop * 2;
            table.buckets[from][0] = moving(from, from + 2);
        }
        table.buckets[length * 2][1] = 0;
        table
    }

    #[test]
    fn test_deepest_allowed_path() {
        let table = chain_table(MAX_PATH_DEPTH - 1);
        let path = PathFinder::new(indexer()).search(&table, 0, 15).expect("应找到路径");
        assert_eq!(path.depth(), MAX_PATH_DEPTH - 1);
        assert_eq!(path.free_slot().bucket, 8);
        assert_valid(&table, &path, 0, 15);
    }

    #[test]
    fn test_path_beyond_depth_limit_fails() {
        let table = chain_table(MAX_PATH_DEPTH);
        assert!(PathFinder::new(indexer()).search(&table, 0, 15).is_none());
    }

    #[test]
    fn test_stale_path_detected() {
        let mut table = full_table();
        table.buckets[0][2] = moving(0, 5);
        table.buckets[5][3] = 0;
        let path = PathFinder::new(indexer()).search(&table, 0, 8).expect("应找到路径");
        assert!(path.is_current(|b, s| table.buckets[b][s]));

        // 空槽位被并发写入
        table.buckets[5][3] = moving(5, 6);
        assert!(!path.is_current(|b, s| table.buckets[b][s]));

        // 被搬移的占用者已变化
        table.buckets[5][3] = 0;
        table.buckets[0][2] = moving(0, 7);
        assert!(!path.is_current(|b, s| table.buckets[b][s]));
    }

    #[test]
    fn test_random_tables_produce_valid_paths() {
        let indexer = Indexer::new(10);
        let finder = PathFinder::new(indexer);
        let mut rng = StdRng::seed_from_u64(42);
        let mut max_depth = 0;
        let mut found = 0;

        for _ in 0..2_000 {
            let buckets = (0..indexer.bucket_count())
                .map(|_| {
                    std::array::from_fn(|_| {
                        if rng.gen_bool(0.01) {
                            0
                        } else {
                            Digest::from_hash(rng.gen()).as_u64()
                        }
                    })
                })
                .collect();
            let table = DigestTable { buckets };
            let i1 = rng.gen_range(0..indexer.bucket_count());
            let i2 = rng.gen_range(0..indexer.bucket_count());

            if let Some(path) = finder.search(&table, i1, i2) {
                found += 1;
                max_depth = max_depth.max(path.depth());
                let steps = path.steps();
                assert!(steps[0].bucket == i1 || steps[0].bucket == i2);
                assert!(path.has_distinct_offsets());
                for pair in steps.windows(2) {
                    let occupant = table.buckets[pair[0].bucket][pair[0].slot];
                    assert_ne!(occupant, 0);
                    assert_eq!(indexer.alt_index(pair[0].bucket, Digest::from_hash(occupant)), pair[1].bucket);
                }
                let last = path.free_slot();
                assert_eq!(table.buckets[last.bucket][last.slot], 0);
            }
        }

        assert!(found > 1_000, "找到路径次数过少: {}", found);
        assert!(max_depth >= 2, "未覆盖多跳路径: {}", max_depth);
    }
}
