// src/stats/operation.rs
//! 操作统计 - 跟踪哈希表操作次数

use crate::types::OperationType;
use std::sync::atomic::{AtomicU64, Ordering};

/// 操作统计接口
pub trait OperationRecorder: Send + Sync {
    fn record_count(&self, op_type: OperationType);
    /// 一次记录多次，用于搬移计数
    fn record_many(&self, op_type: OperationType, count: u64);
    /// 获取操作统计快照
    fn snapshot(&self) -> OperationStatsSnapshot;

    /// 重置统计
    fn reset(&self);

    /// 导出Prometheus格式指标
    fn export_prometheus(&self) -> String;
}

/// 操作统计快照
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationStatsSnapshot {
    pub insert_count: u64,
    pub update_count: u64,
    pub get_count: u64,
    pub miss_count: u64,
    pub remove_count: u64,
    pub kick_count: u64,
    pub displacement_count: u64,
    pub retry_count: u64,
    pub full_count: u64,
}

impl OperationStatsSnapshot {
    pub fn count(&self, op_type: OperationType) -> u64 {
        match op_type {
            OperationType::Insert => self.insert_count,
            OperationType::Update => self.update_count,
            OperationType::Get => self.get_count,
            OperationType::Miss => self.miss_count,
            OperationType::Remove => self.remove_count,
            OperationType::Kick => self.kick_count,
            OperationType::Displacement => self.displacement_count,
            OperationType::Retry => self.retry_count,
            OperationType::Full => self.full_count,
        }
    }
}

/// 原子操作统计
#[derive(Debug, Default)]
pub struct AtomicOperationStats {
    insert_count: AtomicU64,
    update_count: AtomicU64,
    get_count: AtomicU64,
    miss_count: AtomicU64,
    remove_count: AtomicU64,
    kick_count: AtomicU64,
    displacement_count: AtomicU64,
    retry_count: AtomicU64,
    full_count: AtomicU64,
}

impl AtomicOperationStats {
    /// 创建新统计
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, op_type: OperationType) -> &AtomicU64 {
        match op_type {
            OperationType::Insert => &self.insert_count,
            OperationType::Update => &self.update_count,
            OperationType::Get => &self.get_count,
            OperationType::Miss => &self.miss_count,
            OperationType::Remove => &self.remove_count,
            OperationType::Kick => &self.kick_count,
            OperationType::Displacement => &self.displacement_count,
            OperationType::Retry => &self.retry_count,
            OperationType::Full => &self.full_count,
        }
    }
}

impl OperationRecorder for AtomicOperationStats {
    fn record_count(&self, op_type: OperationType) {
        self.counter(op_type).fetch_add(1, Ordering::Relaxed);
    }

    fn record_many(&self, op_type: OperationType, count: u64) {
        self.counter(op_type).fetch_add(count, Ordering::Relaxed);
    }

    fn snapshot(&self) -> OperationStatsSnapshot {
        OperationStatsSnapshot {
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            get_count: self.get_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            remove_count: self.remove_count.load(Ordering::Relaxed),
            kick_count: self.kick_count.load(Ordering::Relaxed),
            displacement_count: self.displacement_count.load(Ordering::Relaxed),
            retry_count: self.retry_count.load(Ordering::Relaxed),
            full_count: self.full_count.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for op in OperationType::ALL {
            self.counter(op).store(0, Ordering::Relaxed);
        }
    }

    fn export_prometheus(&self) -> String {
        let mut output = String::new();

        for op in OperationType::ALL {
            let count = self.counter(op).load(Ordering::Relaxed);
            output.push_str(&format!(
                "# HELP cuckoo_operation_{}_count Total {} operations\n",
                op.as_str(),
                op.as_str()
            ));
            output.push_str(&format!("# TYPE cuckoo_operation_{}_count counter\n", op.as_str()));
            output.push_str(&format!("cuckoo_operation_{}_count {}\n", op.as_str(), count));
        }

        output
    }
}

/// 禁用操作统计实现
#[derive(Default)]
pub struct DisabledOperationRecorder;

impl OperationRecorder for DisabledOperationRecorder {
    fn record_count(&self, _op_type: OperationType) {}
    fn record_many(&self, _op_type: OperationType, _count: u64) {}
    fn snapshot(&self) -> OperationStatsSnapshot {
        OperationStatsSnapshot::default()
    }
    fn reset(&self) {}
    fn export_prometheus(&self) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_snapshot() {
        let stats = AtomicOperationStats::new();
        stats.record_count(OperationType::Insert);
        stats.record_count(OperationType::Insert);
        stats.record_many(OperationType::Displacement, 3);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.insert_count, 2);
        assert_eq!(snapshot.count(OperationType::Displacement), 3);
        assert_eq!(snapshot.count(OperationType::Get), 0);
    }

    #[test]
    fn test_reset() {
        let stats = AtomicOperationStats::new();
        for op in OperationType::ALL {
            stats.record_count(op);
        }
        stats.reset();
        assert_eq!(stats.snapshot(), OperationStatsSnapshot::default());
    }

    #[test]
    fn test_export_prometheus() {
        let stats = AtomicOperationStats::new();
        stats.record_count(OperationType::Kick);
        let text = stats.export_prometheus();
        assert!(text.contains("# TYPE cuckoo_operation_kick_count counter"));
        assert!(text.contains("cuckoo_operation_kick_count 1\n"));
        assert!(text.contains("cuckoo_operation_insert_count 0\n"));
    }

    #[test]
    fn test_disabled_recorder() {
        let stats = DisabledOperationRecorder;
        stats.record_count(OperationType::Insert);
        assert_eq!(stats.snapshot().insert_count, 0);
        assert!(stats.export_prometheus().is_empty());
    }
}
