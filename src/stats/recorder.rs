// src/stats/recorder.rs
//! 统计记录器接口 - 定义统一统计API

use std::sync::Arc;

use crate::{
    stats::operation::{
        AtomicOperationStats, DisabledOperationRecorder, OperationRecorder, OperationStatsSnapshot,
    },
    types::OperationType,
};

/// 统计记录器特征
pub trait StatsRecorder: Send + Sync {
    /// 记录操作计数
    fn record_operation_count(&self, op_type: OperationType);
    /// 记录多次
    fn record_operations(&self, op_type: OperationType, count: u64);
    /// 获取操作统计接口
    fn operation_stats(&self) -> &dyn OperationRecorder;

    /// 重置所有统计
    fn reset(&self);

    /// 导出Prometheus格式指标
    fn export_prometheus(&self) -> String;

    /// 获取操作统计快照
    fn operation_stats_snapshot(&self) -> OperationStatsSnapshot {
        self.operation_stats().snapshot()
    }
}

/// 全局统计记录器实现
#[derive(Default)]
pub struct GlobalStatsRecorder {
    operation: AtomicOperationStats,
}

impl GlobalStatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatsRecorder for GlobalStatsRecorder {
    fn record_operation_count(&self, op_type: OperationType) {
        self.operation.record_count(op_type);
    }

    fn record_operations(&self, op_type: OperationType, count: u64) {
        self.operation.record_many(op_type, count);
    }

    fn operation_stats(&self) -> &dyn OperationRecorder {
        &self.operation
    }

    fn reset(&self) {
        self.operation.reset();
    }

    fn export_prometheus(&self) -> String {
        self.operation.export_prometheus()
    }
}

/// 禁用统计的记录器
pub struct DisabledStatsRecorder;

impl StatsRecorder for DisabledStatsRecorder {
    fn record_operation_count(&self, _op_type: OperationType) {}
    fn record_operations(&self, _op_type: OperationType, _count: u64) {}
    fn operation_stats(&self) -> &dyn OperationRecorder {
        &DisabledOperationRecorder
    }
    fn reset(&self) {}
    fn export_prometheus(&self) -> String {
        String::new()
    }
}

/// 统计记录器工厂
pub struct StatsRecorderFactory;

impl StatsRecorderFactory {
    /// 创建默认记录器
    pub fn create_default() -> Arc<dyn StatsRecorder> {
        Arc::new(GlobalStatsRecorder::new())
    }

    /// 创建禁用统计的记录器
    pub fn create_disabled() -> Arc<dyn StatsRecorder> {
        Arc::new(DisabledStatsRecorder)
    }
}
