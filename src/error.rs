//! 统一错误处理 - 对外错误类型和恢复建议

/// Cuckoo哈希表可能发生的错误
///
/// 查询或删除不存在的键不是错误，分别以 `None` / `false` 返回。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CuckooError {
    #[error("容量耗尽，踢出搜索未找到空槽位 (容量: {capacity}, 当前大小: {size})")]
    CapacityExhausted {
        capacity: usize,
        size: usize,
    },

    #[error("无效配置: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

impl CuckooError {
    /// 获取错误恢复建议
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::CapacityExhausted { .. } => Some("删除部分条目，或以更大的 hashpower 重建表"),
            Self::InvalidConfig { .. } => Some("检查配置参数"),
        }
    }

    /// 判断错误是否可恢复
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidConfig { .. })
    }

    /// 是否为容量耗尽
    pub fn is_capacity_exhausted(&self) -> bool {
        matches!(self, Self::CapacityExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_exhausted_is_recoverable() {
        let err = CuckooError::CapacityExhausted { capacity: 1024, size: 1000 };
        assert!(err.is_recoverable());
        assert!(err.is_capacity_exhausted());
        assert!(err.recovery_suggestion().is_some());
        assert!(err.to_string().contains("1024"));
    }

    #[test]
    fn test_invalid_config_not_recoverable() {
        let err = CuckooError::InvalidConfig { reason: "hashpower".into() };
        assert!(!err.is_recoverable());
        assert!(!err.is_capacity_exhausted());
        assert!(err.to_string().contains("hashpower"));
    }
}
