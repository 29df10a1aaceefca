//! 核心类型定义 - 共享类型和接口

use std::{
    fmt::{self, Debug},
    hash::Hash,
};

/// 键特征
///
/// 哈希函数只看 `as_bytes` 返回的字节；键相等性由 `Eq` 决定，
/// 摘要相等只作为快速过滤。
pub trait Key: Eq + Clone + Debug + Send + Sync + 'static {
    /// 获取键的字节表示
    fn as_bytes(&self) -> &[u8];
}

/// 值特征 - 要求可克隆，`get` 返回副本
pub trait Value: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Value for T {}

impl Key for String {
    fn as_bytes(&self) -> &[u8] {
        str::as_bytes(self)
    }
}

impl Key for &'static str {
    fn as_bytes(&self) -> &[u8] {
        str::as_bytes(self)
    }
}

impl Key for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self.as_slice()
    }
}

/// 字节键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteKey(pub Vec<u8>);

impl Key for ByteKey {
    fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for ByteKey {
    fn from(bytes: &[u8]) -> Self {
        ByteKey(bytes.to_vec())
    }
}

impl fmt::Display for ByteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// 键摘要 - 64位，永不为零
///
/// 零值保留给空槽位，因此构造时强制置最高位。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Digest(u64);

impl Digest {
    /// 最高位，保证摘要非零
    pub const HIGH_BIT: u64 = 1 << 63;

    /// 从原始哈希值创建摘要
    #[inline]
    pub const fn from_hash(hash: u64) -> Self {
        Self(hash | Self::HIGH_BIT)
    }

    /// 获取原始值
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// 8位标签，加一后必不为零
    #[inline]
    pub const fn tag(&self) -> u64 {
        (self.0 & 0xFF) + 1
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    /// 新键写入
    Insert,
    /// 原地覆盖
    Update,
    /// 查询命中
    Get,
    /// 查询未命中
    Miss,
    /// 删除
    Remove,
    /// 应用一条踢出路径
    Kick,
    /// 单次槽位搬移
    Displacement,
    /// 提交冲突后重试
    Retry,
    /// 容量耗尽
    Full,
}

impl OperationType {
    /// 全部类型，导出指标时按此顺序
    pub const ALL: [OperationType; 9] = [
        OperationType::Insert,
        OperationType::Update,
        OperationType::Get,
        OperationType::Miss,
        OperationType::Remove,
        OperationType::Kick,
        OperationType::Displacement,
        OperationType::Retry,
        OperationType::Full,
    ];

    /// 指标名
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Insert => "insert",
            OperationType::Update => "update",
            OperationType::Get => "get",
            OperationType::Miss => "miss",
            OperationType::Remove => "remove",
            OperationType::Kick => "kick",
            OperationType::Displacement => "displacement",
            OperationType::Retry => "retry",
            OperationType::Full => "full",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_never_zero() {
        assert_ne!(Digest::from_hash(0).as_u64(), 0);
        assert_eq!(Digest::from_hash(0).as_u64(), Digest::HIGH_BIT);
        assert_eq!(Digest::from_hash(u64::MAX).as_u64(), u64::MAX);
    }

    #[test]
    fn test_digest_tag_range() {
        // 标签取低8位再加一
        assert_eq!(Digest::from_hash(0).tag(), 1);
        assert_eq!(Digest::from_hash(0xFF).tag(), 256);
        assert_eq!(Digest::from_hash(0x1234).tag(), 0x35);
    }

    #[test]
    fn test_key_bytes() {
        assert_eq!(Key::as_bytes(&String::from("abc")), b"abc");
        assert_eq!(Key::as_bytes(&"abc"), b"abc");
        assert_eq!(Key::as_bytes(&ByteKey(b"abc".to_vec())), b"abc");
        assert_eq!(Key::as_bytes(&b"abc".to_vec()), b"abc");
    }

    #[test]
    fn test_operation_names_unique() {
        let mut names: Vec<_> = OperationType::ALL.iter().map(|op| op.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), OperationType::ALL.len());
    }
}
