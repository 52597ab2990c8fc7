//! 错误类型（核心分类）
use thiserror::Error;

/// 正则模式体构建失败（仅 use_regex 模式下可能发生）
///
/// 调用方应降级为“永不匹配”而非中断批次：同一次扫描只构建一次模式，
/// 降级后整批安全返回零命中。
#[derive(Debug, Error)]
#[error("invalid pattern: {0}")]
pub struct PatternError(#[from] regex::Error);

/// 序列化值严格解码失败
///
/// 检测阶段的解码失败不是错误：形似标签但解不开的值按普通文本处理。
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected end of input at byte {0}")]
    Eof(usize),
    #[error("expected {expected} at byte {at}")]
    Expected { expected: &'static str, at: usize },
    #[error("unknown type tag at byte {0}")]
    UnknownTag(usize),
    #[error("trailing data at byte {0}")]
    Trailing(usize),
}

/// 存储层错误（检索 / 回写 / 事务）
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unknown column `{0}`")]
    BadColumn(String),
    #[error("{0}")]
    Other(String),
}

/// 单次扫描失败原因（最终以 summary.error 文本形式呈现给调用方）
#[derive(Debug, Error)]
pub enum ScanError {
    /// 空 needle：扫描直接拒绝，不触碰存储
    #[error("empty needle")]
    EmptyNeedle,
    /// 写模式批次内的存储错误：事务已回滚，本批次未持久化
    #[error("store failure (batch rolled back): {0}")]
    Store(#[from] StoreError),
}
