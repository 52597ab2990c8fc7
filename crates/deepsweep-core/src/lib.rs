//! 序列化感知的内容库搜索替换核心
//!
//! 设计要点：
//! - 候选检索走存储端粗过滤（LIKE 包含），精确匹配与替换在进程内完成。
//! - 序列化复合值先解码为带标签的变体结构，替换只作用于字符串叶子，
//!   再按原格式重编码；未发生替换时重编码与原文逐字节相等。
//! - 扫描同步单线程、调用即完成；写模式下三表共享一笔平铺事务。
//! - 翻页由调用方循环驱动：整页信号（likely_has_more）只是启发式，
//!   调用方必须自设页数上限。

mod codec;
mod config;
mod error;
mod options;
mod pattern;
mod replace;
mod rows;
mod scan;
mod snippet;
mod sqlite;
mod store;

// 对外 API
pub use codec::{decode, encode, is_serialized, Value};
pub use config::Profile;
pub use error::{DecodeError, PatternError, ScanError, StoreError};
pub use options::{default_content_fields, ScanRequest};
pub use pattern::Pattern;
pub use replace::{deep_replace, replace_text};
pub use rows::{MatchRow, RecordClass, ScanResult, ScanSummary};
pub use scan::{CompletionFlags, Scanner};
pub use snippet::{snippet, snippet_html, DEFAULT_RADIUS};
pub use sqlite::SqliteStore;
pub use store::{ContentRecord, MemoryStore, MetaRecord, OptionRecord, RecordStore};
