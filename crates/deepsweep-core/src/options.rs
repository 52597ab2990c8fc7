//! 扫描请求参数（模块）
//!
//! 单次调用一个不可变参数包；没有任何全局开关。

/// 内容表缺省扫描字段
pub fn default_content_fields() -> Vec<String> {
    ["post_title", "post_content", "post_excerpt"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// 扫描请求
///
/// - `replacement` 为 None 表示仅扫描；`dry_run` 为 true 时无论如何不写库。
/// - `per_page`/`page` 控制每表候选分页：OFFSET = (page-1)*per_page。
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// 要查找的文本（字面量）或正则模式体（use_regex 时）
    pub needle: String,
    /// 替换文本；None 表示仅扫描
    pub replacement: Option<String>,
    /// 干跑：true 时不发生任何写入
    pub dry_run: bool,
    /// 大小写敏感
    pub case_sensitive: bool,
    /// 整词匹配（命中两侧不得紧邻字母数字/下划线）
    pub whole_word: bool,
    /// 将 needle 视为正则模式体
    pub use_regex: bool,
    /// 是否扫描内容表
    pub scan_content: bool,
    /// 是否扫描属性表
    pub scan_meta: bool,
    /// 是否扫描设置表
    pub scan_options: bool,
    /// 内容表参与检索的文本列（顺序即结果行顺序）
    pub content_fields: Vec<String>,
    /// 每表每页候选数（下限 1）
    pub per_page: usize,
    /// 页号（1 起）
    pub page: usize,
}

impl Default for ScanRequest {
    fn default() -> Self {
        Self {
            needle: String::new(),
            replacement: None,
            dry_run: true,
            case_sensitive: false,
            whole_word: false,
            use_regex: false,
            scan_content: true,
            scan_meta: true,
            scan_options: true,
            content_fields: default_content_fields(),
            per_page: 2000,
            page: 1,
        }
    }
}

impl ScanRequest {
    /// 本页候选数上限（钳制为至少 1）
    pub fn limit(&self) -> usize {
        self.per_page.max(1)
    }

    /// 本页在存储端的偏移量
    pub fn offset(&self) -> usize {
        (self.page.max(1) - 1) * self.limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_page_minus_one_times_per_page() {
        let req = ScanRequest { per_page: 50, page: 3, ..Default::default() };
        assert_eq!(req.offset(), 100);
        assert_eq!(req.limit(), 50);
    }

    #[test]
    fn degenerate_paging_values_are_clamped() {
        let req = ScanRequest { per_page: 0, page: 0, ..Default::default() };
        assert_eq!(req.limit(), 1);
        assert_eq!(req.offset(), 0);
    }
}
