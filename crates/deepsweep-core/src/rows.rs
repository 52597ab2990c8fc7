//! 结果行与汇总（对外序列化结构）
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// 记录类别；序列化名沿用存储端词汇（post/meta/option）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordClass {
    #[serde(rename = "post")]
    Content,
    #[serde(rename = "meta")]
    Attribute,
    #[serde(rename = "option")]
    Setting,
}

impl RecordClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordClass::Content => "post",
            RecordClass::Attribute => "meta",
            RecordClass::Setting => "option",
        }
    }
}

/// 单条命中行（一条 = 一个记录的一个字段/键，包含至少一次命中）
///
/// 行在一次扫描内只产生、不回改；是否留存由调用方决定。
#[derive(Debug, Clone, Serialize)]
pub struct MatchRow {
    #[serde(rename = "type")]
    pub record_class: RecordClass,
    /// 内容/属性行为所属内容记录 id；设置行为设置记录 id
    pub id: i64,
    /// 展示标题（内容/属性行取所属记录标题，设置行取设置名）
    pub title: String,
    /// 属性行的回写主键
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_id: Option<i64>,
    /// 命中的列名或属性键
    pub field_or_key: String,
    pub match_count: usize,
    pub snippet: String,
    pub snippet_html: String,
    /// 不透明编辑定位符（`<class>:<id>`），由调用方自行转成链接
    pub edit_ref: String,
}

/// 汇总：records_touched 统计含命中的去重记录数，不是命中总数
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    pub total_matches: usize,
    pub records_touched: usize,
    /// 置位即本次批量未持久化（空 needle / 写模式回滚）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 一次扫描的完整结果；行序 = 表扫描序（内容 → 属性 → 设置）
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub rows: Vec<MatchRow>,
    pub summary: ScanSummary,
}

impl ScanResult {
    /// 以 JSON 写出完整结果
    pub fn write_json(&self, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, self)?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_serialize_with_store_vocabulary() {
        let row = MatchRow {
            record_class: RecordClass::Setting,
            id: 7,
            title: "siteurl".to_string(),
            meta_id: None,
            field_or_key: "option_value".to_string(),
            match_count: 1,
            snippet: "…foo…".to_string(),
            snippet_html: "…<mark>foo</mark>…".to_string(),
            edit_ref: "option:7".to_string(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["type"], "option");
        assert_eq!(json["id"], 7);
        assert!(json.get("meta_id").is_none());
    }

    #[test]
    fn summary_error_is_omitted_when_absent() {
        let json = serde_json::to_value(ScanSummary::default()).unwrap();
        assert!(json.get("error").is_none());
    }
}
