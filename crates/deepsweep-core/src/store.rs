//! 记录存储抽象（候选检索 / 按主键回写 / 平铺事务）与内存实现
//!
//! 设计要点：
//! - 检索只做粗粒度包含过滤（对应 SQL 的 LIKE '%needle%'）：整词/正则下可能漏选，
//!   精确计数为零的候选会在进程内被丢弃；便宜的存储端过滤 + 进程内精确判定。
//! - 回写统一按主键；内容记录更新同时承担记录级缓存失效义务（由实现兑现）。
//! - 事务单层平铺：begin/commit/rollback，一次写模式扫描恰好一笔，不嵌套。

use crate::error::StoreError;
use aho_corasick::AhoCorasickBuilder;

/// 内容记录（按请求字段抓取的文本列子集）
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    pub id: i64,
    pub record_type: String,
    pub title: String,
    /// (列名, 列值)，顺序与请求字段一致
    pub fields: Vec<(String, String)>,
}

/// 属性记录（键值对，挂在内容记录下）
#[derive(Debug, Clone, PartialEq)]
pub struct MetaRecord {
    pub meta_id: i64,
    pub parent_id: i64,
    pub key: String,
    pub value: String,
}

/// 设置记录（全局键值对）
#[derive(Debug, Clone, PartialEq)]
pub struct OptionRecord {
    pub option_id: i64,
    pub name: String,
    pub value: String,
}

/// 存储协作方接口
pub trait RecordStore {
    /// 任一列出字段包含 needle（不区分大小写的子串包含）的内容记录
    fn search_content(
        &mut self,
        needle: &str,
        fields: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ContentRecord>, StoreError>;

    /// 键或值包含 needle 的属性记录
    fn search_meta(
        &mut self,
        needle: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MetaRecord>, StoreError>;

    /// 名或值包含 needle 的设置记录
    fn search_options(
        &mut self,
        needle: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<OptionRecord>, StoreError>;

    /// 内容记录标题（属性行展示用）
    fn content_title(&mut self, id: i64) -> Result<Option<String>, StoreError>;

    /// 按主键回写；实现须同时失效该记录的任何记录级缓存
    fn update_content_field(&mut self, id: i64, field: &str, value: &str)
        -> Result<(), StoreError>;
    fn update_meta_value(&mut self, meta_id: i64, value: &str) -> Result<(), StoreError>;
    fn update_option_value(&mut self, option_id: i64, value: &str) -> Result<(), StoreError>;

    fn begin(&mut self) -> Result<(), StoreError>;
    fn commit(&mut self) -> Result<(), StoreError>;
    fn rollback(&mut self) -> Result<(), StoreError>;
}

/// 内存实现（夹具用）：向量存储，快照式事务
#[derive(Debug, Default)]
pub struct MemoryStore {
    posts: Vec<ContentRecord>,
    meta: Vec<MetaRecord>,
    options: Vec<OptionRecord>,
    snapshot: Option<Snapshot>,
}

#[derive(Debug)]
struct Snapshot {
    posts: Vec<ContentRecord>,
    meta: Vec<MetaRecord>,
    options: Vec<OptionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_post(&mut self, id: i64, record_type: &str, title: &str, fields: &[(&str, &str)]) {
        self.posts.push(ContentRecord {
            id,
            record_type: record_type.to_string(),
            title: title.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }

    pub fn add_meta(&mut self, meta_id: i64, parent_id: i64, key: &str, value: &str) {
        self.meta.push(MetaRecord {
            meta_id,
            parent_id,
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    pub fn add_option(&mut self, option_id: i64, name: &str, value: &str) {
        self.options.push(OptionRecord {
            option_id,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// 当前值直读（断言用）
    pub fn post_field(&self, id: i64, field: &str) -> Option<&str> {
        self.posts.iter().find(|p| p.id == id).and_then(|p| {
            p.fields
                .iter()
                .find(|(k, _)| k == field)
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn meta_value(&self, meta_id: i64) -> Option<&str> {
        self.meta
            .iter()
            .find(|m| m.meta_id == meta_id)
            .map(|m| m.value.as_str())
    }

    pub fn option_value(&self, option_id: i64) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.option_id == option_id)
            .map(|o| o.value.as_str())
    }
}

/// 子串包含判定器（ASCII 大小写不敏感，对齐 SQL LIKE 的缺省排序规则）
fn contains_matcher(needle: &str) -> Result<aho_corasick::AhoCorasick, StoreError> {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build([needle])
        .map_err(|e| StoreError::Other(e.to_string()))
}

impl RecordStore for MemoryStore {
    fn search_content(
        &mut self,
        needle: &str,
        fields: &[String],
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ContentRecord>, StoreError> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let ac = contains_matcher(needle)?;
        let out = self
            .posts
            .iter()
            .filter(|p| {
                p.fields
                    .iter()
                    .any(|(k, v)| fields.contains(k) && ac.is_match(v.as_str()))
            })
            .skip(offset)
            .take(limit)
            .map(|p| ContentRecord {
                id: p.id,
                record_type: p.record_type.clone(),
                title: p.title.clone(),
                // 字段子集按请求顺序返回；缺失列按空串处理
                fields: fields
                    .iter()
                    .map(|f| {
                        let v = p
                            .fields
                            .iter()
                            .find(|(k, _)| k == f)
                            .map(|(_, v)| v.clone())
                            .unwrap_or_default();
                        (f.clone(), v)
                    })
                    .collect(),
            })
            .collect();
        Ok(out)
    }

    fn search_meta(
        &mut self,
        needle: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MetaRecord>, StoreError> {
        let ac = contains_matcher(needle)?;
        Ok(self
            .meta
            .iter()
            .filter(|m| ac.is_match(m.value.as_str()) || ac.is_match(m.key.as_str()))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn search_options(
        &mut self,
        needle: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<OptionRecord>, StoreError> {
        let ac = contains_matcher(needle)?;
        Ok(self
            .options
            .iter()
            .filter(|o| ac.is_match(o.value.as_str()) || ac.is_match(o.name.as_str()))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    fn content_title(&mut self, id: i64) -> Result<Option<String>, StoreError> {
        Ok(self
            .posts
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.title.clone()))
    }

    fn update_content_field(
        &mut self,
        id: i64,
        field: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let post = self
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::Other(format!("no content record {id}")))?;
        let slot = post
            .fields
            .iter_mut()
            .find(|(k, _)| k == field)
            .ok_or_else(|| StoreError::BadColumn(field.to_string()))?;
        slot.1 = value.to_string();
        Ok(())
    }

    fn update_meta_value(&mut self, meta_id: i64, value: &str) -> Result<(), StoreError> {
        let m = self
            .meta
            .iter_mut()
            .find(|m| m.meta_id == meta_id)
            .ok_or_else(|| StoreError::Other(format!("no meta record {meta_id}")))?;
        m.value = value.to_string();
        Ok(())
    }

    fn update_option_value(&mut self, option_id: i64, value: &str) -> Result<(), StoreError> {
        let o = self
            .options
            .iter_mut()
            .find(|o| o.option_id == option_id)
            .ok_or_else(|| StoreError::Other(format!("no option record {option_id}")))?;
        o.value = value.to_string();
        Ok(())
    }

    fn begin(&mut self) -> Result<(), StoreError> {
        if self.snapshot.is_some() {
            return Err(StoreError::Other("transaction already open".to_string()));
        }
        self.snapshot = Some(Snapshot {
            posts: self.posts.clone(),
            meta: self.meta.clone(),
            options: self.options.clone(),
        });
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| StoreError::Other("no open transaction".to_string()))
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        let snap = self
            .snapshot
            .take()
            .ok_or_else(|| StoreError::Other("no open transaction".to_string()))?;
        self.posts = snap.posts;
        self.meta = snap.meta;
        self.options = snap.options;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_options() -> MemoryStore {
        let mut s = MemoryStore::new();
        s.add_option(1, "siteurl", "https://example.com");
        s.add_option(2, "blogname", "Example Site");
        s.add_option(3, "unrelated", "nothing here");
        s
    }

    #[test]
    fn containment_filter_is_ascii_case_insensitive() {
        let mut s = store_with_options();
        let hits = s.search_options("EXAMPLE", 10, 0).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn name_containment_also_selects() {
        let mut s = store_with_options();
        let hits = s.search_options("blogname", 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].option_id, 2);
    }

    #[test]
    fn limit_and_offset_page_through_candidates() {
        let mut s = MemoryStore::new();
        for i in 0..5 {
            s.add_option(i, &format!("opt{i}"), "needle here");
        }
        assert_eq!(s.search_options("needle", 2, 0).unwrap().len(), 2);
        assert_eq!(s.search_options("needle", 2, 4).unwrap().len(), 1);
        assert_eq!(s.search_options("needle", 2, 5).unwrap().len(), 0);
    }

    #[test]
    fn rollback_restores_the_snapshot() {
        let mut s = store_with_options();
        s.begin().unwrap();
        s.update_option_value(1, "changed").unwrap();
        assert_eq!(s.option_value(1), Some("changed"));
        s.rollback().unwrap();
        assert_eq!(s.option_value(1), Some("https://example.com"));
    }

    #[test]
    fn commit_discards_the_snapshot() {
        let mut s = store_with_options();
        s.begin().unwrap();
        s.update_option_value(1, "changed").unwrap();
        s.commit().unwrap();
        assert_eq!(s.option_value(1), Some("changed"));
        assert!(s.rollback().is_err());
    }

    #[test]
    fn nested_begin_is_rejected() {
        let mut s = store_with_options();
        s.begin().unwrap();
        assert!(s.begin().is_err());
    }

    #[test]
    fn content_fields_follow_requested_order() {
        let mut s = MemoryStore::new();
        s.add_post(1, "post", "T", &[("post_title", "T"), ("post_content", "needle")]);
        let fields = vec!["post_content".to_string(), "post_title".to_string()];
        let hits = s.search_content("needle", &fields, 10, 0).unwrap();
        assert_eq!(hits[0].fields[0].0, "post_content");
        assert_eq!(hits[0].fields[1].0, "post_title");
    }
}
