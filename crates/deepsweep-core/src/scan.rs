//! 扫描主流程（按表分批检索 → 精确判定 → 可选回写）
//!
//! 设计要点：
//! - 候选来自存储端粗过滤（子串包含）。整词/正则下可能漏选（字面量与精确模式
//!   不一致），也可能多选（精确计数为零后丢弃）；存储端过滤求便宜，精度在进程内。
//! - 写模式下三张表共享一笔平铺事务；任一存储错误即回滚。已组装的结果行照常
//!   返回：行反映的是扫描到的状态，summary.error 置位即表示本批次一条也没有
//!   持久化，调用方不得把带错误的行当作已写入。
//! - 每张表记录“本页取满”标志；likely_has_more 只是启发式信号，无法区分
//!   “恰好取满、后面没了”与“后面还有”。翻页循环和页数上限都归调用方。

use crate::codec;
use crate::error::{ScanError, StoreError};
use crate::options::ScanRequest;
use crate::pattern::Pattern;
use crate::replace::{deep_replace, replace_text};
use crate::rows::{MatchRow, RecordClass, ScanResult, ScanSummary};
use crate::snippet::{snippet, snippet_html, DEFAULT_RADIUS};
use crate::store::RecordStore;

/// 各表“本页取满”标志（likely_has_more 的数据源；每次 run 开始时重置）
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionFlags {
    pub content_full: bool,
    pub meta_full: bool,
    pub options_full: bool,
}

impl CompletionFlags {
    pub fn any(&self) -> bool {
        self.content_full || self.meta_full || self.options_full
    }
}

/// 批量扫描器：一次 run 即一批（每表一页）
pub struct Scanner {
    req: ScanRequest,
    pattern: Pattern,
    flags: CompletionFlags,
}

/// 行与计数的批内累加
#[derive(Default)]
struct Accumulator {
    rows: Vec<MatchRow>,
    total_matches: usize,
    records_touched: usize,
}

impl Accumulator {
    fn into_result(self, error: Option<String>) -> ScanResult {
        ScanResult {
            rows: self.rows,
            summary: ScanSummary {
                total_matches: self.total_matches,
                records_touched: self.records_touched,
                error,
            },
        }
    }
}

impl Scanner {
    /// 模式只构建一次；非法正则体降级为永不匹配（单模式覆盖整批，
    /// 降级即整批安全返回零命中，绝不因一个坏模式中断调用方）
    pub fn new(req: ScanRequest) -> Self {
        let pattern =
            Pattern::build(&req.needle, req.case_sensitive, req.whole_word, req.use_regex)
                .unwrap_or_else(|_| Pattern::nothing());
        Scanner { req, pattern, flags: CompletionFlags::default() }
    }

    /// 执行一批扫描。失败以 summary.error 呈现，调用本身不返回 Err。
    pub fn run(&mut self, store: &mut dyn RecordStore) -> ScanResult {
        self.flags = CompletionFlags::default();
        let mut acc = Accumulator::default();

        if self.req.needle.is_empty() {
            return acc.into_result(Some(ScanError::EmptyNeedle.to_string()));
        }

        let write_mode = !self.req.dry_run;
        if write_mode {
            if let Err(e) = store.begin() {
                return acc.into_result(Some(ScanError::Store(e).to_string()));
            }
        }

        match self.scan_tables(store, &mut acc) {
            Ok(()) => {
                if write_mode {
                    if let Err(e) = store.commit() {
                        let _ = store.rollback();
                        return acc.into_result(Some(ScanError::Store(e).to_string()));
                    }
                }
                acc.into_result(None)
            }
            Err(e) => {
                if write_mode {
                    let _ = store.rollback();
                }
                acc.into_result(Some(ScanError::Store(e).to_string()))
            }
        }
    }

    /// 本批之后可能还有候选（任一表整页命中）。仅启发式，调用方须自设页数上限。
    pub fn likely_has_more(&self) -> bool {
        self.flags.any()
    }

    pub fn completion(&self) -> CompletionFlags {
        self.flags
    }

    fn scan_tables(
        &mut self,
        store: &mut dyn RecordStore,
        acc: &mut Accumulator,
    ) -> Result<(), StoreError> {
        if self.req.scan_content {
            self.scan_content(store, acc)?;
        }
        if self.req.scan_meta {
            self.scan_meta(store, acc)?;
        }
        if self.req.scan_options {
            self.scan_options(store, acc)?;
        }
        Ok(())
    }

    /// 是否把新值写回存储（干跑或未给替换文本时只数不写）
    fn should_write(&self) -> bool {
        !self.req.dry_run && self.req.replacement.is_some()
    }

    fn replacement_text(&self) -> &str {
        self.req.replacement.as_deref().unwrap_or("")
    }

    fn scan_content(
        &mut self,
        store: &mut dyn RecordStore,
        acc: &mut Accumulator,
    ) -> Result<(), StoreError> {
        let limit = self.req.limit();
        let cands = store.search_content(
            &self.req.needle,
            &self.req.content_fields,
            limit,
            self.req.offset(),
        )?;
        self.flags.content_full = cands.len() >= limit;

        for rec in cands {
            let mut hits = 0usize;
            for (field, original) in &rec.fields {
                if original.is_empty() {
                    continue;
                }
                // 内容列永远是普通文本，不走编解码
                let (new_value, count) =
                    replace_text(original, &self.pattern, self.replacement_text());
                if count == 0 {
                    continue;
                }
                hits += count;
                if self.should_write() {
                    store.update_content_field(rec.id, field, &new_value)?;
                }
                acc.rows.push(MatchRow {
                    record_class: RecordClass::Content,
                    id: rec.id,
                    title: rec.title.clone(),
                    meta_id: None,
                    field_or_key: field.clone(),
                    match_count: count,
                    snippet: snippet(original, &self.pattern, DEFAULT_RADIUS),
                    snippet_html: snippet_html(original, &self.pattern, DEFAULT_RADIUS),
                    edit_ref: format!("post:{}", rec.id),
                });
            }
            if hits > 0 {
                acc.total_matches += hits;
                acc.records_touched += 1;
            }
        }
        Ok(())
    }

    fn scan_meta(
        &mut self,
        store: &mut dyn RecordStore,
        acc: &mut Accumulator,
    ) -> Result<(), StoreError> {
        let limit = self.req.limit();
        let cands = store.search_meta(&self.req.needle, limit, self.req.offset())?;
        self.flags.meta_full = cands.len() >= limit;

        for m in cands {
            let (new_value, count) = self.rewrite_value(&m.value);
            // 键包含 needle 但值零命中的候选在此被丢弃（预过滤多选的预期形态）
            if count == 0 {
                continue;
            }
            if self.should_write() {
                store.update_meta_value(m.meta_id, &new_value)?;
            }
            let title = store.content_title(m.parent_id)?.unwrap_or_default();
            acc.rows.push(MatchRow {
                record_class: RecordClass::Attribute,
                id: m.parent_id,
                title,
                meta_id: Some(m.meta_id),
                field_or_key: m.key.clone(),
                match_count: count,
                // 片段永远取自原始存储文本（序列化标记一并可见）
                snippet: snippet(&m.value, &self.pattern, DEFAULT_RADIUS),
                snippet_html: snippet_html(&m.value, &self.pattern, DEFAULT_RADIUS),
                edit_ref: format!("post:{}", m.parent_id),
            });
            acc.total_matches += count;
            acc.records_touched += 1;
        }
        Ok(())
    }

    fn scan_options(
        &mut self,
        store: &mut dyn RecordStore,
        acc: &mut Accumulator,
    ) -> Result<(), StoreError> {
        let limit = self.req.limit();
        let cands = store.search_options(&self.req.needle, limit, self.req.offset())?;
        self.flags.options_full = cands.len() >= limit;

        for o in cands {
            let (new_value, count) = self.rewrite_value(&o.value);
            if count == 0 {
                continue;
            }
            if self.should_write() {
                store.update_option_value(o.option_id, &new_value)?;
            }
            acc.rows.push(MatchRow {
                record_class: RecordClass::Setting,
                id: o.option_id,
                title: o.name.clone(),
                meta_id: None,
                field_or_key: "option_value".to_string(),
                match_count: count,
                snippet: snippet(&o.value, &self.pattern, DEFAULT_RADIUS),
                snippet_html: snippet_html(&o.value, &self.pattern, DEFAULT_RADIUS),
                edit_ref: format!("option:{}", o.option_id),
            });
            acc.total_matches += count;
            acc.records_touched += 1;
        }
        Ok(())
    }

    /// 属性/设置值改写：序列化值解码后深度替换再重编码，普通文本直接替换
    fn rewrite_value(&self, value: &str) -> (String, usize) {
        if codec::is_serialized(value) {
            // is_serialized 为真蕴含 trim 后必可严格解码
            if let Ok(decoded) = codec::decode(value.trim()) {
                let (new, count) =
                    deep_replace(decoded, &self.pattern, self.replacement_text());
                return (codec::encode(&new), count);
            }
        }
        replace_text(value, &self.pattern, self.replacement_text())
    }
}
