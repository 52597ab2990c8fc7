//! 匹配模式构建与执行（字面量 / 正则 / 整词边界）
//!
//! 设计要点：
//! - 字面量模式经 regex::escape 转义后编译；正则模式体原样编译，
//!   构建失败返回 [`PatternError`]，由调用方降级为永不匹配。
//! - 整词约束不依赖正则环视：对每个原始命中检查两侧紧邻字符，
//!   两侧均无字母数字/下划线（Unicode 语义）才算命中。
//! - 匹配一律 Unicode 感知；内容库为 UTF-8。

use crate::error::PatternError;
use regex::RegexBuilder;
use std::ops::Range;

/// 编译后的匹配模式
///
/// `re` 为 None 即永不匹配的哨兵（空 needle，或正则构建失败后的降级形态）。
#[derive(Debug, Clone)]
pub struct Pattern {
    re: Option<regex::Regex>,
    whole_word: bool,
}

impl Pattern {
    /// 构建模式
    ///
    /// - 空 needle → 哨兵（永不匹配），不报错。
    /// - `use_regex` 时 needle 作为模式体原样使用，语法错误返回 [`PatternError`]。
    pub fn build(
        needle: &str,
        case_sensitive: bool,
        whole_word: bool,
        use_regex: bool,
    ) -> Result<Pattern, PatternError> {
        if needle.is_empty() {
            return Ok(Pattern::nothing());
        }
        let body = if use_regex {
            needle.to_string()
        } else {
            regex::escape(needle)
        };
        let re = RegexBuilder::new(&body)
            .case_insensitive(!case_sensitive)
            .build()?;
        Ok(Pattern { re: Some(re), whole_word })
    }

    /// 永不匹配的哨兵模式
    pub fn nothing() -> Pattern {
        Pattern { re: None, whole_word: false }
    }

    pub fn is_nothing(&self) -> bool {
        self.re.is_none()
    }

    /// 非重叠命中总数（已应用整词过滤；零宽命中不计）
    pub fn count(&self, text: &str) -> usize {
        self.iter_ranges(text).count()
    }

    /// 首个命中的字节区间（片段生成用）
    pub fn first_match(&self, text: &str) -> Option<Range<usize>> {
        self.iter_ranges(text).next()
    }

    /// 替换所有非重叠命中，替换文本按字面量插入；返回 (新文本, 命中数)
    pub fn replace_all(&self, text: &str, replacement: &str) -> (String, usize) {
        let ranges: Vec<Range<usize>> = self.iter_ranges(text).collect();
        if ranges.is_empty() {
            return (text.to_string(), 0);
        }
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for r in &ranges {
            out.push_str(&text[last..r.start]);
            out.push_str(replacement);
            last = r.end;
        }
        out.push_str(&text[last..]);
        (out, ranges.len())
    }

    fn iter_ranges<'t>(&'t self, text: &'t str) -> impl Iterator<Item = Range<usize>> + 't {
        let whole_word = self.whole_word;
        self.re
            .iter()
            .flat_map(move |re| re.find_iter(text))
            .filter(move |m| {
                if m.start() == m.end() {
                    return false;
                }
                !whole_word || word_bounded(text, m.start(), m.end())
            })
            .map(|m| m.range())
    }
}

/// 命中两侧是否均无字母数字/下划线字符（Unicode 语义）
fn word_bounded(text: &str, start: usize, end: usize) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(is_word) && !after.is_some_and(is_word)
}
