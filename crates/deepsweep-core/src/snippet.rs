//! 命中上下文片段（按字符半径开窗 + 转义高亮变体）
//!
//! 窗口以首个命中为中心，半径按字符计（多字节文本下字节半径会切坏窗口）。
//! 窗口未触及字符串端点的一侧补省略号。

use crate::pattern::Pattern;
use std::ops::Range;

/// 缺省窗口半径（字符）
pub const DEFAULT_RADIUS: usize = 45;

/// 纯文本片段；无命中返回空串
pub fn snippet(haystack: &str, pattern: &Pattern, radius: usize) -> String {
    let w = match locate(haystack, pattern, radius) {
        Some(w) => w,
        None => return String::new(),
    };
    let mut out = String::new();
    if w.clipped_left {
        out.push('…');
    }
    out.push_str(&haystack[w.start..w.end]);
    if w.clipped_right {
        out.push('…');
    }
    out
}

/// 高亮片段：窗口内全部转义，仅命中span包 `<mark>`
pub fn snippet_html(haystack: &str, pattern: &Pattern, radius: usize) -> String {
    let w = match locate(haystack, pattern, radius) {
        Some(w) => w,
        None => return String::new(),
    };
    let mut out = String::new();
    if w.clipped_left {
        out.push('…');
    }
    push_escaped(&haystack[w.start..w.hit.start], &mut out);
    out.push_str("<mark>");
    push_escaped(&haystack[w.hit.clone()], &mut out);
    out.push_str("</mark>");
    push_escaped(&haystack[w.hit.end..w.end], &mut out);
    if w.clipped_right {
        out.push('…');
    }
    out
}

/// 开窗结果（全部为字节偏移；clipped_* 表示该侧未到达字符串端点）
struct Window {
    start: usize,
    end: usize,
    hit: Range<usize>,
    clipped_left: bool,
    clipped_right: bool,
}

fn locate(haystack: &str, pattern: &Pattern, radius: usize) -> Option<Window> {
    let hit = pattern.first_match(haystack)?;
    let hit_start_ch = haystack[..hit.start].chars().count();
    let hit_end_ch = hit_start_ch + haystack[hit.start..hit.end].chars().count();
    let total_ch = hit_end_ch + haystack[hit.end..].chars().count();

    let w_start_ch = hit_start_ch.saturating_sub(radius);
    let w_end_ch = (hit_end_ch + radius).min(total_ch);

    Some(Window {
        start: byte_of_char(haystack, w_start_ch),
        end: byte_of_char(haystack, w_end_ch),
        hit,
        clipped_left: w_start_ch > 0,
        clipped_right: w_end_ch < total_ch,
    })
}

fn byte_of_char(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(text.len())
}

fn push_escaped(chunk: &str, out: &mut String) {
    for c in chunk.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
}
