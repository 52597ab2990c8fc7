//! 结果导出（CSV / JSON）
use anyhow::{Context, Result};
use deepsweep_core::{MatchRow, ScanResult};
use std::fs::File;
use std::path::Path;

/// CSV 片段列宽上限（字符，含截断省略号）
const SNIPPET_MAX: usize = 300;

pub fn write_csv(path: &Path, rows: &[MatchRow]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create csv {}", path.display()))?;
    w.write_record([
        "type",
        "post_id_or_option_id",
        "title_or_option",
        "field_or_meta_key",
        "match_count",
        "snippet",
        "url",
    ])?;
    for r in rows {
        w.write_record(&[
            r.record_class.as_str().to_string(),
            r.id.to_string(),
            r.title.clone(),
            r.field_or_key.clone(),
            r.match_count.to_string(),
            clip(&r.snippet, SNIPPET_MAX),
            r.edit_ref.clone(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_json(path: &Path, result: &ScanResult) -> Result<()> {
    let mut f = File::create(path)
        .with_context(|| format!("create json {}", path.display()))?;
    result.write_json(&mut f)?;
    Ok(())
}

/// 按字符截断到 max（省略号占掉一格）
fn clip(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_keeps_short_strings_intact() {
        assert_eq!(clip("short", 300), "short");
    }

    #[test]
    fn clip_truncates_with_ellipsis_inside_the_budget() {
        let long = "x".repeat(400);
        let clipped = clip(&long, 300);
        assert_eq!(clipped.chars().count(), 300);
        assert!(clipped.ends_with('…'));
    }
}
