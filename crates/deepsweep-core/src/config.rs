//! 运行配置档加载（TOML）
use crate::options::default_content_fields;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 配置档；所有键可省略，缺省值与内置默认一致
///
/// ```toml
/// database = "site.db"
/// table_prefix = "wp_"
/// content_fields = ["post_title", "post_content", "post_excerpt"]
/// per_page = 2000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Profile {
    /// SQLite 数据库路径；命令行 --db 优先
    pub database: Option<PathBuf>,
    pub table_prefix: String,
    pub content_fields: Vec<String>,
    pub per_page: usize,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            database: None,
            table_prefix: "wp_".to_string(),
            content_fields: default_content_fields(),
            per_page: 2000,
        }
    }
}

impl Profile {
    /// 从 TOML 文件加载；未知键报错
    pub fn load(path: &Path) -> Result<Profile> {
        let txt = std::fs::read_to_string(path)
            .with_context(|| format!("read profile {}", path.display()))?;
        let profile: Profile =
            toml::from_str(&txt).with_context(|| format!("parse profile {}", path.display()))?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let p: Profile = toml::from_str("database = \"x.db\"").unwrap();
        assert_eq!(p.table_prefix, "wp_");
        assert_eq!(p.per_page, 2000);
        assert_eq!(p.content_fields, default_content_fields());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Profile>("per_pgae = 10").is_err());
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        std::fs::write(&path, "table_prefix = \"site_\"\nper_page = 50\n").unwrap();
        let p = Profile::load(&path).unwrap();
        assert_eq!(p.table_prefix, "site_");
        assert_eq!(p.per_page, 50);
    }
}
