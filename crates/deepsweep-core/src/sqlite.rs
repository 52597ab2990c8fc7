//! SQLite 存储实现（内容/属性/设置三表）
//!
//! 表形状沿用内容库惯例：`{prefix}posts`、`{prefix}postmeta`、`{prefix}options`，
//! 前缀可配（缺省 `wp_`）。候选检索用 `LIKE ... ESCAPE '\'` 做包含预过滤，
//! SQLite 的 LIKE 对 ASCII 不区分大小写，与内存实现一致。

use crate::error::StoreError;
use crate::store::{ContentRecord, MetaRecord, OptionRecord, RecordStore};
use rusqlite::{params, Connection};
use std::path::Path;

pub struct SqliteStore {
    conn: Connection,
    prefix: String,
}

/// LIKE 模式构造：转义 `%`/`_`/`\` 后两端加通配
fn make_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// 列名白名单校验；列名会被拼进 SQL，禁止任意标识符
fn check_ident(name: &str) -> Result<(), StoreError> {
    let ok = !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::BadColumn(name.to_string()))
    }
}

/// 表前缀同样拼进 SQL；空前缀合法
fn check_prefix(prefix: &str) -> Result<(), StoreError> {
    if prefix.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        Ok(())
    } else {
        Err(StoreError::Other(format!("bad table prefix `{prefix}`")))
    }
}

impl SqliteStore {
    pub fn open(path: &Path, prefix: &str) -> Result<Self, StoreError> {
        check_prefix(prefix)?;
        let conn = Connection::open(path)?;
        Ok(Self { conn, prefix: prefix.to_string() })
    }

    pub fn open_in_memory(prefix: &str) -> Result<Self, StoreError> {
        check_prefix(prefix)?;
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn, prefix: prefix.to_string() })
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// 建表（夹具与新库引导用；已有表保持不动）
    pub fn init_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {posts} (
                ID INTEGER PRIMARY KEY,
                post_type TEXT NOT NULL DEFAULT 'post',
                post_title TEXT NOT NULL DEFAULT '',
                post_content TEXT NOT NULL DEFAULT '',
                post_excerpt TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS {postmeta} (
                meta_id INTEGER PRIMARY KEY,
                post_id INTEGER NOT NULL,
                meta_key TEXT NOT NULL DEFAULT '',
                meta_value TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS {options} (
                option_id INTEGER PRIMARY KEY,
                option_name TEXT NOT NULL UNIQUE,
                option_value TEXT NOT NULL DEFAULT ''
            );",
            posts = self.table("posts"),
            postmeta = self.table("postmeta"),
            options = self.table("options"),
        ))?;
        Ok(())
    }

    pub fn insert_post(
        &self,
        id: i64,
        record_type: &str,
        title: &str,
        content: &str,
        excerpt: &str,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} (ID, post_type, post_title, post_content, post_excerpt)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                self.table("posts")
            ),
            params![id, record_type, title, content, excerpt],
        )?;
        Ok(())
    }

    pub fn insert_meta(&self, post_id: i64, key: &str, value: &str) -> Result<i64, StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} (post_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
                self.table("postmeta")
            ),
            params![post_id, key, value],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_option(&self, name: &str, value: &str) -> Result<i64, StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO {} (option_name, option_value) VALUES (?1, ?2)",
                self.table("options")
            ),
            params![name, value],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// 当前值直读（断言与复核用）
    pub fn post_field(&self, id: i64, field: &str) -> Result<Option<String>, StoreError> {
        check_ident(field)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {field} FROM {} WHERE ID = ?1",
            self.table("posts")
        ))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn meta_value(&self, meta_id: i64) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT meta_value FROM {} WHERE meta_id = ?1",
            self.table("postmeta")
        ))?;
        let mut rows = stmt.query(params![meta_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    pub fn option_value(&self, option_id: i64) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT option_value FROM {} WHERE option_id = ?1",
            self.table("options")
        ))?;
        let mut rows = stmt.query(params![option_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}

impl RecordStore for SqliteStore {
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
        for f in fields {
            check_ident(f)?;
        }
        let cols = fields.join(", ");
        let crit = fields
            .iter()
            .map(|f| format!("{f} LIKE ?1 ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        let sql = format!(
            "SELECT ID, post_type, post_title, {cols} FROM {posts}
             WHERE ({crit}) ORDER BY ID LIMIT ?2 OFFSET ?3",
            posts = self.table("posts"),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mapped = stmt.query_map(
            params![make_like(needle), limit as i64, offset as i64],
            |row| {
                let id: i64 = row.get(0)?;
                let record_type: String = row.get(1)?;
                let title: String = row.get(2)?;
                let mut out_fields = Vec::with_capacity(fields.len());
                for (i, f) in fields.iter().enumerate() {
                    let v: Option<String> = row.get(3 + i)?;
                    out_fields.push((f.clone(), v.unwrap_or_default()));
                }
                Ok(ContentRecord { id, record_type, title, fields: out_fields })
            },
        )?;
        let mut out = Vec::new();
        for r in mapped {
            out.push(r?);
        }
        Ok(out)
    }

    fn search_meta(
        &mut self,
        needle: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MetaRecord>, StoreError> {
        let sql = format!(
            "SELECT meta_id, post_id, meta_key, meta_value FROM {}
             WHERE meta_value LIKE ?1 ESCAPE '\\' OR meta_key LIKE ?1 ESCAPE '\\'
             ORDER BY meta_id LIMIT ?2 OFFSET ?3",
            self.table("postmeta"),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mapped = stmt.query_map(
            params![make_like(needle), limit as i64, offset as i64],
            |row| {
                Ok(MetaRecord {
                    meta_id: row.get(0)?,
                    parent_id: row.get(1)?,
                    key: row.get(2)?,
                    value: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            },
        )?;
        let mut out = Vec::new();
        for r in mapped {
            out.push(r?);
        }
        Ok(out)
    }

    fn search_options(
        &mut self,
        needle: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<OptionRecord>, StoreError> {
        let sql = format!(
            "SELECT option_id, option_name, option_value FROM {}
             WHERE option_value LIKE ?1 ESCAPE '\\' OR option_name LIKE ?1 ESCAPE '\\'
             ORDER BY option_id LIMIT ?2 OFFSET ?3",
            self.table("options"),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mapped = stmt.query_map(
            params![make_like(needle), limit as i64, offset as i64],
            |row| {
                Ok(OptionRecord {
                    option_id: row.get(0)?,
                    name: row.get(1)?,
                    value: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                })
            },
        )?;
        let mut out = Vec::new();
        for r in mapped {
            out.push(r?);
        }
        Ok(out)
    }

    fn content_title(&mut self, id: i64) -> Result<Option<String>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT post_title FROM {} WHERE ID = ?1",
            self.table("posts")
        ))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn update_content_field(
        &mut self,
        id: i64,
        field: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        check_ident(field)?;
        // SQLite 无记录级缓存；缓存失效义务到此即兑现
        self.conn.execute(
            &format!("UPDATE {} SET {field} = ?1 WHERE ID = ?2", self.table("posts")),
            params![value, id],
        )?;
        Ok(())
    }

    fn update_meta_value(&mut self, meta_id: i64, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "UPDATE {} SET meta_value = ?1 WHERE meta_id = ?2",
                self.table("postmeta")
            ),
            params![value, meta_id],
        )?;
        Ok(())
    }

    fn update_option_value(&mut self, option_id: i64, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "UPDATE {} SET option_value = ?1 WHERE option_id = ?2",
                self.table("options")
            ),
            params![value, option_id],
        )?;
        Ok(())
    }

    // 平铺事务走显式语句；rusqlite 的 Transaction 句柄带借用生命周期，
    // 放不进按 &mut self 切分的 trait 方法。
    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SqliteStore {
        let store = SqliteStore::open_in_memory("wp_").unwrap();
        store.init_schema().unwrap();
        store.insert_post(1, "post", "Hello", "some needle text", "").unwrap();
        store.insert_post(2, "page", "Other", "nothing here", "").unwrap();
        store.insert_meta(1, "color", "needle red").unwrap();
        store.insert_option("siteurl", "https://needle.example").unwrap();
        store
    }

    #[test]
    fn like_prefilter_selects_containing_rows() {
        let mut s = fixture();
        let fields = vec!["post_content".to_string()];
        let hits = s.search_content("needle", &fields, 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[0].fields[0].1, "some needle text");
    }

    #[test]
    fn like_prefilter_is_ascii_case_insensitive() {
        let mut s = fixture();
        let fields = vec!["post_content".to_string()];
        assert_eq!(s.search_content("NEEDLE", &fields, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn like_wildcards_in_needle_are_escaped() {
        let mut s = fixture();
        s.insert_option("pct", "100% done").unwrap();
        s.insert_option("count", "1000 things").unwrap();
        s.insert_option("snake", "foo_bar").unwrap();
        s.insert_option("notsnake", "fooXbar").unwrap();
        // `%` 按字面量过滤：不转义的话 `%100%%` 会把 "1000 things" 也选进来
        let hits = s.search_options("100%", 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "pct");
        // `_` 按字面量过滤：不转义的话会作单字符通配选中 "fooXbar"
        let hits = s.search_options("foo_bar", 10, 0).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "snake");
    }

    #[test]
    fn bad_column_names_are_rejected() {
        let mut s = fixture();
        let fields = vec!["post_content; DROP TABLE wp_posts".to_string()];
        assert!(matches!(
            s.search_content("x", &fields, 10, 0),
            Err(StoreError::BadColumn(_))
        ));
    }

    #[test]
    fn update_and_readback_by_primary_key() {
        let mut s = fixture();
        s.update_content_field(1, "post_content", "rewritten").unwrap();
        assert_eq!(s.post_field(1, "post_content").unwrap().as_deref(), Some("rewritten"));
        s.update_option_value(1, "v2").unwrap();
        assert_eq!(s.option_value(1).unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn transaction_rollback_discards_writes() {
        let mut s = fixture();
        s.begin().unwrap();
        s.update_meta_value(1, "changed").unwrap();
        s.rollback().unwrap();
        assert_eq!(s.meta_value(1).unwrap().as_deref(), Some("needle red"));
    }

    #[test]
    fn on_disk_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.db");
        {
            let store = SqliteStore::open(&path, "wp_").unwrap();
            store.init_schema().unwrap();
            store.insert_option("siteurl", "https://example.com").unwrap();
        }
        let store = SqliteStore::open(&path, "wp_").unwrap();
        assert_eq!(
            store.option_value(1).unwrap().as_deref(),
            Some("https://example.com")
        );
    }
}
