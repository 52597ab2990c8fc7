use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use deepsweep_core::{
    MatchRow, Profile, ScanRequest, ScanResult, ScanSummary, Scanner, SqliteStore,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

mod export;

/// 命令行入口（基于 clap）
#[derive(Parser, Debug)]
#[command(name = "deepsweep", version, about = "序列化感知的内容库搜索替换")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 扫描（缺省干跑）或替换内容库中的文本
    Scan {
        /// 要查找的文本，或 --regex 下的正则模式体
        needle: String,

        /// 替换文本；不给则只扫描
        #[arg(long)]
        replace: Option<String>,

        /// 实际写库（须与 --replace 同用；缺省一律干跑）
        #[arg(long)]
        apply: bool,

        /// 强制干跑（显式压过 --apply）
        #[arg(long)]
        dry_run: bool,

        /// 大小写敏感匹配
        #[arg(long)]
        case_sensitive: bool,

        /// 整词匹配（命中两侧不得紧邻字母数字/下划线）
        #[arg(long)]
        whole_word: bool,

        /// 将 needle 作为正则模式体
        #[arg(long)]
        regex: bool,

        /// SQLite 数据库路径（或经 --config 提供）
        #[arg(long)]
        db: Option<PathBuf>,

        /// 表前缀
        #[arg(long)]
        prefix: Option<String>,

        /// 内容表扫描字段，逗号分隔（接受 title/content/excerpt 简称）
        #[arg(long)]
        fields: Option<String>,

        /// 跳过内容表
        #[arg(long)]
        skip_content: bool,

        /// 跳过属性表
        #[arg(long)]
        skip_meta: bool,

        /// 跳过设置表
        #[arg(long)]
        skip_options: bool,

        /// 每表每页候选数
        #[arg(long)]
        per_page: Option<usize>,

        /// 起始页（1 起）
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// 最多连续扫描页数（整页信号只是启发式，必须有上限）
        #[arg(long, default_value_t = 1)]
        max_pages: usize,

        /// 导出 CSV 路径
        #[arg(long)]
        export: Option<PathBuf>,

        /// 导出 JSON 路径
        #[arg(long)]
        json: Option<PathBuf>,

        /// 配置档路径（TOML）
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // 初始化日志（RUST_LOG 控制等级，例如 info、debug）
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            needle,
            replace,
            apply,
            dry_run: dry_run_flag,
            case_sensitive,
            whole_word,
            regex,
            db,
            prefix,
            fields,
            skip_content,
            skip_meta,
            skip_options,
            per_page,
            page,
            max_pages,
            export,
            json,
            config,
        } => {
            let profile = match config {
                Some(path) => Profile::load(&path)?,
                None => Profile::default(),
            };

            let db_path = db
                .or_else(|| profile.database.clone())
                .context("no database given (--db or profile `database`)")?;
            let table_prefix = prefix.unwrap_or_else(|| profile.table_prefix.clone());
            let content_fields = match fields {
                Some(s) => parse_fields(&s)?,
                None => profile.content_fields.clone(),
            };

            // 缺省一律干跑；--apply 而无 --replace 没有可写的东西
            let dry_run = dry_run_flag || !apply || replace.is_none();
            if apply && replace.is_none() {
                warn!("--apply without --replace: nothing to write, scanning only");
            }
            if max_pages == 0 {
                bail!("--max-pages must be at least 1");
            }

            let request = ScanRequest {
                needle,
                replacement: replace,
                dry_run,
                case_sensitive,
                whole_word,
                use_regex: regex,
                scan_content: !skip_content,
                scan_meta: !skip_meta,
                scan_options: !skip_options,
                content_fields,
                per_page: per_page.unwrap_or(profile.per_page),
                page,
            };

            let mut store = SqliteStore::open(&db_path, &table_prefix)
                .with_context(|| format!("open store {}", db_path.display()))?;

            let combined = run_paged(request, &mut store, max_pages);

            print_rows(&combined.rows);
            let mode = if dry_run { "scan" } else { "replace" };
            info!(
                mode,
                total_matches = combined.summary.total_matches,
                records_touched = combined.summary.records_touched,
                "done"
            );
            if let Some(err) = &combined.summary.error {
                warn!(error = %err, "batch not persisted");
            }

            if let Some(path) = export {
                export::write_csv(&path, &combined.rows)?;
                info!(path = %path.display(), rows = combined.rows.len(), "csv exported");
            }
            if let Some(path) = json {
                export::write_json(&path, &combined)?;
                info!(path = %path.display(), "json exported");
            }

            if combined.summary.error.is_some() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// 翻页循环：整页信号为真且未达上限时继续下一页；出错即停
fn run_paged(request: ScanRequest, store: &mut SqliteStore, max_pages: usize) -> ScanResult {
    let mut rows: Vec<MatchRow> = Vec::new();
    let mut summary = ScanSummary::default();
    let mut page = request.page;

    for _ in 0..max_pages {
        let mut scanner = Scanner::new(ScanRequest { page, ..request.clone() });
        let result = scanner.run(store);

        let flags = scanner.completion();
        debug!(
            page,
            rows = result.rows.len(),
            content_full = flags.content_full,
            meta_full = flags.meta_full,
            options_full = flags.options_full,
            "batch finished"
        );

        rows.extend(result.rows);
        summary.total_matches += result.summary.total_matches;
        summary.records_touched += result.summary.records_touched;
        if result.summary.error.is_some() {
            summary.error = result.summary.error;
            break;
        }
        if !scanner.likely_has_more() {
            break;
        }
        page += 1;
    }

    ScanResult { rows, summary }
}

/// 字段清单解析；title/content/excerpt 简称展开为列名
fn parse_fields(s: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let column = match part {
            "title" => "post_title",
            "content" => "post_content",
            "excerpt" => "post_excerpt",
            other => other,
        };
        out.push(column.to_string());
    }
    if out.is_empty() {
        bail!("--fields is empty");
    }
    Ok(out)
}

fn print_rows(rows: &[MatchRow]) {
    for r in rows {
        println!(
            "{:<6} {:>8}  {:<24} {:<20} {:>5}  {}",
            r.record_class.as_str(),
            r.id,
            truncate(&r.title, 24),
            truncate(&r.field_or_key, 20),
            r.match_count,
            r.snippet,
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, FmtSubscriber};
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(env_filter).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
