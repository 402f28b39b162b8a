// ==========================================
// 目录工作簿导入 - 命令行入口
// ==========================================
// 用法:
//   catalogue-import <workbook> [db_path] [--batch-size N] [--local CODE VERSION]
//                    [--json-log] [--locale L]
//
// db_path 缺省时依次取 CATALOGUE_IMPORT_DB_PATH 环境变量、用户数据目录
// 成功时以 JSON 输出导入结果；中止时返回非零退出码
// ==========================================

use anyhow::{bail, Context};
use catalogue_import::app::{get_default_db_path, CatalogueSession};
use catalogue_import::config::{ConfigManager, ImportConfig};
use catalogue_import::domain::{Catalogue, CatalogueMode};
use catalogue_import::importer::{CatalogueWorkbookImporter, LoggingProgress};
use catalogue_import::repository::CatalogueRepository;
use catalogue_import::{i18n, logging};
use std::sync::Arc;

struct CliArgs {
    workbook: String,
    db_path: Option<String>,
    batch_size: Option<usize>,
    local: Option<(String, String)>,
    json_log: bool,
    locale: Option<String>,
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let mut args = std::env::args().skip(1);
    let mut positional = Vec::new();
    let mut cli = CliArgs {
        workbook: String::new(),
        db_path: None,
        batch_size: None,
        local: None,
        json_log: false,
        locale: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--batch-size" => {
                let raw = args.next().context("--batch-size 需要一个数值")?;
                cli.batch_size = Some(raw.parse().with_context(|| format!("无效的批次大小: {}", raw))?);
            }
            "--local" => {
                let code = args.next().context("--local 需要 CODE VERSION")?;
                let version = args.next().context("--local 需要 CODE VERSION")?;
                cli.local = Some((code, version));
            }
            "--json-log" => cli.json_log = true,
            "--locale" => cli.locale = Some(args.next().context("--locale 需要语言代码")?),
            other if other.starts_with("--") => bail!("未知参数: {}", other),
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    cli.workbook = positional
        .next()
        .context("用法: catalogue-import <workbook> [db_path] [--batch-size N] [--local CODE VERSION] [--json-log] [--locale L]")?;
    cli.db_path = positional.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Ok(cli)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = parse_args()?;

    if cli.json_log {
        logging::init_json();
    } else {
        logging::init();
    }
    if let Some(locale) = &cli.locale {
        i18n::set_locale(locale);
    }

    tracing::info!("==================================================");
    tracing::info!("{} v{}", catalogue_import::APP_NAME, catalogue_import::VERSION);
    tracing::info!("==================================================");

    let db_path = cli.db_path.clone().unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let repo = CatalogueRepository::new(&db_path)
        .with_context(|| format!("无法打开目标库: {}", db_path))?;

    let mut config = ImportConfig::load(&ConfigManager::from_connection(repo.connection())?).await?;
    if let Some(batch_size) = cli.batch_size {
        config = config.with_batch_size(batch_size);
    }

    let session = Arc::new(CatalogueSession::new());
    if let Some((code, version)) = &cli.local {
        let local = match repo.find_catalogue(code, version)? {
            Some(existing) => existing,
            None => {
                let mut local = Catalogue::new(code.as_str(), version.as_str(), CatalogueMode::Local);
                local.db_path = Some(db_path.clone());
                local.id = Some(repo.insert_catalogue(&local)?);
                tracing::info!(catalogue = %local, "已创建本地目录");
                local
            }
        };
        session.open(local);
    }

    let importer = CatalogueWorkbookImporter::new(repo, config)
        .with_progress(Arc::new(LoggingProgress::new()))
        .with_session(session);

    let outcome = importer
        .import_workbook(&cli.workbook)
        .await
        .with_context(|| format!("导入失败: {}", cli.workbook))?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
