// ==========================================
// 目录工作簿导入 - SQLite 连接初始化与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 目标库 schema 幂等创建（CREATE TABLE IF NOT EXISTS）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 创建目录库 schema（幂等）
///
/// 目录、层级、属性、术语类型、术语、术语属性、术语父级、发布说明、
/// 偏好、检索选项、导入运行记录、配置表
pub fn ensure_catalogue_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS catalogue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL,
            version TEXT NOT NULL,
            name TEXT,
            label TEXT,
            scope_note TEXT,
            term_code_mask TEXT,
            term_code_length INTEGER,
            term_min_code TEXT,
            accept_non_standard_codes INTEGER NOT NULL DEFAULT 0,
            generate_missing_codes INTEGER NOT NULL DEFAULT 0,
            status TEXT,
            deprecated INTEGER NOT NULL DEFAULT 0,
            is_local INTEGER NOT NULL DEFAULT 0,
            db_path TEXT,
            import_state TEXT NOT NULL DEFAULT 'INCOMPLETE',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (code, version)
        );

        CREATE TABLE IF NOT EXISTS hierarchy (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalogue_id INTEGER NOT NULL REFERENCES catalogue(id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            name TEXT,
            label TEXT,
            scope_note TEXT,
            applicability TEXT,
            hierarchy_order INTEGER NOT NULL DEFAULT 0,
            is_master INTEGER NOT NULL DEFAULT 0,
            status TEXT,
            deprecated INTEGER NOT NULL DEFAULT 0,
            UNIQUE (catalogue_id, code)
        );

        CREATE TABLE IF NOT EXISTS attribute (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalogue_id INTEGER NOT NULL REFERENCES catalogue(id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            name TEXT,
            label TEXT,
            scope_note TEXT,
            reportable TEXT,
            visible INTEGER NOT NULL DEFAULT 1,
            searchable INTEGER NOT NULL DEFAULT 0,
            attribute_order INTEGER NOT NULL DEFAULT 0,
            attribute_type TEXT,
            catalogue_code TEXT,
            single_or_repeatable TEXT,
            inheritance TEXT,
            uniqueness INTEGER NOT NULL DEFAULT 0,
            term_code_alias INTEGER NOT NULL DEFAULT 0,
            status TEXT,
            deprecated INTEGER NOT NULL DEFAULT 0,
            UNIQUE (catalogue_id, code)
        );

        CREATE TABLE IF NOT EXISTS term_type (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalogue_id INTEGER NOT NULL REFERENCES catalogue(id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            UNIQUE (catalogue_id, code)
        );

        CREATE TABLE IF NOT EXISTS attribute_term_type (
            attribute_id INTEGER NOT NULL REFERENCES attribute(id) ON DELETE CASCADE,
            term_type_id INTEGER NOT NULL REFERENCES term_type(id) ON DELETE CASCADE,
            PRIMARY KEY (attribute_id, term_type_id)
        );

        CREATE TABLE IF NOT EXISTS term (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalogue_id INTEGER NOT NULL REFERENCES catalogue(id) ON DELETE CASCADE,
            code TEXT NOT NULL,
            extended_name TEXT,
            short_name TEXT,
            scope_note TEXT,
            scope_note_links TEXT,
            term_type TEXT,
            status TEXT,
            deprecated INTEGER NOT NULL DEFAULT 0,
            version TEXT,
            last_update TEXT,
            valid_from TEXT,
            valid_to TEXT,
            UNIQUE (catalogue_id, code)
        );

        CREATE TABLE IF NOT EXISTS term_attribute (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            term_id INTEGER NOT NULL REFERENCES term(id) ON DELETE CASCADE,
            attribute_id INTEGER NOT NULL REFERENCES attribute(id) ON DELETE CASCADE,
            value TEXT NOT NULL,
            value_order INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS term_parent (
            term_id INTEGER NOT NULL REFERENCES term(id) ON DELETE CASCADE,
            hierarchy_id INTEGER NOT NULL REFERENCES hierarchy(id) ON DELETE CASCADE,
            parent_term_id INTEGER REFERENCES term(id),
            term_order INTEGER NOT NULL DEFAULT 0,
            reportable INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (term_id, hierarchy_id)
        );

        CREATE TABLE IF NOT EXISTS release_note (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalogue_id INTEGER NOT NULL REFERENCES catalogue(id) ON DELETE CASCADE,
            description TEXT,
            note_date TEXT,
            note_version TEXT,
            internal_version TEXT
        );

        CREATE TABLE IF NOT EXISTS release_note_operation (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            catalogue_id INTEGER NOT NULL REFERENCES catalogue(id) ON DELETE CASCADE,
            op_name TEXT NOT NULL,
            op_date TEXT,
            op_info TEXT,
            op_group_id INTEGER
        );

        CREATE TABLE IF NOT EXISTS catalogue_preference (
            catalogue_id INTEGER NOT NULL REFERENCES catalogue(id) ON DELETE CASCADE,
            pref_key TEXT NOT NULL,
            pref_type TEXT NOT NULL,
            pref_value TEXT,
            PRIMARY KEY (catalogue_id, pref_key)
        );

        CREATE TABLE IF NOT EXISTS search_option (
            catalogue_id INTEGER NOT NULL REFERENCES catalogue(id) ON DELETE CASCADE,
            object_type TEXT NOT NULL,
            object_id INTEGER NOT NULL,
            enabled INTEGER NOT NULL DEFAULT 1,
            PRIMARY KEY (catalogue_id, object_type, object_id)
        );

        CREATE TABLE IF NOT EXISTS import_run (
            run_id TEXT PRIMARY KEY,
            source_path TEXT NOT NULL,
            catalogue_id INTEGER,
            status TEXT NOT NULL,
            failed_stage TEXT,
            failed_batch INTEGER,
            error_message TEXT,
            started_at TEXT NOT NULL,
            finished_at TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_term_attribute_term ON term_attribute(term_id);
        CREATE INDEX IF NOT EXISTS idx_term_parent_parent ON term_parent(parent_term_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}
