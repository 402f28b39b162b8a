// ==========================================
// 目录工作簿导入 - 目录偏好与检索选项 Repository
// ==========================================
// 职责: 导入成功后写入默认偏好、默认检索选项
// 约束: 一律 INSERT OR IGNORE，不覆盖已有值（本地目录的访问限制等）
// ==========================================

use crate::repository::error::RepositoryResult;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 默认目录偏好 (key, type, value)
pub const DEFAULT_PREFERENCES: &[(&str, &str, &str)] = &[
    ("minSearchChar", "INTEGER", "3"),
    ("maxRecentTerms", "INTEGER", "15"),
    ("copyImplicitFacets", "BOOLEAN", "false"),
    ("enableBusinessRules", "BOOLEAN", "false"),
    ("logging", "BOOLEAN", "false"),
];

// ==========================================
// CataloguePreferenceRepository
// ==========================================
#[derive(Clone)]
pub struct CataloguePreferenceRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CataloguePreferenceRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 写入默认偏好（已存在的键保持原值）
    ///
    /// # 返回
    /// - 实际新写入的偏好数
    pub fn insert_default_preferences(&self, catalogue_id: i64) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO catalogue_preference (catalogue_id, pref_key, pref_type, pref_value)
                VALUES (?1, ?2, ?3, ?4)
                "#,
            )?;
            for (key, pref_type, value) in DEFAULT_PREFERENCES {
                inserted += stmt.execute(params![catalogue_id, key, pref_type, value])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// 写入默认检索选项：可检索属性 + 全部术语类型，默认启用
    pub fn insert_default_search_options(&self, catalogue_id: i64) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        let attrs = tx.execute(
            r#"
            INSERT OR IGNORE INTO search_option (catalogue_id, object_type, object_id, enabled)
            SELECT catalogue_id, 'ATTRIBUTE', id, 1 FROM attribute
            WHERE catalogue_id = ?1 AND searchable = 1
            "#,
            params![catalogue_id],
        )?;
        let types = tx.execute(
            r#"
            INSERT OR IGNORE INTO search_option (catalogue_id, object_type, object_id, enabled)
            SELECT catalogue_id, 'TERM_TYPE', id, 1 FROM term_type
            WHERE catalogue_id = ?1
            "#,
            params![catalogue_id],
        )?;
        tx.commit()?;
        Ok(attrs + types)
    }

    pub fn get_preference(&self, catalogue_id: i64, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.conn.lock()?;
        let value: Option<Option<String>> = conn
            .query_row(
                "SELECT pref_value FROM catalogue_preference WHERE catalogue_id = ?1 AND pref_key = ?2",
                params![catalogue_id, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.flatten())
    }

    /// 写入/覆盖单个偏好
    pub fn set_preference(
        &self,
        catalogue_id: i64,
        key: &str,
        pref_type: &str,
        value: &str,
    ) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO catalogue_preference (catalogue_id, pref_key, pref_type, pref_value)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![catalogue_id, key, pref_type, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_catalogue_schema;

    #[test]
    fn test_defaults_do_not_override_existing_values() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_catalogue_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO catalogue (code, version, is_local) VALUES ('LOC', '0.1', 1)",
            [],
        )
        .unwrap();
        let repo = CataloguePreferenceRepository::new(Arc::new(Mutex::new(conn)));

        repo.set_preference(1, "enableBusinessRules", "BOOLEAN", "true")
            .unwrap();
        let inserted = repo.insert_default_preferences(1).unwrap();

        assert_eq!(inserted, DEFAULT_PREFERENCES.len() - 1);
        assert_eq!(
            repo.get_preference(1, "enableBusinessRules").unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(repo.insert_default_preferences(1).unwrap(), 0);
    }
}
