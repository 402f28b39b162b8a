// ==========================================
// 目录工作簿导入 - 导入运行记录 Repository
// ==========================================
// 职责: 记录每次导入运行的状态（RUNNING → COMPLETED | INCOMPLETE）
// 用途: 失败的运行留下 INCOMPLETE 标记，避免半成品目录被当作可用目录
// ==========================================

use crate::domain::types::{ImportRunStatus, ImportStage};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 导入运行记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRunRecord {
    pub run_id: String,
    pub source_path: String,
    pub catalogue_id: Option<i64>,
    pub status: ImportRunStatus,
    pub failed_stage: Option<String>,
    pub failed_batch: Option<i64>,
    pub error_message: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

// ==========================================
// ImportRunRepository
// ==========================================
#[derive(Clone)]
pub struct ImportRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ImportRunRepository {
    /// 共享目录库连接（schema 由 CatalogueRepository 负责创建）
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 登记一次新的导入运行
    pub fn begin_run(&self, run_id: &str, source_path: &str) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT INTO import_run (run_id, source_path, status, started_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                run_id,
                source_path,
                ImportRunStatus::Running.as_str(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// 关联本次运行的目录
    pub fn attach_catalogue(&self, run_id: &str, catalogue_id: i64) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "UPDATE import_run SET catalogue_id = ?1 WHERE run_id = ?2",
            params![catalogue_id, run_id],
        )?;
        Ok(())
    }

    /// 运行成功结束
    pub fn complete_run(&self, run_id: &str) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            "UPDATE import_run SET status = ?1, finished_at = ?2 WHERE run_id = ?3",
            params![
                ImportRunStatus::Completed.as_str(),
                Utc::now().to_rfc3339(),
                run_id
            ],
        )?;
        Ok(())
    }

    /// 运行中止：标记 INCOMPLETE 并记录失败位置
    pub fn mark_incomplete(
        &self,
        run_id: &str,
        stage: ImportStage,
        batch: Option<usize>,
        message: &str,
    ) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            UPDATE import_run
            SET status = ?1, failed_stage = ?2, failed_batch = ?3, error_message = ?4, finished_at = ?5
            WHERE run_id = ?6
            "#,
            params![
                ImportRunStatus::Incomplete.as_str(),
                stage.to_string(),
                batch.map(|b| b as i64),
                message,
                Utc::now().to_rfc3339(),
                run_id
            ],
        )?;
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> RepositoryResult<ImportRunRecord> {
        let conn = self.conn.lock()?;
        conn.query_row(
            r#"
            SELECT run_id, source_path, catalogue_id, status, failed_stage, failed_batch,
                   error_message, started_at, finished_at
            FROM import_run WHERE run_id = ?1
            "#,
            params![run_id],
            |row| {
                let status: String = row.get(3)?;
                Ok(ImportRunRecord {
                    run_id: row.get(0)?,
                    source_path: row.get(1)?,
                    catalogue_id: row.get(2)?,
                    status: ImportRunStatus::from_str(&status),
                    failed_stage: row.get(4)?,
                    failed_batch: row.get(5)?,
                    error_message: row.get(6)?,
                    started_at: row.get(7)?,
                    finished_at: row.get(8)?,
                })
            },
        )
        .optional()?
        .ok_or_else(|| RepositoryError::NotFound {
            entity: "import_run".to_string(),
            id: run_id.to_string(),
        })
    }

    /// 最近一次运行的状态（无运行记录时返回 None）
    pub fn latest_status(&self) -> RepositoryResult<Option<ImportRunStatus>> {
        let conn = self.conn.lock()?;
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM import_run ORDER BY started_at DESC, rowid DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(status.map(|s| ImportRunStatus::from_str(&s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_catalogue_schema;

    fn repo() -> ImportRunRepository {
        let conn = Connection::open_in_memory().unwrap();
        ensure_catalogue_schema(&conn).unwrap();
        ImportRunRepository::new(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_failed_run_is_marked_incomplete() {
        let repo = repo();
        repo.begin_run("run-1", "/tmp/cat.xlsx").unwrap();
        assert_eq!(repo.latest_status().unwrap(), Some(ImportRunStatus::Running));

        repo.mark_incomplete("run-1", ImportStage::Term, Some(2), "forced")
            .unwrap();

        let run = repo.get_run("run-1").unwrap();
        assert_eq!(run.status, ImportRunStatus::Incomplete);
        assert_eq!(run.failed_stage.as_deref(), Some("TERM"));
        assert_eq!(run.failed_batch, Some(2));
        assert!(run.finished_at.is_some());
    }
}
