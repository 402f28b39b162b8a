// ==========================================
// 目录工作簿导入 - 目录数据 Repository
// ==========================================
// 职责: 目录、层级、属性、术语类型、术语、术语关系、发布说明的数据访问
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 每个写入批次一个事务，要么整体提交，要么整体回滚
// ==========================================

use crate::db::{ensure_catalogue_schema, open_sqlite_connection};
use crate::domain::catalogue::{
    Attribute, Catalogue, Hierarchy, ImportCounts, ReleaseNote, ReleaseNoteOperation,
    StoredTerm, Term, TermAttribute, TermParent, TermType,
};
use crate::domain::types::CatalogueMode;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// CatalogueRepository
// ==========================================
#[derive(Clone)]
pub struct CatalogueRepository {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl CatalogueRepository {
    /// 打开（或创建）目录库并确保 schema 存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_catalogue_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: db_path.to_string(),
        })
    }

    /// 从已有连接创建（测试/共享连接场景）
    pub fn from_connection(conn: Arc<Mutex<Connection>>, db_path: &str) -> RepositoryResult<Self> {
        {
            let guard = conn.lock()?;
            crate::db::configure_sqlite_connection(&guard)?;
            ensure_catalogue_schema(&guard)?;
        }

        Ok(Self {
            conn,
            db_path: db_path.to_string(),
        })
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    // ==========================================
    // 目录
    // ==========================================

    /// 插入目录记录（import_state 初始为 INCOMPLETE）
    pub fn insert_catalogue(&self, cat: &Catalogue) -> RepositoryResult<i64> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT INTO catalogue (
                code, version, name, label, scope_note, term_code_mask,
                term_code_length, term_min_code, accept_non_standard_codes,
                generate_missing_codes, status, deprecated, is_local, db_path,
                import_state
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 'INCOMPLETE')
            "#,
            params![
                cat.code,
                cat.version,
                cat.name,
                cat.label,
                cat.scope_note,
                cat.term_code_mask,
                cat.term_code_length,
                cat.term_min_code,
                cat.accept_non_standard_codes,
                cat.generate_missing_codes,
                cat.status,
                cat.deprecated,
                cat.is_local(),
                cat.db_path,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 按身份 (code, version) 查找目录
    pub fn find_catalogue(&self, code: &str, version: &str) -> RepositoryResult<Option<Catalogue>> {
        let conn = self.conn.lock()?;
        let cat = conn
            .query_row(
                &format!("{} WHERE code = ?1 AND version = ?2", CATALOGUE_SELECT),
                params![code, version],
                map_catalogue,
            )
            .optional()?;
        Ok(cat)
    }

    /// 标记目录是否可用（COMPLETE / INCOMPLETE）
    pub fn set_import_state(&self, catalogue_id: i64, complete: bool) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        let state = if complete { "COMPLETE" } else { "INCOMPLETE" };
        conn.execute(
            "UPDATE catalogue SET import_state = ?1 WHERE id = ?2",
            params![state, catalogue_id],
        )?;
        Ok(())
    }

    /// 目录是否已完整导入
    pub fn is_import_complete(&self, catalogue_id: i64) -> RepositoryResult<bool> {
        let conn = self.conn.lock()?;
        let state: Option<String> = conn
            .query_row(
                "SELECT import_state FROM catalogue WHERE id = ?1",
                params![catalogue_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(state.as_deref() == Some("COMPLETE"))
    }

    pub fn count_catalogues(&self) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM catalogue", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    // ==========================================
    // 层级
    // ==========================================

    /// 批量插入层级（事务化）
    pub fn insert_hierarchies(
        &self,
        catalogue_id: i64,
        hierarchies: &[Hierarchy],
    ) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO hierarchy (
                    catalogue_id, code, name, label, scope_note, applicability,
                    hierarchy_order, is_master, status, deprecated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(catalogue_id, code) DO UPDATE SET
                    name = excluded.name,
                    label = excluded.label,
                    scope_note = excluded.scope_note,
                    applicability = excluded.applicability,
                    hierarchy_order = excluded.hierarchy_order,
                    is_master = excluded.is_master,
                    status = excluded.status,
                    deprecated = excluded.deprecated
                "#,
            )?;
            for h in hierarchies {
                stmt.execute(params![
                    catalogue_id,
                    h.code,
                    h.name,
                    h.label,
                    h.scope_note,
                    h.applicability,
                    h.order,
                    h.is_master,
                    h.status,
                    h.deprecated,
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn list_hierarchies(&self, catalogue_id: i64) -> RepositoryResult<Vec<Hierarchy>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, code, name, label, scope_note, applicability,
                   hierarchy_order, is_master, status, deprecated
            FROM hierarchy WHERE catalogue_id = ?1
            ORDER BY is_master DESC, hierarchy_order, code
            "#,
        )?;
        let rows = stmt.query_map(params![catalogue_id], |row| {
            Ok(Hierarchy {
                id: Some(row.get(0)?),
                code: row.get(1)?,
                name: row.get(2)?,
                label: row.get(3)?,
                scope_note: row.get(4)?,
                applicability: row.get(5)?,
                order: row.get(6)?,
                is_master: row.get(7)?,
                status: row.get(8)?,
                deprecated: row.get(9)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ==========================================
    // 属性 / 术语类型
    // ==========================================

    /// 批量插入属性（事务化）
    pub fn insert_attributes(
        &self,
        catalogue_id: i64,
        attributes: &[Attribute],
    ) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO attribute (
                    catalogue_id, code, name, label, scope_note, reportable, visible,
                    searchable, attribute_order, attribute_type, catalogue_code,
                    single_or_repeatable, inheritance, uniqueness, term_code_alias,
                    status, deprecated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                ON CONFLICT(catalogue_id, code) DO UPDATE SET
                    name = excluded.name,
                    label = excluded.label,
                    scope_note = excluded.scope_note,
                    reportable = excluded.reportable,
                    visible = excluded.visible,
                    searchable = excluded.searchable,
                    attribute_order = excluded.attribute_order,
                    attribute_type = excluded.attribute_type,
                    catalogue_code = excluded.catalogue_code,
                    single_or_repeatable = excluded.single_or_repeatable,
                    inheritance = excluded.inheritance,
                    uniqueness = excluded.uniqueness,
                    term_code_alias = excluded.term_code_alias,
                    status = excluded.status,
                    deprecated = excluded.deprecated
                "#,
            )?;
            for a in attributes {
                stmt.execute(params![
                    catalogue_id,
                    a.code,
                    a.name,
                    a.label,
                    a.scope_note,
                    a.reportable,
                    a.visible,
                    a.searchable,
                    a.order,
                    a.attribute_type,
                    a.catalogue_code,
                    a.single_or_repeatable,
                    a.inheritance,
                    a.uniqueness,
                    a.term_code_alias,
                    a.status,
                    a.deprecated,
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// 读取目录的全部属性（term_types 不回填）
    pub fn list_attributes(&self, catalogue_id: i64) -> RepositoryResult<Vec<Attribute>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, code, name, label, scope_note, reportable, visible, searchable,
                   attribute_order, attribute_type, catalogue_code, single_or_repeatable,
                   inheritance, uniqueness, term_code_alias, status, deprecated
            FROM attribute WHERE catalogue_id = ?1
            ORDER BY attribute_order, code
            "#,
        )?;
        let rows = stmt.query_map(params![catalogue_id], |row| {
            Ok(Attribute {
                id: Some(row.get(0)?),
                code: row.get(1)?,
                name: row.get(2)?,
                label: row.get(3)?,
                scope_note: row.get(4)?,
                reportable: row.get(5)?,
                visible: row.get(6)?,
                searchable: row.get(7)?,
                order: row.get(8)?,
                attribute_type: row.get(9)?,
                catalogue_code: row.get(10)?,
                single_or_repeatable: row.get(11)?,
                inheritance: row.get(12)?,
                uniqueness: row.get(13)?,
                term_code_alias: row.get(14)?,
                status: row.get(15)?,
                deprecated: row.get(16)?,
                term_types: Vec::new(),
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 写入术语类型及属性关联（事务化）
    ///
    /// # 参数
    /// - links: (attribute_id, term_type_code)
    ///
    /// # 返回
    /// - 新建的术语类型数
    pub fn insert_term_type_links(
        &self,
        catalogue_id: i64,
        links: &[(i64, String)],
    ) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut created = 0;
        {
            let mut insert_type = tx.prepare(
                "INSERT OR IGNORE INTO term_type (catalogue_id, code) VALUES (?1, ?2)",
            )?;
            let mut find_type =
                tx.prepare("SELECT id FROM term_type WHERE catalogue_id = ?1 AND code = ?2")?;
            let mut link = tx.prepare(
                "INSERT OR IGNORE INTO attribute_term_type (attribute_id, term_type_id) VALUES (?1, ?2)",
            )?;

            for (attribute_id, code) in links {
                created += insert_type.execute(params![catalogue_id, code])?;
                let type_id: i64 =
                    find_type.query_row(params![catalogue_id, code], |row| row.get(0))?;
                link.execute(params![attribute_id, type_id])?;
            }
        }
        tx.commit()?;
        Ok(created)
    }

    pub fn list_term_types(&self, catalogue_id: i64) -> RepositoryResult<Vec<TermType>> {
        let conn = self.conn.lock()?;
        let mut stmt =
            conn.prepare("SELECT id, code FROM term_type WHERE catalogue_id = ?1 ORDER BY code")?;
        let rows = stmt.query_map(params![catalogue_id], |row| {
            Ok(TermType {
                id: Some(row.get(0)?),
                code: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ==========================================
    // 术语
    // ==========================================

    /// 批量写入术语（事务化）：已存在的代码更新，不存在的插入
    ///
    /// # 返回
    /// - 每个术语的 (code, id, inserted)；仅在事务提交成功后返回
    pub fn upsert_terms(&self, catalogue_id: i64, terms: &[Term]) -> RepositoryResult<Vec<StoredTerm>> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        let mut stored = Vec::with_capacity(terms.len());
        {
            let mut find = tx.prepare("SELECT id FROM term WHERE catalogue_id = ?1 AND code = ?2")?;
            let mut insert = tx.prepare(
                r#"
                INSERT INTO term (
                    catalogue_id, code, extended_name, short_name, scope_note,
                    scope_note_links, term_type, status, deprecated, version,
                    last_update, valid_from, valid_to
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )?;
            let mut update = tx.prepare(
                r#"
                UPDATE term SET
                    extended_name = ?2, short_name = ?3, scope_note = ?4,
                    scope_note_links = ?5, term_type = ?6, status = ?7, deprecated = ?8,
                    version = ?9, last_update = ?10, valid_from = ?11, valid_to = ?12
                WHERE id = ?1
                "#,
            )?;

            for t in terms {
                let existing: Option<i64> = find
                    .query_row(params![catalogue_id, t.code], |row| row.get(0))
                    .optional()?;

                match existing {
                    Some(id) => {
                        update.execute(params![
                            id,
                            t.extended_name,
                            t.short_name,
                            t.scope_note,
                            t.scope_note_links,
                            t.term_type,
                            t.status,
                            t.deprecated,
                            t.version,
                            t.last_update,
                            t.valid_from,
                            t.valid_to,
                        ])?;
                        stored.push(StoredTerm {
                            code: t.code.clone(),
                            id,
                            inserted: false,
                        });
                    }
                    None => {
                        insert.execute(params![
                            catalogue_id,
                            t.code,
                            t.extended_name,
                            t.short_name,
                            t.scope_note,
                            t.scope_note_links,
                            t.term_type,
                            t.status,
                            t.deprecated,
                            t.version,
                            t.last_update,
                            t.valid_from,
                            t.valid_to,
                        ])?;
                        stored.push(StoredTerm {
                            code: t.code.clone(),
                            id: tx.last_insert_rowid(),
                            inserted: true,
                        });
                    }
                }
            }
        }
        tx.commit()?;
        Ok(stored)
    }

    /// 按代码查找已落库术语
    pub fn find_term_id(&self, catalogue_id: i64, code: &str) -> RepositoryResult<Option<i64>> {
        let conn = self.conn.lock()?;
        let id = conn
            .query_row(
                "SELECT id FROM term WHERE catalogue_id = ?1 AND code = ?2",
                params![catalogue_id, code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    // ==========================================
    // 术语关系（父级链接 + 术语属性）
    // ==========================================

    /// 替换一批术语的关系（事务化）
    ///
    /// - term_ids 对应术语的旧属性值与旧父级链接先删除再写入
    /// - 同一批内重复的 (term_id, hierarchy_id) 以后出现者为准
    ///
    /// # 返回
    /// - (父级链接数, 术语属性数)
    pub fn replace_term_relations(
        &self,
        term_ids: &[i64],
        parents: &[TermParent],
        attributes: &[TermAttribute],
    ) -> RepositoryResult<(usize, usize)> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut clear_attrs = tx.prepare("DELETE FROM term_attribute WHERE term_id = ?1")?;
            let mut clear_parents = tx.prepare("DELETE FROM term_parent WHERE term_id = ?1")?;
            for id in term_ids {
                clear_attrs.execute(params![id])?;
                clear_parents.execute(params![id])?;
            }

            let mut insert_parent = tx.prepare(
                r#"
                INSERT OR REPLACE INTO term_parent (
                    term_id, hierarchy_id, parent_term_id, term_order, reportable
                ) VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for p in parents {
                insert_parent.execute(params![
                    p.term_id,
                    p.hierarchy_id,
                    p.parent_term_id,
                    p.order,
                    p.reportable,
                ])?;
            }

            let mut insert_attr = tx.prepare(
                "INSERT INTO term_attribute (term_id, attribute_id, value, value_order) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for a in attributes {
                insert_attr.execute(params![a.term_id, a.attribute_id, a.value, a.value_order])?;
            }
        }
        tx.commit()?;
        Ok((parents.len(), attributes.len()))
    }

    // ==========================================
    // 发布说明
    // ==========================================

    pub fn insert_release_note(&self, catalogue_id: i64, note: &ReleaseNote) -> RepositoryResult<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            r#"
            INSERT INTO release_note (catalogue_id, description, note_date, note_version, internal_version)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                catalogue_id,
                note.description,
                note.date,
                note.version,
                note.internal_version,
            ],
        )?;
        Ok(())
    }

    /// 批量插入发布说明操作（事务化）
    pub fn insert_release_note_operations(
        &self,
        catalogue_id: i64,
        operations: &[ReleaseNoteOperation],
    ) -> RepositoryResult<usize> {
        let conn = self.conn.lock()?;
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO release_note_operation (catalogue_id, op_name, op_date, op_info, op_group_id)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )?;
            for op in operations {
                stmt.execute(params![catalogue_id, op.name, op.date, op.info, op.group_id])?;
            }
        }
        tx.commit()?;
        Ok(operations.len())
    }

    // ==========================================
    // 统计
    // ==========================================

    /// 统计目录下各实体的落库记录数（new_terms 不可从库中推导，恒为 0）
    pub fn count_entities(&self, catalogue_id: i64) -> RepositoryResult<ImportCounts> {
        let conn = self.conn.lock()?;
        let count = |sql: &str| -> RepositoryResult<usize> {
            let n: i64 = conn.query_row(sql, params![catalogue_id], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(ImportCounts {
            hierarchies: count("SELECT COUNT(*) FROM hierarchy WHERE catalogue_id = ?1")?,
            attributes: count("SELECT COUNT(*) FROM attribute WHERE catalogue_id = ?1")?,
            term_types: count("SELECT COUNT(*) FROM term_type WHERE catalogue_id = ?1")?,
            terms: count("SELECT COUNT(*) FROM term WHERE catalogue_id = ?1")?,
            new_terms: 0,
            term_parents: count(
                "SELECT COUNT(*) FROM term_parent p JOIN term t ON t.id = p.term_id WHERE t.catalogue_id = ?1",
            )?,
            term_attributes: count(
                "SELECT COUNT(*) FROM term_attribute a JOIN term t ON t.id = a.term_id WHERE t.catalogue_id = ?1",
            )?,
            release_notes: count("SELECT COUNT(*) FROM release_note WHERE catalogue_id = ?1")?,
            release_note_operations: count(
                "SELECT COUNT(*) FROM release_note_operation WHERE catalogue_id = ?1",
            )?,
        })
    }
}

const CATALOGUE_SELECT: &str = r#"
    SELECT id, code, version, name, label, scope_note, term_code_mask, term_code_length,
           term_min_code, accept_non_standard_codes, generate_missing_codes, status,
           deprecated, is_local, db_path
    FROM catalogue"#;

fn map_catalogue(row: &rusqlite::Row<'_>) -> rusqlite::Result<Catalogue> {
    let is_local: bool = row.get(13)?;
    Ok(Catalogue {
        id: Some(row.get(0)?),
        code: row.get(1)?,
        version: row.get(2)?,
        name: row.get(3)?,
        label: row.get(4)?,
        scope_note: row.get(5)?,
        term_code_mask: row.get(6)?,
        term_code_length: row.get(7)?,
        term_min_code: row.get(8)?,
        accept_non_standard_codes: row.get(9)?,
        generate_missing_codes: row.get(10)?,
        status: row.get(11)?,
        deprecated: row.get(12)?,
        mode: if is_local {
            CatalogueMode::Local
        } else {
            CatalogueMode::Distributed
        },
        db_path: row.get(14)?,
        release_note: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> CatalogueRepository {
        let conn = Connection::open_in_memory().unwrap();
        CatalogueRepository::from_connection(Arc::new(Mutex::new(conn)), ":memory:").unwrap()
    }

    fn term(code: &str) -> Term {
        Term {
            id: None,
            code: code.to_string(),
            extended_name: Some(format!("{} name", code)),
            short_name: None,
            scope_note: None,
            scope_note_links: None,
            term_type: None,
            status: None,
            deprecated: false,
            version: None,
            last_update: None,
            valid_from: None,
            valid_to: None,
        }
    }

    #[test]
    fn test_upsert_terms_reports_inserted_only_once() {
        let repo = repo();
        let cat_id = repo
            .insert_catalogue(&Catalogue::new("MTX", "1.0", CatalogueMode::Distributed))
            .unwrap();

        let first = repo.upsert_terms(cat_id, &[term("A01"), term("A02")]).unwrap();
        assert!(first.iter().all(|t| t.inserted));

        let second = repo.upsert_terms(cat_id, &[term("A02"), term("A03")]).unwrap();
        assert!(!second[0].inserted);
        assert_eq!(second[0].id, first[1].id);
        assert!(second[1].inserted);

        assert_eq!(repo.count_entities(cat_id).unwrap().terms, 3);
    }

    #[test]
    fn test_catalogue_identity_is_unique() {
        let repo = repo();
        let cat = Catalogue::new("MTX", "1.0", CatalogueMode::Distributed);
        repo.insert_catalogue(&cat).unwrap();
        let err = repo.insert_catalogue(&cat).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));
    }

    #[test]
    fn test_import_state_starts_incomplete() {
        let repo = repo();
        let id = repo
            .insert_catalogue(&Catalogue::new("MTX", "1.0", CatalogueMode::Distributed))
            .unwrap();
        assert!(!repo.is_import_complete(id).unwrap());
        repo.set_import_state(id, true).unwrap();
        assert!(repo.is_import_complete(id).unwrap());
    }
}
