// ==========================================
// 目录工作簿导入 - 属性页导入器 (+ 术语类型步骤)
// ==========================================
// 第一遍: 写入属性
// 第二遍: 依据 termTypes 列创建术语类型并建立属性 ↔ 术语类型关联
// ==========================================

use crate::domain::catalogue::{Attribute, Catalogue};
use crate::domain::sheet::{Row, RowBatch};
use crate::domain::types::SheetKind;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_importer::{flag_or, int_opt, required_text, split_multi, SheetImporter};
use crate::repository::CatalogueRepository;
use std::collections::HashMap;
use tracing::{debug, info};

pub struct AttributeSheetImporter {
    repo: CatalogueRepository,
    catalogue_id: i64,
    // 属性代码 → 适用术语类型代码
    pending_term_types: Vec<(String, Vec<String>)>,
    committed: usize,
}

impl AttributeSheetImporter {
    pub fn new(repo: CatalogueRepository, catalogue: &Catalogue) -> ImportResult<Self> {
        let catalogue_id = catalogue
            .id
            .ok_or_else(|| ImportError::InternalError(format!("目录 {} 尚未落库", catalogue)))?;
        Ok(Self {
            repo,
            catalogue_id,
            pending_term_types: Vec::new(),
            committed: 0,
        })
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    /// 术语类型步骤：属性全部提交后执行
    ///
    /// # 返回
    /// - 新建的术语类型数
    pub fn link_term_types(&mut self) -> ImportResult<usize> {
        if self.pending_term_types.is_empty() {
            return Ok(0);
        }

        let ids: HashMap<String, i64> = self
            .repo
            .list_attributes(self.catalogue_id)?
            .into_iter()
            .filter_map(|a| a.id.map(|id| (a.code, id)))
            .collect();

        let mut links = Vec::new();
        for (attribute_code, term_types) in self.pending_term_types.drain(..) {
            let attribute_id = ids.get(&attribute_code).copied().ok_or_else(|| {
                ImportError::ReferenceError(format!("属性 {} 未落库，无法关联术语类型", attribute_code))
            })?;
            for code in term_types {
                links.push((attribute_id, code));
            }
        }

        let created = self.repo.insert_term_type_links(self.catalogue_id, &links)?;
        info!(links = links.len(), created, "术语类型关联完成");
        Ok(created)
    }

    fn parse_row(row: &Row) -> ImportResult<Attribute> {
        Ok(Attribute {
            id: None,
            code: required_text(row, "code")?,
            name: row.text("name"),
            label: row.text("label"),
            scope_note: row.text("scopeNote"),
            reportable: row.text("reportable"),
            visible: flag_or(row, "visible", true)?,
            searchable: flag_or(row, "searchable", false)?,
            order: int_opt(row, "order")?.unwrap_or(row.row_number as i64),
            attribute_type: row.text("type"),
            catalogue_code: row.text("catalogueCode"),
            single_or_repeatable: row.text("singleOrRepeatable"),
            inheritance: row.text("inheritance"),
            uniqueness: flag_or(row, "uniqueness", false)?,
            term_code_alias: flag_or(row, "termCodeAlias", false)?,
            status: row.text("status"),
            deprecated: flag_or(row, "deprecated", false)?,
            term_types: row.text("termTypes").map(|raw| split_multi(&raw)).unwrap_or_default(),
        })
    }
}

impl SheetImporter for AttributeSheetImporter {
    fn sheet_kind(&self) -> SheetKind {
        SheetKind::Attribute
    }

    fn required_columns(&self) -> Vec<String> {
        vec!["code".to_string()]
    }

    fn import_data(&mut self, batch: &RowBatch) -> ImportResult<usize> {
        let attributes = batch
            .rows
            .iter()
            .map(Self::parse_row)
            .collect::<ImportResult<Vec<_>>>()?;

        let count = self.repo.insert_attributes(self.catalogue_id, &attributes)?;

        // 提交后才登记待关联的术语类型
        for attribute in attributes {
            if !attribute.term_types.is_empty() {
                self.pending_term_types
                    .push((attribute.code, attribute.term_types));
            }
        }
        self.committed += count;
        debug!(batch = batch.index, committed = count, "属性批次已提交");
        Ok(count)
    }
}
