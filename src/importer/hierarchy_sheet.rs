// ==========================================
// 目录工作簿导入 - 层级页导入器
// ==========================================
// 依赖: 已解析的目录 + 工作簿目录代码
// 约束: 恰好一个主层级；主层级代码必须等于目录页代码
// 落库: 主层级以已解析目录的代码保存（本地目录与工作簿代码可能不同）
// ==========================================

use crate::domain::catalogue::{Catalogue, Hierarchy};
use crate::domain::sheet::{Row, RowBatch};
use crate::domain::types::SheetKind;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_importer::{flag_or, int_opt, required_text, SheetImporter};
use crate::repository::CatalogueRepository;
use tracing::debug;

pub struct HierarchySheetImporter {
    repo: CatalogueRepository,
    catalogue_id: i64,
    catalogue_code: String,
    excel_code: String,
    master_row: Option<usize>,
    committed: usize,
}

impl HierarchySheetImporter {
    pub fn new(repo: CatalogueRepository, catalogue: &Catalogue, excel_code: &str) -> ImportResult<Self> {
        let catalogue_id = catalogue
            .id
            .ok_or_else(|| ImportError::InternalError(format!("目录 {} 尚未落库", catalogue)))?;
        Ok(Self {
            repo,
            catalogue_id,
            catalogue_code: catalogue.code.clone(),
            excel_code: excel_code.to_string(),
            master_row: None,
            committed: 0,
        })
    }

    /// 结束层级页：必须出现过主层级
    pub fn finish(self) -> ImportResult<usize> {
        if self.master_row.is_none() {
            return Err(ImportError::ReferenceError(format!(
                "层级页缺少主层级（目录代码 {}）",
                self.excel_code
            )));
        }
        Ok(self.committed)
    }

    fn parse_row(&mut self, row: &Row) -> ImportResult<Hierarchy> {
        let mut code = required_text(row, "code")?;
        let is_master = flag_or(row, "isMaster", false)?;

        if is_master {
            if let Some(first) = self.master_row {
                return Err(ImportError::ReferenceError(format!(
                    "主层级重复: 第 {} 行与第 {} 行",
                    first, row.row_number
                )));
            }
            if code != self.excel_code {
                return Err(ImportError::ReferenceError(format!(
                    "主层级代码 {} 与目录页代码 {} 不一致 (行 {})",
                    code, self.excel_code, row.row_number
                )));
            }
            self.master_row = Some(row.row_number);
            code = self.catalogue_code.clone();
        }

        Ok(Hierarchy {
            id: None,
            code,
            name: row.text("name"),
            label: row.text("label"),
            scope_note: row.text("scopeNote"),
            applicability: row.text("applicability"),
            order: int_opt(row, "order")?.unwrap_or(row.row_number as i64),
            is_master,
            status: row.text("status"),
            deprecated: flag_or(row, "deprecated", false)?,
        })
    }
}

impl SheetImporter for HierarchySheetImporter {
    fn sheet_kind(&self) -> SheetKind {
        SheetKind::Hierarchy
    }

    fn required_columns(&self) -> Vec<String> {
        vec!["code".to_string(), "isMaster".to_string()]
    }

    fn import_data(&mut self, batch: &RowBatch) -> ImportResult<usize> {
        let mut hierarchies = Vec::with_capacity(batch.len());
        for row in &batch.rows {
            hierarchies.push(self.parse_row(row)?);
        }

        let count = self.repo.insert_hierarchies(self.catalogue_id, &hierarchies)?;
        self.committed += count;
        debug!(batch = batch.index, committed = count, "层级批次已提交");
        Ok(count)
    }
}
