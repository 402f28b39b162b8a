// ==========================================
// 目录工作簿导入 - 术语关系导入器（父级链接 + 术语属性）
// ==========================================
// 数据来源: 复读 term 工作表
// 列约定: <prefix>Flag / <prefix>ParentCode / <prefix>Order / <prefix>Reportable
//         prefix = master（主层级）或层级代码
//         属性值列以属性代码命名，可重复属性按 `$` 拆分
// 引用解析: 新代码集合优先，其次目标存储；均无则悬空引用
// 前置条件: 术语页全部批次已提交（新代码集合已冻结）
// ==========================================

use crate::domain::catalogue::{Attribute, Catalogue, Hierarchy, TermAttribute, TermParent};
use crate::domain::sheet::{Row, RowBatch};
use crate::domain::types::SheetKind;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::new_code_tracker::NewCodeSet;
use crate::importer::sheet_importer::{flag_or, int_opt, required_text, split_multi, SheetImporter};
use crate::repository::CatalogueRepository;
use tracing::{debug, info};

/// 父级代码取该值（或为空）表示层级顶层
pub const ROOT_PARENT_CODE: &str = "root";

pub struct TermRelationsImporter {
    repo: CatalogueRepository,
    catalogue_id: i64,
    new_codes: NewCodeSet,
    hierarchies: Vec<(i64, Hierarchy)>,
    attributes: Vec<(i64, Attribute)>,
    parents_committed: usize,
    attributes_committed: usize,
}

impl TermRelationsImporter {
    /// # 参数
    /// - new_codes: 术语页完成后冻结的新代码集合
    pub fn new(
        repo: CatalogueRepository,
        catalogue: &Catalogue,
        new_codes: NewCodeSet,
    ) -> ImportResult<Self> {
        let catalogue_id = catalogue
            .id
            .ok_or_else(|| ImportError::InternalError(format!("目录 {} 尚未落库", catalogue)))?;

        let hierarchies = repo
            .list_hierarchies(catalogue_id)?
            .into_iter()
            .filter_map(|h| h.id.map(|id| (id, h)))
            .collect::<Vec<_>>();
        let attributes = repo
            .list_attributes(catalogue_id)?
            .into_iter()
            .filter_map(|a| a.id.map(|id| (id, a)))
            .collect::<Vec<_>>();

        info!(
            hierarchies = hierarchies.len(),
            attributes = attributes.len(),
            new_codes = new_codes.len(),
            "术语关系导入器已就绪"
        );

        Ok(Self {
            repo,
            catalogue_id,
            new_codes,
            hierarchies,
            attributes,
            parents_committed: 0,
            attributes_committed: 0,
        })
    }

    pub fn parents_committed(&self) -> usize {
        self.parents_committed
    }

    pub fn attributes_committed(&self) -> usize {
        self.attributes_committed
    }

    /// 解析术语代码：新代码集合 → 目标存储
    fn resolve(&self, row: usize, code: &str) -> ImportResult<i64> {
        if let Some(id) = self.new_codes.get(code) {
            return Ok(id);
        }
        self.repo
            .find_term_id(self.catalogue_id, code)?
            .ok_or_else(|| ImportError::DanglingReference {
                row,
                code: code.to_string(),
            })
    }

    fn parse_row(
        &self,
        row: &Row,
        parents: &mut Vec<TermParent>,
        attributes: &mut Vec<TermAttribute>,
    ) -> ImportResult<i64> {
        let code = required_text(row, "termCode")?;
        let term_id = self.resolve(row.row_number, &code)?;

        for (hierarchy_id, hierarchy) in &self.hierarchies {
            if !flag_or(row, &hierarchy.flag_column(), false)? {
                continue;
            }

            let parent_term_id = match row.text(&hierarchy.parent_column()) {
                None => None,
                Some(parent) if parent.eq_ignore_ascii_case(ROOT_PARENT_CODE) => None,
                Some(parent) => Some(self.resolve(row.row_number, &parent)?),
            };

            parents.push(TermParent {
                term_id,
                hierarchy_id: *hierarchy_id,
                parent_term_id,
                order: int_opt(row, &hierarchy.order_column())?.unwrap_or(row.row_number as i64),
                reportable: flag_or(row, &hierarchy.reportable_column(), true)?,
            });
        }

        for (attribute_id, attribute) in &self.attributes {
            let Some(raw) = row.text(&attribute.code) else {
                continue;
            };
            let values = if attribute.is_repeatable() {
                split_multi(&raw)
            } else {
                vec![raw]
            };
            for (i, value) in values.into_iter().enumerate() {
                attributes.push(TermAttribute {
                    term_id,
                    attribute_id: *attribute_id,
                    value,
                    value_order: i as i64 + 1,
                });
            }
        }

        Ok(term_id)
    }
}

impl SheetImporter for TermRelationsImporter {
    fn sheet_kind(&self) -> SheetKind {
        SheetKind::TermRelations
    }

    fn required_columns(&self) -> Vec<String> {
        let mut columns = vec!["termCode".to_string()];
        columns.extend(self.hierarchies.iter().map(|(_, h)| h.flag_column()));
        columns
    }

    fn import_data(&mut self, batch: &RowBatch) -> ImportResult<usize> {
        let mut term_ids = Vec::with_capacity(batch.len());
        let mut parents = Vec::new();
        let mut attributes = Vec::new();

        for row in &batch.rows {
            term_ids.push(self.parse_row(row, &mut parents, &mut attributes)?);
        }

        let (parent_count, attribute_count) =
            self.repo
                .replace_term_relations(&term_ids, &parents, &attributes)?;
        self.parents_committed += parent_count;
        self.attributes_committed += attribute_count;

        debug!(
            batch = batch.index,
            parents = parent_count,
            attributes = attribute_count,
            "术语关系批次已提交"
        );
        Ok(parent_count + attribute_count)
    }
}
