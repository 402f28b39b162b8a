// ==========================================
// 目录工作簿导入 - 术语页导入器
// ==========================================
// 大表: 经批处理流水线逐批落库
// 每批事务提交后，将新插入的代码追加到新代码集合
// ==========================================

use crate::domain::catalogue::{Catalogue, Term};
use crate::domain::sheet::{Row, RowBatch};
use crate::domain::types::SheetKind;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::new_code_tracker::NewCodeTracker;
use crate::importer::sheet_importer::{flag_or, required_text, SheetImporter};
use crate::repository::CatalogueRepository;
use tracing::debug;

pub struct TermSheetImporter {
    repo: CatalogueRepository,
    catalogue_id: i64,
    tracker: NewCodeTracker,
    committed: usize,
}

impl TermSheetImporter {
    pub fn new(repo: CatalogueRepository, catalogue: &Catalogue) -> ImportResult<Self> {
        let catalogue_id = catalogue
            .id
            .ok_or_else(|| ImportError::InternalError(format!("目录 {} 尚未落库", catalogue)))?;
        Ok(Self {
            repo,
            catalogue_id,
            tracker: NewCodeTracker::new(),
            committed: 0,
        })
    }

    pub fn committed(&self) -> usize {
        self.committed
    }

    pub fn tracker(&self) -> &NewCodeTracker {
        &self.tracker
    }

    /// 术语页完成后交出新代码集合
    pub fn into_tracker(self) -> NewCodeTracker {
        self.tracker
    }

    fn parse_row(row: &Row) -> ImportResult<Term> {
        Ok(Term {
            id: None,
            code: required_text(row, "termCode")?,
            extended_name: row.text("termExtendedName"),
            short_name: row.text("termShortName"),
            scope_note: row.text("termScopeNote"),
            scope_note_links: row.text("termScopeNoteLinks"),
            term_type: row.text("termType"),
            status: row.text("status"),
            deprecated: flag_or(row, "deprecated", false)?,
            version: row.text("version"),
            last_update: row.text("lastUpdate"),
            valid_from: row.text("validFrom"),
            valid_to: row.text("validTo"),
        })
    }
}

impl SheetImporter for TermSheetImporter {
    fn sheet_kind(&self) -> SheetKind {
        SheetKind::Term
    }

    fn required_columns(&self) -> Vec<String> {
        vec!["termCode".to_string()]
    }

    fn import_data(&mut self, batch: &RowBatch) -> ImportResult<usize> {
        let terms = batch
            .rows
            .iter()
            .map(Self::parse_row)
            .collect::<ImportResult<Vec<_>>>()?;

        let stored = self.repo.upsert_terms(self.catalogue_id, &terms)?;
        let new_codes = self.tracker.record(&stored);
        self.committed += stored.len();

        debug!(
            batch = batch.index,
            committed = stored.len(),
            new_codes,
            "术语批次已提交"
        );
        Ok(stored.len())
    }
}
