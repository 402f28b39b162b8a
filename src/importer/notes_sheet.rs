// ==========================================
// 目录工作簿导入 - 发布说明导入器
// ==========================================
// 可选阶段: 目录级发布说明来自目录页；操作记录来自 releaseNotes 工作表
// releaseNotes 工作表缺失属于可恢复的缺失
// ==========================================

use crate::domain::catalogue::{Catalogue, ReleaseNoteOperation};
use crate::domain::sheet::{Row, RowBatch};
use crate::domain::types::SheetKind;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_importer::{int_opt, required_text, SheetImporter};
use crate::repository::CatalogueRepository;
use tracing::debug;

pub struct NotesSheetImporter {
    repo: CatalogueRepository,
    catalogue: Catalogue,
    catalogue_id: i64,
    operations_committed: usize,
}

impl NotesSheetImporter {
    pub fn new(repo: CatalogueRepository, catalogue: &Catalogue) -> ImportResult<Self> {
        let catalogue_id = catalogue
            .id
            .ok_or_else(|| ImportError::InternalError(format!("目录 {} 尚未落库", catalogue)))?;
        Ok(Self {
            repo,
            catalogue: catalogue.clone(),
            catalogue_id,
            operations_committed: 0,
        })
    }

    /// 写入目录级发布说明
    ///
    /// # 返回
    /// - 写入条数（目录页未提供说明时为 0）
    pub fn import_catalogue_note(&self) -> ImportResult<usize> {
        match &self.catalogue.release_note {
            Some(note) if !note.is_empty() => {
                self.repo.insert_release_note(self.catalogue_id, note)?;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    pub fn operations_committed(&self) -> usize {
        self.operations_committed
    }

    fn parse_row(row: &Row) -> ImportResult<ReleaseNoteOperation> {
        Ok(ReleaseNoteOperation {
            name: required_text(row, "operationName")?,
            date: row.text("operationDate"),
            info: row.text("operationInfo"),
            group_id: int_opt(row, "operationGroupId")?,
        })
    }
}

impl SheetImporter for NotesSheetImporter {
    fn sheet_kind(&self) -> SheetKind {
        SheetKind::Notes
    }

    fn required_columns(&self) -> Vec<String> {
        vec!["operationName".to_string()]
    }

    fn import_data(&mut self, batch: &RowBatch) -> ImportResult<usize> {
        let operations = batch
            .rows
            .iter()
            .map(Self::parse_row)
            .collect::<ImportResult<Vec<_>>>()?;

        let count = self
            .repo
            .insert_release_note_operations(self.catalogue_id, &operations)?;
        self.operations_committed += count;
        debug!(batch = batch.index, committed = count, "发布说明操作批次已提交");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalogue::ReleaseNote;
    use crate::domain::sheet::CellValue;
    use crate::domain::types::CatalogueMode;
    use rusqlite::Connection;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_catalogue_note_and_operations() {
        let conn = Connection::open_in_memory().unwrap();
        let repo =
            CatalogueRepository::from_connection(Arc::new(Mutex::new(conn)), ":memory:").unwrap();
        let mut cat = Catalogue::new("MTX", "1.0", CatalogueMode::Distributed);
        cat.id = Some(repo.insert_catalogue(&cat).unwrap());
        cat.release_note = Some(ReleaseNote {
            description: Some("initial".into()),
            date: None,
            version: Some("1.0".into()),
            internal_version: None,
        });

        let mut importer = NotesSheetImporter::new(repo.clone(), &cat).unwrap();
        assert_eq!(importer.import_catalogue_note().unwrap(), 1);

        let mut values = HashMap::new();
        values.insert("operationName".to_string(), CellValue::Text("ADD".into()));
        values.insert("operationGroupId".to_string(), CellValue::Number(4.0));
        let batch = RowBatch::new(SheetKind::Notes, 1, vec![Row::new(2, values)]);
        assert_eq!(importer.import_data(&batch).unwrap(), 1);

        let counts = repo.count_entities(cat.id.unwrap()).unwrap();
        assert_eq!(counts.release_notes, 1);
        assert_eq!(counts.release_note_operations, 1);
    }
}
