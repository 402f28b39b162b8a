// ==========================================
// 目录工作簿导入 - 目录页导入器
// ==========================================
// 输入: catalogue 工作表的第一行（目录身份 + 版本 + 发布说明）
// 输出: 已解析的 Catalogue 与工作簿自身的目录代码
// 本地目录: 复用已打开的目录记录，不新建目录行
// ==========================================

use crate::domain::catalogue::{Catalogue, ReleaseNote};
use crate::domain::sheet::{Row, RowBatch};
use crate::domain::types::{CatalogueMode, SheetKind};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::sheet_importer::{flag_or, int_opt, required_text, SheetImporter};
use crate::repository::CatalogueRepository;
use tracing::{info, warn};

pub struct CatalogueSheetImporter {
    repo: CatalogueRepository,
    opened: Option<Catalogue>,
    resolved: Option<Catalogue>,
    excel_code: Option<String>,
}

impl CatalogueSheetImporter {
    /// # 参数
    /// - repo: 目标存储
    /// - opened: 已打开的本地目录（本地导入时传入）
    pub fn new(repo: CatalogueRepository, opened: Option<Catalogue>) -> Self {
        Self {
            repo,
            opened,
            resolved: None,
            excel_code: None,
        }
    }

    /// 结束目录页，返回 (已解析目录, 工作簿目录代码)
    pub fn finish(self) -> ImportResult<(Catalogue, String)> {
        match (self.resolved, self.excel_code) {
            (Some(catalogue), Some(code)) => Ok((catalogue, code)),
            _ => Err(ImportError::schema(SheetKind::Catalogue, "目录页没有数据行")),
        }
    }

    fn parse_row(&self, row: &Row) -> ImportResult<Catalogue> {
        let code = required_text(row, "code")?;
        let version = required_text(row, "version")?;

        let mut catalogue = Catalogue::new(code, version, CatalogueMode::Distributed);
        catalogue.name = row.text("name");
        catalogue.label = row.text("label");
        catalogue.scope_note = row.text("scopeNote");
        catalogue.term_code_mask = row.text("termCodeMask");
        catalogue.term_code_length = int_opt(row, "termCodeLength")?;
        catalogue.term_min_code = row.text("termMinCode");
        catalogue.accept_non_standard_codes = flag_or(row, "acceptNonStandardCodes", false)?;
        catalogue.generate_missing_codes = flag_or(row, "generateMissingCodes", false)?;
        catalogue.status = row.text("status");
        catalogue.deprecated = flag_or(row, "deprecated", false)?;

        let note = ReleaseNote {
            description: row.text("releaseNoteDescription"),
            date: row.text("releaseNoteDate"),
            version: row.text("releaseNoteVersion"),
            internal_version: row.text("releaseNoteInternalVersion"),
        };
        if !note.is_empty() {
            catalogue.release_note = Some(note);
        }
        Ok(catalogue)
    }

    /// 本地目录: 以已打开的记录为准（仅沿用工作簿中的发布说明）
    fn reconcile_local(&self, opened: &Catalogue, parsed: &Catalogue) -> ImportResult<Catalogue> {
        let mut local = match opened.id {
            Some(_) => opened.clone(),
            None => self
                .repo
                .find_catalogue(&opened.code, &opened.version)?
                .ok_or_else(|| {
                    ImportError::ReferenceError(format!("已打开的本地目录 {} 不在存储中", opened))
                })?,
        };
        local.mode = CatalogueMode::Local;
        local.release_note = parsed.release_note.clone();

        if local.code != parsed.code {
            info!(
                local = %local,
                workbook_code = %parsed.code,
                "本地目录导入: 工作簿目录代码与本地目录不同，沿用本地身份"
            );
        }
        Ok(local)
    }
}

impl SheetImporter for CatalogueSheetImporter {
    fn sheet_kind(&self) -> SheetKind {
        SheetKind::Catalogue
    }

    fn required_columns(&self) -> Vec<String> {
        vec!["code".to_string(), "version".to_string()]
    }

    fn import_data(&mut self, batch: &RowBatch) -> ImportResult<usize> {
        if self.resolved.is_some() {
            warn!(rows = batch.len(), "目录页仅读取第一行，其余行忽略");
            return Ok(0);
        }
        let Some(row) = batch.rows.first() else {
            return Ok(0);
        };
        if batch.len() > 1 {
            warn!(rows = batch.len(), "目录页仅读取第一行，其余行忽略");
        }

        let parsed = self.parse_row(row)?;
        self.excel_code = Some(parsed.code.clone());

        let (catalogue, committed) = match &self.opened {
            Some(opened) => (self.reconcile_local(opened, &parsed)?, 0),
            None => {
                if self.repo.find_catalogue(&parsed.code, &parsed.version)?.is_some() {
                    return Err(ImportError::ReferenceError(format!(
                        "目录 {} 已存在于目标存储",
                        parsed
                    )));
                }
                let mut catalogue = parsed;
                catalogue.db_path = Some(self.repo.db_path().to_string());
                catalogue.id = Some(self.repo.insert_catalogue(&catalogue)?);
                (catalogue, 1)
            }
        };

        info!(catalogue = %catalogue, mode = %catalogue.mode, "目录已解析");
        self.resolved = Some(catalogue);
        Ok(committed)
    }
}
