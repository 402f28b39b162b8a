// ==========================================
// 目录工作簿导入 - 导入编排器
// ==========================================
// 状态机: CATALOGUE → HIERARCHY → ATTRIBUTE(+术语类型) → TERM（流水线）
//         → TERM_RELATIONS（流水线，术语页全部提交后）→ NOTES（可选）→ DONE
// 任一非 NOTES 阶段致命失败 → ABORTED：不再处理后续工作表，运行与目录标记为未完成
// 工作表严格逐张处理；目标存储同一时刻只有一个写入方
// ==========================================

use crate::app::session::{CatalogueSession, SessionEvent};
use crate::config::ImportConfig;
use crate::domain::catalogue::{Catalogue, ImportCounts};
use crate::domain::types::{ImportStage, SheetKind};
use crate::i18n::{progress_label, t, t_with_args};
use crate::importer::attribute_sheet::AttributeSheetImporter;
use crate::importer::batch_pipeline::{run_pipelined, run_sequential, PipelineReport};
use crate::importer::catalogue_sheet::CatalogueSheetImporter;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::hierarchy_sheet::HierarchySheetImporter;
use crate::importer::notes_sheet::NotesSheetImporter;
use crate::importer::progress::{NoOpProgress, ProgressReporter};
use crate::importer::sheet_importer::SheetImporter;
use crate::importer::term_relations_sheet::TermRelationsImporter;
use crate::importer::term_sheet::TermSheetImporter;
use crate::importer::workbook_reader::WorkbookReader;
use crate::repository::{CataloguePreferenceRepository, CatalogueRepository, ImportRunRepository};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// 各阶段进度权重（阶段开始前上报）
const TICK_READING: u32 = 1;
const TICK_CATALOGUE: u32 = 1;
const TICK_HIERARCHY: u32 = 2;
const TICK_ATTRIBUTE: u32 = 2;
const TICK_TERM: u32 = 15;
const TICK_TERM_RELATIONS: u32 = 25;
const TICK_NOTES: u32 = 5;

/// 导入成功的结果
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub run_id: String,
    pub catalogue: Catalogue,
    pub counts: ImportCounts,
    /// 发布说明阶段的非致命问题（工作表缺失等）
    pub notes_warning: Option<String>,
    pub elapsed_ms: u64,
}

/// 单次运行的状态
struct RunState {
    stage: ImportStage,
    catalogue: Option<Catalogue>,
    counts: ImportCounts,
    notes_warning: Option<String>,
}

impl RunState {
    fn new() -> Self {
        Self {
            stage: ImportStage::Catalogue,
            catalogue: None,
            counts: ImportCounts::default(),
            notes_warning: None,
        }
    }

    fn advance(&mut self, next: ImportStage) -> ImportResult<()> {
        if !self.stage.can_transition_to(next) {
            return Err(ImportError::InternalError(format!(
                "非法的阶段迁移: {} → {}",
                self.stage, next
            )));
        }
        info!(from = %self.stage, to = %next, "导入阶段迁移");
        self.stage = next;
        Ok(())
    }

    fn catalogue(&self) -> ImportResult<&Catalogue> {
        self.catalogue
            .as_ref()
            .ok_or_else(|| ImportError::InternalError("目录尚未解析".to_string()))
    }
}

// ==========================================
// CatalogueWorkbookImporter
// ==========================================
pub struct CatalogueWorkbookImporter {
    repo: CatalogueRepository,
    runs: ImportRunRepository,
    preferences: CataloguePreferenceRepository,
    config: ImportConfig,
    opened: Option<Catalogue>,
    progress: Arc<dyn ProgressReporter>,
    session: Option<Arc<CatalogueSession>>,
}

impl CatalogueWorkbookImporter {
    pub fn new(repo: CatalogueRepository, config: ImportConfig) -> Self {
        let conn = repo.connection();
        Self {
            runs: ImportRunRepository::new(conn.clone()),
            preferences: CataloguePreferenceRepository::new(conn),
            repo,
            config,
            opened: None,
            progress: NoOpProgress::shared(),
            session: None,
        }
    }

    /// 以已打开的本地目录为导入目标
    pub fn with_opened_catalogue(mut self, catalogue: Catalogue) -> Self {
        self.opened = Some(catalogue);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// 绑定会话：发布导入事件；未显式指定目标时沿用会话中的本地目录
    pub fn with_session(mut self, session: Arc<CatalogueSession>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// 导入工作簿
    ///
    /// # 参数
    /// - path: 工作簿文件或 CSV 目录
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 已解析目录 + 各实体提交数
    /// - Err: 首个致命错误（带工作表与批次序号）；运行已标记为未完成
    pub async fn import_workbook<P: AsRef<Path>>(&self, path: P) -> ImportResult<ImportOutcome> {
        self.run(path.as_ref()).await
    }

    #[instrument(skip_all, fields(source = %path.display()))]
    async fn run(&self, path: &Path) -> ImportResult<ImportOutcome> {
        self.config.validate()?;

        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        self.runs.begin_run(&run_id, &path.to_string_lossy())?;
        info!(run_id = %run_id, batch_size = self.config.batch_size, "导入开始");

        let mut state = RunState::new();
        let result = match self.run_stages(path, &run_id, &mut state).await {
            Ok(()) => self.finish(&run_id, &mut state),
            Err(e) => Err(e),
        };

        match result {
            Ok(catalogue) => {
                let outcome = ImportOutcome {
                    run_id: run_id.clone(),
                    catalogue,
                    counts: state.counts,
                    notes_warning: state.notes_warning.take(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                };
                info!(
                    run_id = %run_id,
                    catalogue = %outcome.catalogue,
                    total = outcome.counts.total(),
                    elapsed_ms = outcome.elapsed_ms,
                    "{}",
                    t_with_args("import.finished", &[("catalogue", &outcome.catalogue.to_string())])
                );
                Ok(outcome)
            }
            Err(e) => {
                self.abort(&run_id, &mut state, &e);
                Err(e)
            }
        }
    }

    async fn run_stages(&self, path: &Path, run_id: &str, state: &mut RunState) -> ImportResult<()> {
        self.progress.tick(TICK_READING, &t("progress.reading_data"));
        // 读取器在任何退出路径上都会关闭（显式 close 或 Drop）
        let mut reader = WorkbookReader::open(path, self.config.batch_size)?;

        // ===== CATALOGUE =====
        self.progress.tick(TICK_CATALOGUE, &progress_label(SheetKind::Catalogue));
        let opened = self.opened_catalogue();
        let mut importer = CatalogueSheetImporter::new(self.repo.clone(), opened);
        import_small(&mut reader, &mut importer)?;
        let (catalogue, excel_code) = importer.finish().map_err(|e| e.at(SheetKind::Catalogue, None))?;
        if let Some(id) = catalogue.id {
            self.runs.attach_catalogue(run_id, id)?;
            self.repo.set_import_state(id, false)?;
        }
        state.catalogue = Some(catalogue);
        state.advance(ImportStage::Hierarchy)?;

        // ===== HIERARCHY =====
        self.progress.tick(TICK_HIERARCHY, &progress_label(SheetKind::Hierarchy));
        let mut importer = HierarchySheetImporter::new(self.repo.clone(), state.catalogue()?, &excel_code)
            .map_err(|e| e.at(SheetKind::Hierarchy, None))?;
        import_small(&mut reader, &mut importer)?;
        state.counts.hierarchies = importer.finish().map_err(|e| e.at(SheetKind::Hierarchy, None))?;
        state.advance(ImportStage::Attribute)?;

        // ===== ATTRIBUTE (+ 术语类型) =====
        self.progress.tick(TICK_ATTRIBUTE, &progress_label(SheetKind::Attribute));
        let mut importer = AttributeSheetImporter::new(self.repo.clone(), state.catalogue()?)
            .map_err(|e| e.at(SheetKind::Attribute, None))?;
        import_small(&mut reader, &mut importer)?;
        state.counts.attributes = importer.committed();
        state.counts.term_types = importer
            .link_term_types()
            .map_err(|e| e.at(SheetKind::Attribute, None))?;
        state.advance(ImportStage::Term)?;

        // ===== TERM =====
        self.progress.tick(TICK_TERM, &progress_label(SheetKind::Term));
        let importer = TermSheetImporter::new(self.repo.clone(), state.catalogue()?)
            .map_err(|e| e.at(SheetKind::Term, None))?;
        prepare_sheet(&mut reader, &importer)?;
        let (mut reader, importer) = self.import_heavy(reader, importer).await?;
        state.counts.terms = importer.committed();
        let tracker = importer.into_tracker();
        state.counts.new_terms = tracker.len();
        // 术语页全部提交后才冻结，术语关系阶段看到的是完整集合
        let new_codes = tracker.freeze();
        state.advance(ImportStage::TermRelations)?;

        // ===== TERM_RELATIONS =====
        self.progress
            .tick(TICK_TERM_RELATIONS, &progress_label(SheetKind::TermRelations));
        let importer = TermRelationsImporter::new(self.repo.clone(), state.catalogue()?, new_codes)
            .map_err(|e| e.at(SheetKind::TermRelations, None))?;
        prepare_sheet(&mut reader, &importer)?;
        let (mut reader, importer) = self.import_heavy(reader, importer).await?;
        state.counts.term_parents = importer.parents_committed();
        state.counts.term_attributes = importer.attributes_committed();
        state.advance(ImportStage::Notes)?;

        // ===== NOTES（不阻断） =====
        self.progress.tick(TICK_NOTES, &progress_label(SheetKind::Notes));
        if let Err(e) = self.import_notes(&mut reader, state) {
            let e = e.at(SheetKind::Notes, None);
            let warning = if e.is_recoverable_absence() {
                warn!(sheet = %SheetKind::Notes, "发布说明工作表缺失，跳过");
                t_with_args(
                    "import.sheet_not_found",
                    &[("sheet", SheetKind::Notes.sheet_name())],
                )
            } else {
                error!(sheet = %SheetKind::Notes, error = %e, "发布说明导入失败，继续完成导入");
                e.to_string()
            };
            state.notes_warning = Some(warning);
        }

        reader.close();
        Ok(())
    }

    fn import_notes(&self, reader: &mut WorkbookReader, state: &mut RunState) -> ImportResult<()> {
        let mut importer = NotesSheetImporter::new(self.repo.clone(), state.catalogue()?)?;
        // 目录发布说明随发布说明页一起写入；该页缺失时不写
        prepare_sheet(reader, &importer)?;
        state.counts.release_notes = importer.import_catalogue_note()?;
        run_sequential(reader, &mut importer)?;
        state.counts.release_note_operations = importer.operations_committed();
        Ok(())
    }

    /// 大表：配置开启时走流水线，否则顺序处理（均在 blocking 线程池执行）
    async fn import_heavy<I>(&self, reader: WorkbookReader, importer: I) -> ImportResult<(WorkbookReader, I)>
    where
        I: SheetImporter + 'static,
    {
        let sheet = importer.sheet_kind();
        if self.config.pipeline_heavy_sheets && sheet.is_heavy() {
            let run = run_pipelined(reader, importer).await?;
            return Ok((run.source, run.importer));
        }

        debug!(sheet = %sheet, "顺序处理");
        let (reader, importer, report) = tokio::task::spawn_blocking(move || {
            let mut reader = reader;
            let mut importer = importer;
            let report = run_sequential(&mut reader, &mut importer);
            (reader, importer, report)
        })
        .await?;
        report?;
        Ok((reader, importer))
    }

    fn opened_catalogue(&self) -> Option<Catalogue> {
        self.opened.clone().or_else(|| {
            self.session
                .as_ref()
                .and_then(|s| s.current())
                .filter(|c| c.is_local())
        })
    }

    /// 成功收尾：默认偏好与检索选项（不覆盖已有值）、标记完成
    fn finish(&self, run_id: &str, state: &mut RunState) -> ImportResult<Catalogue> {
        let catalogue = state.catalogue()?.clone();
        let catalogue_id = catalogue
            .id
            .ok_or_else(|| ImportError::InternalError("目录尚未落库".to_string()))?;

        let preferences = self.preferences.insert_default_preferences(catalogue_id)?;
        let search_options = self.preferences.insert_default_search_options(catalogue_id)?;
        self.repo.set_import_state(catalogue_id, true)?;
        self.runs.complete_run(run_id)?;
        state.advance(ImportStage::Done)?;
        info!(preferences, search_options, "默认偏好与检索选项已写入");

        self.progress.close();
        if let Some(session) = &self.session {
            if catalogue.is_local() {
                session.open(catalogue.clone());
            }
            session.publish(SessionEvent::ImportFinished {
                run_id: run_id.to_string(),
                catalogue: catalogue.clone(),
                counts: state.counts,
            });
        }
        Ok(catalogue)
    }

    /// 中止：运行与目录标记为未完成（标记失败只记录日志）
    fn abort(&self, run_id: &str, state: &mut RunState, err: &ImportError) {
        let stage = state.stage;
        error!(
            run_id = %run_id,
            stage = %stage,
            sheet = ?err.sheet(),
            batch = ?err.batch(),
            error = %err,
            "{}",
            t_with_args("import.aborted", &[("reason", &err.to_string())])
        );

        if let Err(e) = self
            .runs
            .mark_incomplete(run_id, stage, err.batch(), &err.to_string())
        {
            error!(run_id = %run_id, error = %e, "导入运行标记未完成失败");
        }
        if let Some(id) = state.catalogue.as_ref().and_then(|c| c.id) {
            if let Err(e) = self.repo.set_import_state(id, false) {
                error!(catalogue_id = id, error = %e, "目录标记未完成失败");
            }
        }
        if let Err(e) = state.advance(ImportStage::Aborted) {
            warn!(error = %e, "中止时阶段迁移异常");
        }

        self.progress.close();
        if let Some(session) = &self.session {
            session.publish(SessionEvent::ImportAborted {
                run_id: run_id.to_string(),
                stage: stage.to_string(),
                batch: err.batch(),
                message: err.to_string(),
            });
        }
    }
}

/// 选中工作表并在处理首行之前校验表头
fn prepare_sheet<I: SheetImporter + ?Sized>(
    reader: &mut WorkbookReader,
    importer: &I,
) -> ImportResult<()> {
    let sheet = importer.sheet_kind();
    reader.select_sheet(sheet).map_err(|e| e.at(sheet, None))?;
    importer
        .validate_header(reader.headers())
        .map_err(|e| e.at(sheet, None))
}

/// 小表：顺序处理
fn import_small<I: SheetImporter>(
    reader: &mut WorkbookReader,
    importer: &mut I,
) -> ImportResult<PipelineReport> {
    prepare_sheet(reader, importer)?;
    run_sequential(reader, importer)
}
