// ==========================================
// 目录工作簿导入端到端测试
// ==========================================
// 测试目标: 完整导入流程、可选发布说明页、两次独立运行计数一致、
//           持久化失败标记未完成、结构/引用错误中止
// ==========================================


use catalogue_import::app::{CatalogueSession, SessionEvent};
use catalogue_import::config::ImportConfig;
use catalogue_import::domain::{ImportCounts, ImportRunStatus, SheetKind};
use catalogue_import::importer::{CatalogueWorkbookImporter, ImportError, ProgressReporter};
use catalogue_import::{i18n, logging};
use catalogue_import::repository::{
    CataloguePreferenceRepository, CatalogueRepository, ImportRunRepository,
};
use std::sync::{Arc, Mutex};
use test_helpers::{create_test_db, write_raw_sheet, WorkbookBuilder};

fn expected_counts(terms: usize) -> ImportCounts {
    ImportCounts {
        hierarchies: 2,
        attributes: 2,
        term_types: 2,
        terms,
        new_terms: terms,
        term_parents: terms + 1,
        term_attributes: terms * 3,
        release_notes: 1,
        release_note_operations: 2,
    }
}

fn importer(db_path: &str, batch_size: usize) -> (CatalogueRepository, CatalogueWorkbookImporter) {
    let repo = CatalogueRepository::new(db_path).unwrap();
    let importer = CatalogueWorkbookImporter::new(
        repo.clone(),
        ImportConfig::default().with_batch_size(batch_size),
    );
    (repo, importer)
}

/// 记录进度的上报者
#[derive(Default)]
struct RecordingProgress {
    ticks: Mutex<Vec<(u32, String)>>,
    closed: Mutex<usize>,
}

impl RecordingProgress {
    fn amounts(&self) -> Vec<u32> {
        self.ticks.lock().unwrap().iter().map(|(n, _)| *n).collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn tick(&self, amount: u32, label: &str) {
        self.ticks.lock().unwrap().push((amount, label.to_string()));
    }

    fn close(&self) {
        *self.closed.lock().unwrap() += 1;
    }
}

#[tokio::test]
async fn test_full_import_reaches_done() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let workbook = WorkbookBuilder::new(250).build();

    let progress = Arc::new(RecordingProgress::default());
    let (repo, importer) = importer(&db_path, 100);
    let importer = importer.with_progress(progress.clone());

    let outcome = importer.import_workbook(workbook.path()).await.unwrap();

    assert_eq!(outcome.counts, expected_counts(250));
    assert!(outcome.notes_warning.is_none());
    assert_eq!(outcome.catalogue.code, "MTX");

    let catalogue_id = outcome.catalogue.id.unwrap();
    assert!(repo.is_import_complete(catalogue_id).unwrap());

    let stored = repo.count_entities(catalogue_id).unwrap();
    assert_eq!(stored.terms, 250);
    assert_eq!(stored.term_parents, 251);

    let runs = ImportRunRepository::new(repo.connection());
    let run = runs.get_run(&outcome.run_id).unwrap();
    assert_eq!(run.status, ImportRunStatus::Completed);
    assert_eq!(run.catalogue_id, Some(catalogue_id));

    let prefs = CataloguePreferenceRepository::new(repo.connection());
    assert_eq!(
        prefs.get_preference(catalogue_id, "minSearchChar").unwrap().as_deref(),
        Some("3")
    );

    assert_eq!(progress.amounts(), vec![1, 1, 2, 2, 15, 25, 5]);
    assert_eq!(*progress.closed.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_missing_notes_sheet_is_recoverable() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let workbook = WorkbookBuilder::new(20).without_notes().build();

    let (repo, importer) = importer(&db_path, 7);
    let outcome = importer.import_workbook(workbook.path()).await.unwrap();

    assert!(outcome.notes_warning.is_some());
    assert_eq!(outcome.counts.release_notes, 0);
    assert_eq!(outcome.counts.release_note_operations, 0);
    assert_eq!(outcome.counts.terms, 20);

    let catalogue_id = outcome.catalogue.id.unwrap();
    assert!(repo.is_import_complete(catalogue_id).unwrap());
    let stored = repo.count_entities(catalogue_id).unwrap();
    assert_eq!(stored.release_notes, 0);
    assert_eq!(stored.release_note_operations, 0);
}

#[tokio::test]
async fn test_two_fresh_runs_yield_identical_counts() {
    logging::init_test();
    let workbook = WorkbookBuilder::new(120).build();

    let (_tmp1, db1) = create_test_db().unwrap();
    let (_tmp2, db2) = create_test_db().unwrap();

    let (repo1, first) = importer(&db1, 50);
    let (repo2, second) = importer(&db2, 50);
    let a = first.import_workbook(workbook.path()).await.unwrap();
    let b = second.import_workbook(workbook.path()).await.unwrap();

    assert_eq!(a.counts, b.counts);
    assert_eq!(
        repo1.count_entities(a.catalogue.id.unwrap()).unwrap(),
        repo2.count_entities(b.catalogue.id.unwrap()).unwrap()
    );
}

#[tokio::test]
async fn test_direct_path_matches_pipelined_path() {
    logging::init_test();
    let workbook = WorkbookBuilder::new(64).build();

    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = CatalogueRepository::new(&db_path).unwrap();
    let importer = CatalogueWorkbookImporter::new(
        repo,
        ImportConfig::default().with_batch_size(10).with_pipeline(false),
    );

    let outcome = importer.import_workbook(workbook.path()).await.unwrap();
    assert_eq!(outcome.counts, expected_counts(64));
}

#[tokio::test]
async fn test_persistence_failure_marks_destination_incomplete() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let workbook = WorkbookBuilder::new(250).build();

    let (repo, importer) = importer(&db_path, 100);
    {
        let conn = repo.connection();
        let conn = conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TRIGGER fail_term_150 BEFORE INSERT ON term
            WHEN NEW.code = 'T0150'
            BEGIN
                SELECT RAISE(ABORT, 'forced write failure');
            END;
            "#,
        )
        .unwrap();
    }

    let session = Arc::new(CatalogueSession::new());
    let mut events = session.subscribe();
    let importer = importer.with_session(session);

    let err = importer.import_workbook(workbook.path()).await.unwrap_err();

    assert!(err.is_persistence());
    assert_eq!(err.sheet(), Some(SheetKind::Term));
    assert_eq!(err.batch(), Some(2));

    // 第二批整体回滚；第一批已提交
    let catalogue = repo.find_catalogue("MTX", "1.0").unwrap().unwrap();
    let catalogue_id = catalogue.id.unwrap();
    assert!(!repo.is_import_complete(catalogue_id).unwrap());
    assert_eq!(repo.count_entities(catalogue_id).unwrap().terms, 100);

    let runs = ImportRunRepository::new(repo.connection());
    assert_eq!(runs.latest_status().unwrap(), Some(ImportRunStatus::Incomplete));

    let (stage, batch): (String, Option<i64>) = {
        let conn = repo.connection();
        let conn = conn.lock().unwrap();
        conn.query_row(
            "SELECT failed_stage, failed_batch FROM import_run ORDER BY rowid DESC LIMIT 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
    };
    assert_eq!(stage, "TERM");
    assert_eq!(batch, Some(2));

    // 失败时不写默认偏好
    let prefs = CataloguePreferenceRepository::new(repo.connection());
    assert!(prefs.get_preference(catalogue_id, "minSearchChar").unwrap().is_none());

    match events.recv().await.unwrap() {
        SessionEvent::ImportAborted { stage, batch, .. } => {
            assert_eq!(stage, "TERM");
            assert_eq!(batch, Some(2));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_required_column_aborts_with_schema_error() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let workbook = WorkbookBuilder::new(10).drop_term_column("reportFlag").build();

    let (repo, importer) = importer(&db_path, 5);
    let err = importer.import_workbook(workbook.path()).await.unwrap_err();

    assert_eq!(err.sheet(), Some(SheetKind::TermRelations));
    assert!(matches!(err.root(), ImportError::SchemaError { .. }));

    // 术语页已提交，但目录保持未完成
    let catalogue = repo.find_catalogue("MTX", "1.0").unwrap().unwrap();
    assert!(!repo.is_import_complete(catalogue.id.unwrap()).unwrap());
    assert_eq!(repo.count_entities(catalogue.id.unwrap()).unwrap().term_parents, 0);
}

#[tokio::test]
async fn test_progress_ticks_announce_the_stage_about_to_run() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let workbook = WorkbookBuilder::new(10).drop_term_column("reportFlag").build();

    let progress = Arc::new(RecordingProgress::default());
    let (_repo, importer) = importer(&db_path, 5);
    let importer = importer.with_progress(progress.clone());
    importer.import_workbook(workbook.path()).await.unwrap_err();

    // 术语关系阶段在表头校验时失败，但其进度已在阶段开始时上报
    assert_eq!(progress.amounts(), vec![1, 1, 2, 2, 15, 25]);
    let ticks = progress.ticks.lock().unwrap();
    assert_eq!(ticks[4].1, i18n::progress_label(SheetKind::Term));
    assert_eq!(ticks[5].1, i18n::progress_label(SheetKind::TermRelations));
    assert_eq!(*progress.closed.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_master_code_mismatch_is_reference_error() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let workbook = WorkbookBuilder::new(10).master_code("OTHER").build();

    let (repo, importer) = importer(&db_path, 5);
    let err = importer.import_workbook(workbook.path()).await.unwrap_err();

    assert_eq!(err.sheet(), Some(SheetKind::Hierarchy));
    assert!(matches!(err.root(), ImportError::ReferenceError(_)));

    let catalogue = repo.find_catalogue("MTX", "1.0").unwrap().unwrap();
    assert_eq!(repo.count_entities(catalogue.id.unwrap()).unwrap().terms, 0);
}

#[tokio::test]
async fn test_missing_mandatory_sheet_is_fatal() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let workbook = WorkbookBuilder::new(10).build();
    std::fs::remove_file(workbook.path().join("attribute.csv")).unwrap();

    let (_repo, importer) = importer(&db_path, 5);
    let err = importer.import_workbook(workbook.path()).await.unwrap_err();

    assert_eq!(err.sheet(), Some(SheetKind::Attribute));
    assert!(matches!(err.root(), ImportError::SheetNotFound(_)));
    assert!(!err.is_recoverable_absence());
}

#[tokio::test]
async fn test_malformed_source_fails_before_any_sheet() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("catalogue.xlsx");
    std::fs::write(&bogus, b"not a zip archive").unwrap();

    let (repo, importer) = importer(&db_path, 5);
    let err = importer.import_workbook(&bogus).await.unwrap_err();

    assert!(matches!(err.root(), ImportError::FormatError(_)));
    assert_eq!(repo.count_catalogues().unwrap(), 0);

    let runs = ImportRunRepository::new(repo.connection());
    assert_eq!(runs.latest_status().unwrap(), Some(ImportRunStatus::Incomplete));
}

#[tokio::test]
async fn test_blank_rows_are_skipped() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let workbook = WorkbookBuilder::new(3).without_notes().build();
    write_raw_sheet(
        workbook.path(),
        "releaseNotes",
        "operationName,operationDate\n,\nADD,2024-02-01\n\n,\n",
    );

    let (_repo, importer) = importer(&db_path, 2);
    let outcome = importer.import_workbook(workbook.path()).await.unwrap();
    assert_eq!(outcome.counts.release_notes, 1);
    assert_eq!(outcome.counts.release_note_operations, 1);
    assert!(outcome.notes_warning.is_none());
}
