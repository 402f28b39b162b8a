// ==========================================
// 本地目录导入测试
// ==========================================
// 测试目标: 已打开的本地目录沿用身份、不覆盖已有偏好、
//           重复导入时已存在术语不计为新建
// ==========================================


use catalogue_import::app::{CatalogueSession, SessionEvent};
use catalogue_import::config::ImportConfig;
use catalogue_import::domain::{Catalogue, CatalogueMode};
use catalogue_import::importer::{CatalogueWorkbookImporter, ImportError};
use catalogue_import::logging;
use catalogue_import::repository::{CataloguePreferenceRepository, CatalogueRepository};
use std::sync::Arc;
use test_helpers::{create_test_db, WorkbookBuilder};

/// 在目标库中预先创建本地目录 MTX 1.0
fn open_local(repo: &CatalogueRepository, db_path: &str) -> Catalogue {
    let mut local = Catalogue::new("MTX", "1.0", CatalogueMode::Local);
    local.db_path = Some(db_path.to_string());
    local.id = Some(repo.insert_catalogue(&local).unwrap());
    local
}

#[tokio::test]
async fn test_opened_local_catalogue_keeps_identity() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = CatalogueRepository::new(&db_path).unwrap();
    let local = open_local(&repo, &db_path);

    let workbook = WorkbookBuilder::new(30).build();
    let importer = CatalogueWorkbookImporter::new(repo.clone(), ImportConfig::default().with_batch_size(8))
        .with_opened_catalogue(local.clone());
    let outcome = importer.import_workbook(workbook.path()).await.unwrap();

    assert_eq!(outcome.catalogue.id, local.id);
    assert!(outcome.catalogue.is_local());
    assert_eq!(repo.count_catalogues().unwrap(), 1);
    assert_eq!(outcome.counts.terms, 30);
    assert!(repo.is_import_complete(local.id.unwrap()).unwrap());
}

#[tokio::test]
async fn test_existing_preferences_are_not_overridden() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = CatalogueRepository::new(&db_path).unwrap();
    let local = open_local(&repo, &db_path);
    let catalogue_id = local.id.unwrap();

    let prefs = CataloguePreferenceRepository::new(repo.connection());
    prefs
        .set_preference(catalogue_id, "minSearchChar", "INTEGER", "5")
        .unwrap();

    let workbook = WorkbookBuilder::new(5).build();
    let importer = CatalogueWorkbookImporter::new(repo.clone(), ImportConfig::default())
        .with_opened_catalogue(local);
    importer.import_workbook(workbook.path()).await.unwrap();

    assert_eq!(
        prefs.get_preference(catalogue_id, "minSearchChar").unwrap().as_deref(),
        Some("5")
    );
}

#[tokio::test]
async fn test_reimport_does_not_count_existing_terms_as_new() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = CatalogueRepository::new(&db_path).unwrap();
    let local = open_local(&repo, &db_path);
    let workbook = WorkbookBuilder::new(12).build();

    let first = CatalogueWorkbookImporter::new(repo.clone(), ImportConfig::default().with_batch_size(5))
        .with_opened_catalogue(local.clone())
        .import_workbook(workbook.path())
        .await
        .unwrap();
    assert_eq!(first.counts.new_terms, 12);

    let second = CatalogueWorkbookImporter::new(repo.clone(), ImportConfig::default().with_batch_size(5))
        .with_opened_catalogue(local.clone())
        .import_workbook(workbook.path())
        .await
        .unwrap();

    assert_eq!(second.counts.terms, 12);
    assert_eq!(second.counts.new_terms, 0);
    // 关系按术语整体替换，不产生重复
    assert_eq!(second.counts.term_parents, 13);
    let stored = repo.count_entities(local.id.unwrap()).unwrap();
    assert_eq!(stored.terms, 12);
    assert_eq!(stored.term_parents, 13);
}

#[tokio::test]
async fn test_session_local_catalogue_is_used_and_reopened() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = CatalogueRepository::new(&db_path).unwrap();
    let local = open_local(&repo, &db_path);

    let session = Arc::new(CatalogueSession::new());
    session.open(local.clone());
    let mut events = session.subscribe();

    let workbook = WorkbookBuilder::new(4).build();
    let outcome = CatalogueWorkbookImporter::new(repo.clone(), ImportConfig::default())
        .with_session(session.clone())
        .import_workbook(workbook.path())
        .await
        .unwrap();
    assert_eq!(outcome.catalogue.id, local.id);

    // 完成后重新打开目录，再发布导入完成事件
    match events.recv().await.unwrap() {
        SessionEvent::CatalogueChanged { catalogue } => {
            assert_eq!(catalogue.and_then(|c| c.id), local.id)
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match events.recv().await.unwrap() {
        SessionEvent::ImportFinished { counts, .. } => assert_eq!(counts.terms, 4),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(session.current().and_then(|c| c.id), local.id);
}

#[tokio::test]
async fn test_unknown_local_catalogue_is_reference_error() {
    logging::init_test();
    let (_tmp, db_path) = create_test_db().unwrap();
    let repo = CatalogueRepository::new(&db_path).unwrap();

    // 未落库的本地目录且库中无同身份记录
    let local = Catalogue::new("NOPE", "9.9", CatalogueMode::Local);
    let workbook = WorkbookBuilder::new(3).build();
    let err = CatalogueWorkbookImporter::new(repo.clone(), ImportConfig::default())
        .with_opened_catalogue(local)
        .import_workbook(workbook.path())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), ImportError::ReferenceError(_)));
    assert_eq!(repo.count_catalogues().unwrap(), 0);
}
