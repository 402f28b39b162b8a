// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 导入参数从目标库读取并驱动导入
// ==========================================


use catalogue_import::config::{config_keys, ConfigManager, ImportConfig};
use catalogue_import::importer::{CatalogueWorkbookImporter, ImportError};
use catalogue_import::logging;
use catalogue_import::repository::CatalogueRepository;
use test_helpers::{create_test_db, WorkbookBuilder};

#[tokio::test]
async fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[tokio::test]
async fn test_stored_config_drives_import() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = CatalogueRepository::new(&db_path).unwrap();

    let manager = ConfigManager::from_connection(repo.connection()).unwrap();
    manager
        .set_global_config_value(config_keys::BATCH_SIZE, "3")
        .unwrap();
    manager
        .set_global_config_value(config_keys::PIPELINE_HEAVY_SHEETS, "false")
        .unwrap();

    let config = ImportConfig::load(&manager).await.unwrap();
    assert_eq!(config.batch_size, 3);
    assert!(!config.pipeline_heavy_sheets);

    let workbook = WorkbookBuilder::new(10).build();
    let outcome = CatalogueWorkbookImporter::new(repo, config)
        .import_workbook(workbook.path())
        .await
        .unwrap();
    assert_eq!(outcome.counts.terms, 10);
    assert_eq!(outcome.counts.term_parents, 11);
}

#[tokio::test]
async fn test_zero_batch_size_is_rejected_before_reading() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = CatalogueRepository::new(&db_path).unwrap();

    let manager = ConfigManager::from_connection(repo.connection()).unwrap();
    manager
        .set_global_config_value(config_keys::BATCH_SIZE, "0")
        .unwrap();
    assert!(ImportConfig::load(&manager).await.is_err());

    let config = ImportConfig::default().with_batch_size(0);
    let workbook = WorkbookBuilder::new(2).build();
    let err = CatalogueWorkbookImporter::new(repo.clone(), config)
        .import_workbook(workbook.path())
        .await
        .unwrap_err();

    assert!(matches!(err.root(), ImportError::ConfigValueError { .. }));
    assert_eq!(repo.count_catalogues().unwrap(), 0);
}
