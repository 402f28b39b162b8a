// ==========================================
// 目录工作簿导入 - 导入层
// ==========================================
// 职责: 工作簿流式读取、按依赖序逐表导入、大表读写流水线
// 支持: Excel / ODS / CSV 目录
// ==========================================

// 模块声明
pub mod attribute_sheet;
pub mod batch_pipeline;
pub mod catalogue_sheet;
pub mod error;
pub mod hierarchy_sheet;
pub mod new_code_tracker;
pub mod notes_sheet;
pub mod orchestrator;
pub mod progress;
pub mod sheet_importer;
pub mod term_relations_sheet;
pub mod term_sheet;
pub mod workbook_reader;

// 重导出核心类型
pub use attribute_sheet::AttributeSheetImporter;
pub use batch_pipeline::{run_pipelined, run_sequential, PipelineReport, PipelineRun};
pub use catalogue_sheet::CatalogueSheetImporter;
pub use error::{ImportError, ImportResult};
pub use hierarchy_sheet::HierarchySheetImporter;
pub use new_code_tracker::{NewCodeSet, NewCodeTracker};
pub use notes_sheet::NotesSheetImporter;
pub use orchestrator::{CatalogueWorkbookImporter, ImportOutcome};
pub use progress::{LoggingProgress, NoOpProgress, ProgressReporter};
pub use term_relations_sheet::TermRelationsImporter;
pub use term_sheet::TermSheetImporter;
pub use workbook_reader::WorkbookReader;

// 重导出 Trait 接口
pub use sheet_importer::SheetImporter;
pub use workbook_reader::BatchSource;
