// ==========================================
// 目录工作簿导入 - 领域模型层
// ==========================================
// 职责: 定义目录实体、行/批次模型、阶段与状态类型
// 红线: 不含数据访问逻辑,不含导入流程逻辑
// ==========================================

pub mod catalogue;
pub mod sheet;
pub mod types;

// 重导出核心类型
pub use catalogue::{
    Attribute, Catalogue, Hierarchy, ImportCounts, ReleaseNote, ReleaseNoteOperation,
    StoredTerm, Term, TermAttribute, TermParent, TermType,
};
pub use sheet::{CellValue, Row, RowBatch};
pub use types::{CatalogueMode, ImportRunStatus, ImportStage, SheetKind};
