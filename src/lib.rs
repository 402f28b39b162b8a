// ==========================================
// 目录工作簿导入 - 核心库
// ==========================================
// 职责: 将目录工作簿（目录/层级/属性/术语/术语关系/发布说明）
//       按依赖序流式导入关系型存储
// 技术栈: Rust + SQLite + calamine/csv
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 工作簿读取、工作表导入、流水线、编排
pub mod importer;

// 配置层 - 导入参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/schema）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// 应用层 - 会话上下文与默认路径
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CatalogueMode, ImportRunStatus, ImportStage, SheetKind};

// 领域实体
pub use domain::{
    Attribute, Catalogue, Hierarchy, ImportCounts, ReleaseNote, ReleaseNoteOperation, Row,
    RowBatch, Term, TermAttribute, TermParent, TermType,
};

// 导入
pub use importer::{
    CatalogueWorkbookImporter, ImportError, ImportOutcome, ImportResult, ProgressReporter,
    WorkbookReader,
};

// 配置
pub use config::{ConfigManager, ImportConfig, ImportConfigReader};

// 会话
pub use app::{CatalogueSession, SessionEvent};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "目录工作簿导入";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
