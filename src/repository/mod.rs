// ==========================================
// 目录工作簿导入 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod catalogue_repo;
pub mod error;
pub mod import_run_repo;
pub mod preference_repo;

// 重导出核心仓储
pub use catalogue_repo::CatalogueRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use import_run_repo::{ImportRunRecord, ImportRunRepository};
pub use preference_repo::{CataloguePreferenceRepository, DEFAULT_PREFERENCES};
