// ==========================================
// 目录工作簿导入 - 应用层
// ==========================================
// 职责: 会话上下文（当前目录 + 订阅通道）、默认路径
// ==========================================

pub mod paths;
pub mod session;

// 重导出
pub use paths::get_default_db_path;
pub use session::{CatalogueSession, SessionEvent};
