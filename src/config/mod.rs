// ==========================================
// 目录工作簿导入 - 配置层
// ==========================================
// 职责: 导入参数（批次大小、大表流水线开关）
// 存储: config_kv 表 (scope_id = 'global')
// ==========================================

pub mod config_manager;
pub mod import_config;
pub mod import_config_trait;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use import_config::ImportConfig;
pub use import_config_trait::ImportConfigReader;
