// ==========================================
// 目录工作簿导入 - 默认路径
// ==========================================

use std::path::PathBuf;

/// 显式指定目标库路径的环境变量
pub const DB_PATH_ENV: &str = "CATALOGUE_IMPORT_DB_PATH";

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 CATALOGUE_IMPORT_DB_PATH（非空时）
/// - 开发环境: 用户数据目录/catalogue-import-dev/catalogues.db
/// - 生产环境: 用户数据目录/catalogue-import/catalogues.db
/// - 无法获取用户数据目录时: ./catalogues.db
pub fn get_default_db_path() -> String {
    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./catalogues.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("catalogue-import-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("catalogue-import");
        }

        // 目录创建失败时仍返回路径，打开数据库时再报错
        std::fs::create_dir_all(&path).ok();
        path = path.join("catalogues.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }
}
