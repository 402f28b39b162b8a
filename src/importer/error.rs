// ==========================================
// 目录工作簿导入 - 导入模块错误类型
// ==========================================
// 分类: 格式 / 结构 / 工作表缺失 / 引用 / 悬空引用 / 持久化
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::SheetKind;
use crate::repository::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 工作簿错误 =====
    #[error("工作簿格式错误: {0}")]
    FormatError(String),

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    // ===== 结构错误 =====
    #[error("工作表 {sheet} 结构错误: {message}")]
    SchemaError { sheet: SheetKind, message: String },

    #[error("单元格值错误 (行 {row}, 列 {column}): {message}")]
    InvalidValue {
        row: usize,
        column: String,
        message: String,
    },

    // ===== 跨表一致性错误 =====
    #[error("引用错误: {0}")]
    ReferenceError(String),

    #[error("悬空引用 (行 {row}): 术语 {code} 既不在本次新建集合中也不在库中")]
    DanglingReference { row: usize, code: String },

    // ===== 持久化错误 =====
    #[error("持久化失败: {0}")]
    Persistence(#[from] RepositoryError),

    // ===== 配置错误 =====
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },

    // ===== 定位包装 =====
    #[error("[{sheet}{}] {source}", .batch.map(|b| format!(" 第 {} 批", b)).unwrap_or_default())]
    Sheet {
        sheet: SheetKind,
        batch: Option<usize>,
        #[source]
        source: Box<ImportError>,
    },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 以工作表与批次定位错误（已定位的错误不重复包装）
    pub fn at(self, sheet: SheetKind, batch: Option<usize>) -> ImportError {
        match self {
            ImportError::Sheet { .. } => self,
            other => ImportError::Sheet {
                sheet,
                batch,
                source: Box::new(other),
            },
        }
    }

    /// 去掉定位包装后的根错误
    pub fn root(&self) -> &ImportError {
        match self {
            ImportError::Sheet { source, .. } => source.root(),
            other => other,
        }
    }

    /// 出错的工作表（若已定位）
    pub fn sheet(&self) -> Option<SheetKind> {
        match self {
            ImportError::Sheet { sheet, .. } => Some(*sheet),
            _ => None,
        }
    }

    /// 出错的批次序号（若已定位且为流水线批次）
    pub fn batch(&self) -> Option<usize> {
        match self {
            ImportError::Sheet { batch, .. } => *batch,
            _ => None,
        }
    }

    /// 可恢复的缺失：可选工作表（发布说明）不存在
    pub fn is_recoverable_absence(&self) -> bool {
        match self {
            ImportError::Sheet { sheet, source, .. } => {
                sheet.is_optional() && matches!(source.root(), ImportError::SheetNotFound(_))
            }
            ImportError::SheetNotFound(name) => name == SheetKind::Notes.sheet_name(),
            _ => false,
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self.root(), ImportError::Persistence(_))
    }

    pub(crate) fn schema(sheet: SheetKind, message: impl Into<String>) -> ImportError {
        ImportError::SchemaError {
            sheet,
            message: message.into(),
        }
    }

    pub(crate) fn invalid(row: usize, column: &str, message: impl Into<String>) -> ImportError {
        ImportError::InvalidValue {
            row,
            column: column.to_string(),
            message: message.into(),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FormatError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Persistence(RepositoryError::from(err))
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::FormatError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::FormatError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ImportError {
    fn from(err: tokio::task::JoinError) -> Self {
        ImportError::InternalError(format!("流水线阶段异常退出: {}", err))
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagging_is_idempotent() {
        let err = ImportError::ReferenceError("x".into())
            .at(SheetKind::Term, Some(3))
            .at(SheetKind::Notes, None);
        assert_eq!(err.sheet(), Some(SheetKind::Term));
        assert_eq!(err.batch(), Some(3));
        assert!(matches!(err.root(), ImportError::ReferenceError(_)));
        assert!(err.to_string().contains("第 3 批"));
    }

    #[test]
    fn test_only_notes_absence_is_recoverable() {
        let notes = ImportError::SheetNotFound("releaseNotes".into()).at(SheetKind::Notes, None);
        let term = ImportError::SheetNotFound("term".into()).at(SheetKind::Term, None);
        assert!(notes.is_recoverable_absence());
        assert!(!term.is_recoverable_absence());
    }
}
