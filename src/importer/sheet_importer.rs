// ==========================================
// 目录工作簿导入 - 工作表导入器 Trait
// ==========================================
// 职责: 定义各工作表导入器的统一能力（表头校验 + 批次落库）
// 实现者: Catalogue / Hierarchy / Attribute / Term / TermRelations / Notes
// ==========================================

use crate::domain::sheet::{Row, RowBatch};
use crate::domain::types::SheetKind;
use crate::importer::error::{ImportError, ImportResult};

/// 多值单元格的分隔符
pub const MULTI_VALUE_SEPARATOR: char = '$';

// ==========================================
// SheetImporter Trait
// ==========================================
// 用途: 按工作表种类分派的导入器（封闭集合，由编排器按阶段选择）
pub trait SheetImporter: Send {
    /// 负责的逻辑工作表
    fn sheet_kind(&self) -> SheetKind;

    /// 必需列（缺任一列即 SchemaError）
    fn required_columns(&self) -> Vec<String>;

    /// 在处理首行之前校验表头
    fn validate_header(&self, headers: &[String]) -> ImportResult<()> {
        let missing: Vec<String> = self
            .required_columns()
            .into_iter()
            .filter(|col| !headers.iter().any(|h| h == col))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::schema(
                self.sheet_kind(),
                format!("缺少必需列: {}", missing.join(", ")),
            ))
        }
    }

    /// 转换并落库一个批次（单事务）
    ///
    /// # 返回
    /// - 本批已提交的记录数
    fn import_data(&mut self, batch: &RowBatch) -> ImportResult<usize>;
}

// ==========================================
// 单元格读取辅助
// ==========================================

/// 必填文本
pub(crate) fn required_text(row: &Row, column: &str) -> ImportResult<String> {
    row.text(column)
        .ok_or_else(|| ImportError::invalid(row.row_number, column, "必填值为空"))
}

/// 布尔值（空值取默认值）
pub(crate) fn flag_or(row: &Row, column: &str, default: bool) -> ImportResult<bool> {
    row.flag(column)
        .map(|v| v.unwrap_or(default))
        .map_err(|raw| ImportError::invalid(row.row_number, column, format!("无法识别的布尔值: {}", raw)))
}

/// 整数值（空值返回 None）
pub(crate) fn int_opt(row: &Row, column: &str) -> ImportResult<Option<i64>> {
    row.int(column)
        .map_err(|raw| ImportError::invalid(row.row_number, column, format!("无法识别的整数值: {}", raw)))
}

/// 按 `$` 拆分多值单元格，去掉空片段
pub(crate) fn split_multi(raw: &str) -> Vec<String> {
    raw.split(MULTI_VALUE_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sheet::CellValue;
    use std::collections::HashMap;

    struct HeaderOnly;

    impl SheetImporter for HeaderOnly {
        fn sheet_kind(&self) -> SheetKind {
            SheetKind::Hierarchy
        }

        fn required_columns(&self) -> Vec<String> {
            vec!["code".to_string(), "isMaster".to_string()]
        }

        fn import_data(&mut self, batch: &RowBatch) -> ImportResult<usize> {
            Ok(batch.len())
        }
    }

    #[test]
    fn test_validate_header_reports_missing_columns() {
        let err = HeaderOnly
            .validate_header(&["code".to_string(), "name".to_string()])
            .unwrap_err();
        match err {
            ImportError::SchemaError { sheet, message } => {
                assert_eq!(sheet, SheetKind::Hierarchy);
                assert!(message.contains("isMaster"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(HeaderOnly
            .validate_header(&["isMaster".to_string(), "code".to_string()])
            .is_ok());
    }

    #[test]
    fn test_cell_helpers() {
        let mut values = HashMap::new();
        values.insert("flag".to_string(), CellValue::Text("maybe".into()));
        values.insert("order".to_string(), CellValue::Number(3.0));
        values.insert("masterOrder".to_string(), CellValue::Text("2.9".into()));
        let row = Row::new(7, values);

        assert!(matches!(
            flag_or(&row, "flag", false),
            Err(ImportError::InvalidValue { row: 7, .. })
        ));
        assert!(flag_or(&row, "absent", true).unwrap());
        assert_eq!(int_opt(&row, "order").unwrap(), Some(3));
        assert!(matches!(
            int_opt(&row, "masterOrder"),
            Err(ImportError::InvalidValue { row: 7, ref column, .. }) if column == "masterOrder"
        ));
        assert!(required_text(&row, "code").is_err());
        assert_eq!(split_multi(" a$b $$c "), vec!["a", "b", "c"]);
    }
}
