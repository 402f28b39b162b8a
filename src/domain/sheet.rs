// ==========================================
// 目录工作簿导入 - 行与批次模型
// ==========================================
// Row: 表头 → 单元格值映射
// RowBatch: 同一工作表内有序、有界的行块（流水线交接单元）
// ==========================================

use crate::domain::types::SheetKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// CellValue - 单元格标量值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 文本形式（数值型整数不带小数位）
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            CellValue::Empty => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text().unwrap_or_default())
    }
}

/// 解析布尔单元格（1/0、true/false、yes/no、y/n）
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

// ==========================================
// Row - 单行数据
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// 工作表内行号（1 = 表头行，数据从 2 开始）
    pub row_number: usize,
    pub values: HashMap<String, CellValue>,
}

impl Row {
    pub fn new(row_number: usize, values: HashMap<String, CellValue>) -> Self {
        Self { row_number, values }
    }

    pub fn is_blank(&self) -> bool {
        self.values.values().all(|v| v.is_empty())
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    /// 非空文本值（已 TRIM）
    pub fn text(&self, column: &str) -> Option<String> {
        self.values.get(column).and_then(|v| v.as_text())
    }

    /// 整数值；非数值、带小数或超出 i64 范围时返回 Err(原始文本)
    pub fn int(&self, column: &str) -> Result<Option<i64>, String> {
        match self.values.get(column) {
            None | Some(CellValue::Empty) => Ok(None),
            Some(CellValue::Number(n)) => whole_number(*n).map(Some).ok_or_else(|| n.to_string()),
            Some(other) => match other.as_text() {
                None => Ok(None),
                Some(raw) => match raw.parse::<i64>() {
                    Ok(n) => Ok(Some(n)),
                    Err(_) => raw
                        .parse::<f64>()
                        .ok()
                        .and_then(whole_number)
                        .map(Some)
                        .ok_or(raw),
                },
            },
        }
    }

    /// 布尔值；无法识别时返回 Err(原始文本)
    pub fn flag(&self, column: &str) -> Result<Option<bool>, String> {
        match self.values.get(column) {
            None | Some(CellValue::Empty) => Ok(None),
            Some(CellValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => match other.as_text() {
                None => Ok(None),
                Some(raw) => parse_flag(&raw).map(Some).ok_or(raw),
            },
        }
    }
}

/// 无小数部分且在 i64 范围内的数值
fn whole_number(n: f64) -> Option<i64> {
    if !n.is_finite() || n.fract() != 0.0 || n < i64::MIN as f64 || n >= i64::MAX as f64 {
        return None;
    }
    Some(n as i64)
}

// ==========================================
// RowBatch - 行批次
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub sheet: SheetKind,
    /// 批次序号（从 1 开始）
    pub index: usize,
    pub rows: Vec<Row>,
}

impl RowBatch {
    pub fn new(sheet: SheetKind, index: usize, rows: Vec<Row>) -> Self {
        Self { sheet, index, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
