// ==========================================
// 目录工作簿导入 - 目录领域模型
// ==========================================
// 实体: Catalogue / Hierarchy / Attribute / TermType / Term /
//       TermAttribute / TermParent / ReleaseNote / ReleaseNoteOperation
// 约束: 除 Catalogue 外，所有实体都归属某个目录 (catalogue_id)
// ==========================================

use crate::domain::types::CatalogueMode;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Catalogue - 目录
// ==========================================
// 身份: (code, version)
// 存储位置: db_path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalogue {
    pub id: Option<i64>,                      // 数据库主键（未落库时为 None）
    pub code: String,
    pub version: String,
    pub name: Option<String>,
    pub label: Option<String>,
    pub scope_note: Option<String>,
    pub term_code_mask: Option<String>,
    pub term_code_length: Option<i64>,
    pub term_min_code: Option<String>,
    pub accept_non_standard_codes: bool,
    pub generate_missing_codes: bool,
    pub status: Option<String>,
    pub deprecated: bool,
    pub mode: CatalogueMode,
    pub db_path: Option<String>,

    // 目录级发布说明（来自目录页，发布说明阶段落库）
    pub release_note: Option<ReleaseNote>,
}

impl Catalogue {
    /// 创建最小目录（仅身份）
    pub fn new(code: impl Into<String>, version: impl Into<String>, mode: CatalogueMode) -> Self {
        Self {
            id: None,
            code: code.into(),
            version: version.into(),
            name: None,
            label: None,
            scope_note: None,
            term_code_mask: None,
            term_code_length: None,
            term_min_code: None,
            accept_non_standard_codes: false,
            generate_missing_codes: false,
            status: None,
            deprecated: false,
            mode,
            db_path: None,
            release_note: None,
        }
    }

    pub fn is_local(&self) -> bool {
        self.mode.is_local()
    }
}

impl fmt::Display for Catalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.code, self.version)
    }
}

// ==========================================
// Hierarchy - 层级
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub id: Option<i64>,
    pub code: String,
    pub name: Option<String>,
    pub label: Option<String>,
    pub scope_note: Option<String>,
    pub applicability: Option<String>,
    pub order: i64,
    pub is_master: bool,
    pub status: Option<String>,
    pub deprecated: bool,
}

impl Hierarchy {
    /// 术语表中该层级列的前缀（主层级固定为 master）
    pub fn column_prefix(&self) -> &str {
        if self.is_master {
            "master"
        } else {
            &self.code
        }
    }

    pub fn flag_column(&self) -> String {
        format!("{}Flag", self.column_prefix())
    }

    pub fn parent_column(&self) -> String {
        format!("{}ParentCode", self.column_prefix())
    }

    pub fn order_column(&self) -> String {
        format!("{}Order", self.column_prefix())
    }

    pub fn reportable_column(&self) -> String {
        format!("{}Reportable", self.column_prefix())
    }
}

// ==========================================
// Attribute - 属性
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub id: Option<i64>,
    pub code: String,
    pub name: Option<String>,
    pub label: Option<String>,
    pub scope_note: Option<String>,
    pub reportable: Option<String>,
    pub visible: bool,
    pub searchable: bool,
    pub order: i64,
    pub attribute_type: Option<String>,
    pub catalogue_code: Option<String>,
    pub single_or_repeatable: Option<String>,
    pub inheritance: Option<String>,
    pub uniqueness: bool,
    pub term_code_alias: bool,
    pub status: Option<String>,
    pub deprecated: bool,

    // 适用术语类型代码（`$` 分隔，术语类型步骤使用）
    pub term_types: Vec<String>,
}

impl Attribute {
    /// 可重复属性的值以 `$` 分隔
    pub fn is_repeatable(&self) -> bool {
        self.single_or_repeatable
            .as_deref()
            .map(|s| s.eq_ignore_ascii_case("repeatable"))
            .unwrap_or(false)
    }
}

// ==========================================
// TermType - 术语类型
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermType {
    pub id: Option<i64>,
    pub code: String,
}

// ==========================================
// Term - 术语
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub id: Option<i64>,
    pub code: String,
    pub extended_name: Option<String>,
    pub short_name: Option<String>,
    pub scope_note: Option<String>,
    pub scope_note_links: Option<String>,
    pub term_type: Option<String>,
    pub status: Option<String>,
    pub deprecated: bool,
    pub version: Option<String>,
    pub last_update: Option<String>,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
}

/// 术语批次落库结果（提交后才可记入新代码集合）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTerm {
    pub code: String,
    pub id: i64,
    pub inserted: bool,
}

// ==========================================
// TermAttribute - 术语 × 属性 × 值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermAttribute {
    pub term_id: i64,
    pub attribute_id: i64,
    pub value: String,
    pub value_order: i64,
}

// ==========================================
// TermParent - 术语 × 层级 × 父术语
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermParent {
    pub term_id: i64,
    pub hierarchy_id: i64,
    pub parent_term_id: Option<i64>,          // None = 层级顶层
    pub order: i64,
    pub reportable: bool,
}

// ==========================================
// ReleaseNote - 目录发布说明
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseNote {
    pub description: Option<String>,
    pub date: Option<String>,
    pub version: Option<String>,
    pub internal_version: Option<String>,
}

impl ReleaseNote {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.date.is_none()
            && self.version.is_none()
            && self.internal_version.is_none()
    }
}

// ==========================================
// ReleaseNoteOperation - 发布说明操作
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseNoteOperation {
    pub name: String,
    pub date: Option<String>,
    pub info: Option<String>,
    pub group_id: Option<i64>,
}

// ==========================================
// ImportCounts - 按实体统计已提交记录数
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
    pub hierarchies: usize,
    pub attributes: usize,
    pub term_types: usize,
    pub terms: usize,
    pub new_terms: usize,
    pub term_parents: usize,
    pub term_attributes: usize,
    pub release_notes: usize,
    pub release_note_operations: usize,
}

impl ImportCounts {
    pub fn total(&self) -> usize {
        self.hierarchies
            + self.attributes
            + self.term_types
            + self.terms
            + self.term_parents
            + self.term_attributes
            + self.release_notes
            + self.release_note_operations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hierarchy(code: &str, is_master: bool) -> Hierarchy {
        Hierarchy {
            id: None,
            code: code.to_string(),
            name: None,
            label: None,
            scope_note: None,
            applicability: None,
            order: 1,
            is_master,
            status: None,
            deprecated: false,
        }
    }

    #[test]
    fn test_hierarchy_column_prefix() {
        assert_eq!(hierarchy("MTX", true).flag_column(), "masterFlag");
        assert_eq!(hierarchy("report", false).parent_column(), "reportParentCode");
    }

    #[test]
    fn test_catalogue_display() {
        let cat = Catalogue::new("MTX", "1.2", CatalogueMode::Distributed);
        assert_eq!(cat.to_string(), "MTX v1.2");
        assert!(!cat.is_local());
    }
}
