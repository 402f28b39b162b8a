// ==========================================
// 目录工作簿导入 - 领域类型定义
// ==========================================
// 职责: 工作表种类、目录模式、导入阶段、导入运行状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 工作表种类 (Sheet Kind)
// ==========================================
// 逻辑工作表名固定；依赖序即导入序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SheetKind {
    Catalogue,
    Hierarchy,
    Attribute,
    Term,
    TermRelations,
    Notes,
}

impl SheetKind {
    /// 工作簿中的物理工作表名
    ///
    /// 术语关系（父级链接 + 术语属性）是术语表的列，因此复读 `term` 表
    pub fn sheet_name(&self) -> &'static str {
        match self {
            SheetKind::Catalogue => "catalogue",
            SheetKind::Hierarchy => "hierarchy",
            SheetKind::Attribute => "attribute",
            SheetKind::Term => "term",
            SheetKind::TermRelations => "term",
            SheetKind::Notes => "releaseNotes",
        }
    }

    /// 依赖序号（越小越先导入）
    pub fn rank(&self) -> u8 {
        match self {
            SheetKind::Catalogue => 0,
            SheetKind::Hierarchy => 1,
            SheetKind::Attribute => 2,
            SheetKind::Term => 3,
            SheetKind::TermRelations => 4,
            SheetKind::Notes => 5,
        }
    }

    /// 缺失时是否可恢复（仅发布说明页）
    pub fn is_optional(&self) -> bool {
        matches!(self, SheetKind::Notes)
    }

    /// 是否为大表（走批处理流水线）
    pub fn is_heavy(&self) -> bool {
        matches!(self, SheetKind::Term | SheetKind::TermRelations)
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetKind::Catalogue => write!(f, "catalogue"),
            SheetKind::Hierarchy => write!(f, "hierarchy"),
            SheetKind::Attribute => write!(f, "attribute"),
            SheetKind::Term => write!(f, "term"),
            SheetKind::TermRelations => write!(f, "term-relations"),
            SheetKind::Notes => write!(f, "notes"),
        }
    }
}

// ==========================================
// 目录模式 (Catalogue Mode)
// ==========================================
// Local: 客户端自建、不分发；Distributed: 官方分发
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogueMode {
    Local,
    Distributed,
}

impl CatalogueMode {
    pub fn is_local(&self) -> bool {
        matches!(self, CatalogueMode::Local)
    }
}

impl fmt::Display for CatalogueMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogueMode::Local => write!(f, "LOCAL"),
            CatalogueMode::Distributed => write!(f, "DISTRIBUTED"),
        }
    }
}

// ==========================================
// 导入阶段 (Import Stage) - 编排状态机
// ==========================================
// CATALOGUE → HIERARCHY → ATTRIBUTE → TERM → TERM_RELATIONS → NOTES → DONE
// 任意非终态 → ABORTED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStage {
    Catalogue,
    Hierarchy,
    Attribute,
    Term,
    TermRelations,
    Notes,
    Done,
    Aborted,
}

impl ImportStage {
    /// 正常推进时的后继阶段
    pub fn successor(&self) -> Option<ImportStage> {
        match self {
            ImportStage::Catalogue => Some(ImportStage::Hierarchy),
            ImportStage::Hierarchy => Some(ImportStage::Attribute),
            ImportStage::Attribute => Some(ImportStage::Term),
            ImportStage::Term => Some(ImportStage::TermRelations),
            ImportStage::TermRelations => Some(ImportStage::Notes),
            ImportStage::Notes => Some(ImportStage::Done),
            ImportStage::Done | ImportStage::Aborted => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStage::Done | ImportStage::Aborted)
    }

    /// 检查状态迁移是否合法
    pub fn can_transition_to(&self, next: ImportStage) -> bool {
        if next == ImportStage::Aborted {
            return !self.is_terminal();
        }
        self.successor() == Some(next)
    }

    /// 阶段对应的工作表
    pub fn sheet(&self) -> Option<SheetKind> {
        match self {
            ImportStage::Catalogue => Some(SheetKind::Catalogue),
            ImportStage::Hierarchy => Some(SheetKind::Hierarchy),
            ImportStage::Attribute => Some(SheetKind::Attribute),
            ImportStage::Term => Some(SheetKind::Term),
            ImportStage::TermRelations => Some(SheetKind::TermRelations),
            ImportStage::Notes => Some(SheetKind::Notes),
            ImportStage::Done | ImportStage::Aborted => None,
        }
    }
}

impl fmt::Display for ImportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStage::Catalogue => write!(f, "CATALOGUE"),
            ImportStage::Hierarchy => write!(f, "HIERARCHY"),
            ImportStage::Attribute => write!(f, "ATTRIBUTE"),
            ImportStage::Term => write!(f, "TERM"),
            ImportStage::TermRelations => write!(f, "TERM_RELATIONS"),
            ImportStage::Notes => write!(f, "NOTES"),
            ImportStage::Done => write!(f, "DONE"),
            ImportStage::Aborted => write!(f, "ABORTED"),
        }
    }
}

// ==========================================
// 导入运行状态 (Import Run Status)
// ==========================================
// 序列化格式: 与数据库 import_run.status 一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportRunStatus {
    Running,
    Completed,
    Incomplete,
}

impl ImportRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportRunStatus::Running => "RUNNING",
            ImportRunStatus::Completed => "COMPLETED",
            ImportRunStatus::Incomplete => "INCOMPLETE",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "RUNNING" => ImportRunStatus::Running,
            "COMPLETED" => ImportRunStatus::Completed,
            _ => ImportRunStatus::Incomplete,
        }
    }
}

impl fmt::Display for ImportRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
