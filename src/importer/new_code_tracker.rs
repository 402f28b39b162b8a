// ==========================================
// 目录工作簿导入 - 新代码集合
// ==========================================
// 写入方: 术语写入阶段（仅在批次事务提交后追加）
// 读取方: 术语关系阶段（术语表全部提交后冻结为只读集合）
// ==========================================

use crate::domain::catalogue::StoredTerm;
use std::collections::HashMap;
use std::sync::Arc;

/// 本次导入新建的术语代码 → 术语主键
#[derive(Debug, Default)]
pub struct NewCodeTracker {
    codes: HashMap<String, i64>,
}

impl NewCodeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个已提交批次中新插入的术语
    ///
    /// # 返回
    /// - 本次新记录的代码数
    pub fn record(&mut self, stored: &[StoredTerm]) -> usize {
        let mut added = 0;
        for term in stored.iter().filter(|t| t.inserted) {
            if self.codes.insert(term.code.clone(), term.id).is_none() {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// 术语表完成后冻结
    pub fn freeze(self) -> NewCodeSet {
        NewCodeSet {
            codes: Arc::new(self.codes),
        }
    }
}

/// 冻结后的新代码集合（只读，可廉价克隆）
#[derive(Debug, Clone, Default)]
pub struct NewCodeSet {
    codes: Arc<HashMap<String, i64>>,
}

impl NewCodeSet {
    pub fn get(&self, code: &str) -> Option<i64> {
        self.codes.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
