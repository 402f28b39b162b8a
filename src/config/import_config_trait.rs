// ==========================================
// 目录工作簿导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入编排所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入编排所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取批次大小（行数）
    ///
    /// # 返回
    /// - usize: 每个 RowBatch 的行数
    /// - Err(ConfigValueError): 值不是正整数
    ///
    /// # 默认值
    /// - 100
    async fn get_batch_size(&self) -> ImportResult<usize>;

    /// 大表（术语、术语关系）是否走读写重叠流水线
    ///
    /// # 返回
    /// - false: 大表也按顺序直接处理
    ///
    /// # 默认值
    /// - true
    async fn get_pipeline_heavy_sheets(&self) -> ImportResult<bool>;
}
