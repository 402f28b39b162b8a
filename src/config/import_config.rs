// ==========================================
// 目录工作簿导入 - 导入参数
// ==========================================

use crate::config::config_manager::config_keys;
use crate::config::import_config_trait::ImportConfigReader;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};

/// 默认批次大小
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// 单次导入运行的参数（运行开始时确定，运行期间不变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub pipeline_heavy_sheets: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            pipeline_heavy_sheets: true,
        }
    }
}

impl ImportConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_pipeline(mut self, enabled: bool) -> Self {
        self.pipeline_heavy_sheets = enabled;
        self
    }

    /// 校验参数
    pub fn validate(&self) -> ImportResult<()> {
        if self.batch_size == 0 {
            return Err(ImportError::ConfigValueError {
                key: config_keys::BATCH_SIZE.to_string(),
                value: "0".to_string(),
                message: "批次大小必须大于 0".to_string(),
            });
        }
        Ok(())
    }

    /// 从配置源读取
    pub async fn load(reader: &dyn ImportConfigReader) -> ImportResult<Self> {
        let config = Self {
            batch_size: reader.get_batch_size().await?,
            pipeline_heavy_sheets: reader.get_pipeline_heavy_sheets().await?,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_batch_size_is_rejected() {
        assert!(ImportConfig::default().validate().is_ok());
        let err = ImportConfig::default().with_batch_size(0).validate().unwrap_err();
        assert!(matches!(err, ImportError::ConfigValueError { .. }));
    }
}
