// ==========================================
// 目录工作簿导入 - 进度上报
// ==========================================
// 编排器只消费该接口；调用方决定如何展示
// 标签为已翻译文本（rust-i18n）
// ==========================================

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::info;

/// 进度上报者
pub trait ProgressReporter: Send + Sync {
    /// 前进 amount 个单位
    fn tick(&self, amount: u32, label: &str);

    /// 导入结束（每次运行恰好调用一次）
    fn close(&self);
}

/// 空实现（不上报）
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    fn tick(&self, _amount: u32, _label: &str) {}

    fn close(&self) {}
}

impl NoOpProgress {
    pub fn shared() -> Arc<dyn ProgressReporter> {
        Arc::new(NoOpProgress)
    }
}

/// 以 tracing 事件输出进度
#[derive(Default)]
pub struct LoggingProgress {
    done: AtomicU32,
    closed: AtomicBool,
}

impl LoggingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(&self) -> u32 {
        self.done.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ProgressReporter for LoggingProgress {
    fn tick(&self, amount: u32, label: &str) {
        let done = self.done.fetch_add(amount, Ordering::SeqCst) + amount;
        info!(amount, done, label, "导入进度");
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(done = self.done(), "进度上报结束");
        }
    }
}
