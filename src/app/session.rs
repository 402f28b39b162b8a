// ==========================================
// 目录工作簿导入 - 会话上下文
// ==========================================
// 职责: 持有当前打开的目录；变更与导入结果通过广播通道发布
// 说明: 每个应用运行创建一次，显式传给需要它的操作
// ==========================================

use crate::domain::catalogue::{Catalogue, ImportCounts};
use serde::Serialize;
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

/// 广播通道容量
const SESSION_CHANNEL_CAPACITY: usize = 32;

/// 会话事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEvent {
    /// 当前目录变更（None = 已关闭）
    CatalogueChanged { catalogue: Option<Catalogue> },
    /// 导入完成
    ImportFinished {
        run_id: String,
        catalogue: Catalogue,
        counts: ImportCounts,
    },
    /// 导入中止
    ImportAborted {
        run_id: String,
        stage: String,
        batch: Option<usize>,
        message: String,
    },
}

pub struct CatalogueSession {
    current: RwLock<Option<Catalogue>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for CatalogueSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogueSession {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(SESSION_CHANNEL_CAPACITY);
        Self {
            current: RwLock::new(None),
            events,
        }
    }

    /// 订阅会话事件
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// 当前打开的目录
    pub fn current(&self) -> Option<Catalogue> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// 打开目录并发布 CatalogueChanged
    pub fn open(&self, catalogue: Catalogue) {
        self.replace(Some(catalogue));
    }

    /// 关闭当前目录并发布 CatalogueChanged
    pub fn close(&self) {
        self.replace(None);
    }

    /// 发布事件（无订阅者时丢弃）
    pub fn publish(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("会话事件无订阅者");
        }
    }

    fn replace(&self, catalogue: Option<Catalogue>) {
        {
            let mut guard = match self.current.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = catalogue.clone();
        }
        self.publish(SessionEvent::CatalogueChanged { catalogue });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::CatalogueMode;

    #[tokio::test]
    async fn test_open_publishes_change() {
        let session = CatalogueSession::new();
        let mut rx = session.subscribe();

        let cat = Catalogue::new("LOC", "0.1", CatalogueMode::Local);
        session.open(cat.clone());
        assert_eq!(session.current(), Some(cat.clone()));

        match rx.recv().await.unwrap() {
            SessionEvent::CatalogueChanged { catalogue } => assert_eq!(catalogue, Some(cat)),
            other => panic!("unexpected event: {other:?}"),
        }

        session.close();
        assert!(session.current().is_none());
    }
}
