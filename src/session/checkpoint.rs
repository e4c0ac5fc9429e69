//! 检查点接口与内存实现

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::session::Session;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// 会话检查点：按 session id 读写整份会话；单次保存必须原子
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// 不存在时返回 None
    async fn load(&self, session_id: &str) -> Result<Option<Session>, CheckpointError>;

    async fn save(&self, session: &Session) -> Result<(), CheckpointError>;

    async fn list(&self) -> Result<Vec<String>, CheckpointError>;
}

/// 进程内检查点（RwLock<HashMap>）；写锁即按会话串行化
#[derive(Default)]
pub struct MemoryCheckpointer {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, CheckpointError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, session: &Session) -> Result<(), CheckpointError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
