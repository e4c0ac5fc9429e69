//! SQLite 检查点：一张表，每个会话一行，保存时在事务内整行替换
//!
//! rusqlite 是同步的，连接放在 Mutex 中，经 spawn_blocking 调用。

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::session::{CheckpointError, Checkpointer, Session};

const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id          TEXT PRIMARY KEY,
    document    TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);
";

const PRAGMAS: &str = "PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;";

fn db_err(e: rusqlite::Error) -> CheckpointError {
    CheckpointError::Storage(e.to_string())
}

#[derive(Clone)]
pub struct SqliteCheckpointer {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCheckpointer {
    /// 打开或创建数据库文件
    pub fn open(path: &Path) -> Result<Self, CheckpointError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch(PRAGMAS).map_err(db_err)?;
        conn.execute_batch(CREATE_TABLES).map_err(db_err)?;
        tracing::info!(path = %path.display(), "sqlite checkpointer opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 内存数据库（测试用）
    pub fn in_memory() -> Result<Self, CheckpointError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLES).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, CheckpointError>
    where
        F: FnOnce(&mut Connection) -> Result<T, CheckpointError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| CheckpointError::Storage(format!("blocking task failed: {}", e)))?
    }
}

#[async_trait]
impl Checkpointer for SqliteCheckpointer {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, CheckpointError> {
        let id = session_id.to_string();
        let doc: Option<String> = self
            .with_conn(move |conn| {
                conn.query_row("SELECT document FROM sessions WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .optional()
                .map_err(db_err)
            })
            .await?;
        match doc {
            Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> Result<(), CheckpointError> {
        let id = session.id.clone();
        let doc = serde_json::to_string(session)?;
        let updated_at = session.updated_at.to_rfc3339();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(db_err)?;
            tx.execute(
                "INSERT OR REPLACE INTO sessions (id, document, updated_at) VALUES (?1, ?2, ?3)",
                params![id, doc, updated_at],
            )
            .map_err(db_err)?;
            tx.commit().map_err(db_err)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<String>, CheckpointError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM sessions ORDER BY id").map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(db_err)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(db_err)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::PendingApproval;
    use crate::memory::{Message, ToolCallRequest};
    use serde_json::Map;

    #[tokio::test]
    async fn test_save_replaces_whole_document() {
        let cp = SqliteCheckpointer::in_memory().unwrap();
        let call = ToolCallRequest::new("c1", "files_write", Map::new());
        let mut s = Session::new("s1");
        s.messages.append(Message::assistant_with_calls("", vec![call.clone()]));
        s.pending = Some(PendingApproval::new(vec![call]));
        cp.save(&s).await.unwrap();

        s.messages.append(Message::tool("c1", "ok"));
        s.pending = None;
        cp.save(&s).await.unwrap();

        let loaded = cp.load("s1").await.unwrap().unwrap();
        assert!(loaded.pending.is_none());
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(cp.list().await.unwrap(), vec!["s1".to_string()]);
        assert!(cp.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db").join("hive.sqlite");
        let s = Session::new("x");
        SqliteCheckpointer::open(&path).unwrap().save(&s).await.unwrap();
        let reopened = SqliteCheckpointer::open(&path).unwrap();
        assert_eq!(reopened.load("x").await.unwrap(), Some(s));
    }
}
