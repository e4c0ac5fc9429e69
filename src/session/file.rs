//! 文件检查点：每个会话一个 JSON 文档
//!
//! 先写同目录下的临时文件再 rename 覆盖，崩溃时旧文档保持完整；同一会话的写入串行化。

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::core::KeyedLocks;
use crate::session::{CheckpointError, Checkpointer, Session};

pub struct FileCheckpointer {
    dir: PathBuf,
    locks: KeyedLocks,
}

/// session id -> 文件名；非 [A-Za-z0-9_-] 的字节转义为 %XX
fn encode_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

fn decode_id(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

impl FileCheckpointer {
    /// 目录不存在时创建
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        tracing::info!(dir = %dir.display(), "file checkpointer ready");
        Ok(Self {
            dir,
            locks: KeyedLocks::new(),
        })
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_id(session_id)))
    }

    /// 临时文件 + rename；调用方持有该会话的写锁
    async fn write_document(&self, session: &Session) -> Result<(), CheckpointError> {
        let path = self.path_for(&session.id);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", encode_id(&session.id), uuid::Uuid::new_v4().simple()));
        let data = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&tmp, &data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tracing::debug!(session_id = %session.id, bytes = data.len(), "session saved");
        Ok(())
    }
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, CheckpointError> {
        let path = self.path_for(session_id);
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    async fn save(&self, session: &Session) -> Result<(), CheckpointError> {
        let lock = self.locks.lock_for(&session.id);
        let result = {
            let _guard = lock.lock().await;
            self.write_document(session).await
        };
        drop(lock);
        self.locks.release(&session.id);
        result
    }

    async fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".json") {
                if let Some(id) = decode_id(stem) {
                    ids.push(id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Message;

    #[test]
    fn test_id_encoding_roundtrip() {
        for id in ["plain-id_1", "user/../x", "会话 1"] {
            let enc = encode_id(id);
            assert!(!enc.contains('/'));
            assert_eq!(decode_id(&enc).as_deref(), Some(id));
        }
    }

    #[tokio::test]
    async fn test_save_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let cp = FileCheckpointer::new(dir.path().join("sessions")).unwrap();
        assert!(cp.load("a/b").await.unwrap().is_none());

        let mut s = Session::new("a/b");
        s.messages.append(Message::user("hello"));
        cp.save(&s).await.unwrap();
        s.messages.append(Message::assistant("hi"));
        cp.save(&s).await.unwrap();

        assert_eq!(cp.load("a/b").await.unwrap(), Some(s));
        assert_eq!(cp.list().await.unwrap(), vec!["a/b".to_string()]);
        assert!(cp.locks.is_empty());
    }

    #[tokio::test]
    async fn test_reopen_sees_saved_session() {
        let dir = tempfile::tempdir().unwrap();
        let s = Session::new("persisted");
        FileCheckpointer::new(dir.path()).unwrap().save(&s).await.unwrap();
        let reopened = FileCheckpointer::new(dir.path()).unwrap();
        assert_eq!(reopened.load("persisted").await.unwrap(), Some(s));
    }
}
