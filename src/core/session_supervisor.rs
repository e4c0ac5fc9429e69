//! 会话监管：每会话串行执行与取消
//!
//! 每个会话一把异步互斥锁（同一会话的轮次严格串行，不同会话互不阻塞）；
//! 每次驱动调用持有一个 CancellationToken，cancel(session) 触发当前调用的取消。

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// 按 key 分配的异步互斥锁
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取得（必要时创建）key 对应的锁
    pub fn lock_for(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// 调用方放下自己的 Arc 后调用：没有其他持有者时移除该 key，表不随会话数无限增长
    pub fn release(&self, key: &str) {
        let mut locks = self.locks.lock();
        if locks.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

/// 会话级生命周期管理：串行锁与取消令牌
#[derive(Debug, Default)]
pub struct SessionSupervisor {
    locks: KeyedLocks,
    /// 正在运行的调用的取消令牌
    active: Mutex<HashMap<String, CancellationToken>>,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, session_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks.lock_for(session_id)
    }

    /// 放下会话锁之后调用，回收空闲的锁
    pub fn release(&self, session_id: &str) {
        self.locks.release(session_id);
    }

    pub fn tracked_locks(&self) -> usize {
        self.locks.len()
    }

    /// 开始一次调用：登记新的取消令牌
    pub fn begin(&self, session_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.active.lock().insert(session_id.to_string(), token.clone());
        token
    }

    /// 调用结束，移除令牌
    pub fn finish(&self, session_id: &str) {
        self.active.lock().remove(session_id);
    }

    /// 取消会话当前的调用；没有正在运行的调用时返回 false
    pub fn cancel(&self, session_id: &str) -> bool {
        match self.active.lock().get(session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, session_id: &str) -> bool {
        self.active.lock().contains_key(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_only_affects_active_call() {
        let sup = SessionSupervisor::new();
        assert!(!sup.cancel("a"));
        let token = sup.begin("a");
        let other = sup.begin("b");
        assert!(sup.cancel("a"));
        assert!(token.is_cancelled());
        assert!(!other.is_cancelled());
        sup.finish("a");
        assert!(!sup.is_running("a"));
    }

    #[tokio::test]
    async fn test_same_key_shares_lock() {
        let locks = KeyedLocks::new();
        let a = locks.lock_for("s");
        let b = locks.lock_for("s");
        assert!(Arc::ptr_eq(&a, &b));
        let _guard = a.lock().await;
        assert!(b.try_lock().is_err());
        assert!(locks.lock_for("t").try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_release_prunes_only_idle_locks() {
        let locks = KeyedLocks::new();
        let held = locks.lock_for("busy");
        let idle = locks.lock_for("idle");
        drop(idle);
        assert_eq!(locks.len(), 2);

        locks.release("idle");
        locks.release("busy");
        locks.release("never-seen");
        assert_eq!(locks.len(), 1);

        drop(held);
        locks.release("busy");
        assert!(locks.is_empty());
    }
}
