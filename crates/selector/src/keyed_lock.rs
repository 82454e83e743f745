use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use lucky_core::{SelectorError, SelectorResult};

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

/// 按键互斥的锁表
///
/// 每个键一个异步互斥锁，不同键之间互不阻塞。没有持有者和等待者的键会在释放时移除。
#[derive(Clone, Default)]
pub struct KeyedLock {
    table: Arc<Mutex<LockTable>>,
}

/// 键锁的持有凭证，drop时释放
pub struct KeyedLockGuard {
    owner: KeyedLock,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在timeout内获取键锁，超时返回LockTimeout
    pub async fn acquire(&self, key: &str, timeout: Duration) -> SelectorResult<KeyedLockGuard> {
        let entry = {
            let mut table = self.table();
            Arc::clone(table.entry(key.to_string()).or_default())
        };

        let started = Instant::now();
        match tokio::time::timeout(timeout, entry.lock_owned()).await {
            Ok(guard) => {
                debug!("获取键锁: {} (等待 {:?})", key, started.elapsed());
                Ok(KeyedLockGuard {
                    owner: self.clone(),
                    key: key.to_string(),
                    guard: Some(guard),
                })
            }
            Err(_) => {
                self.release_idle(key);
                warn!("获取键锁超时: {} (超时 {:?})", key, timeout);
                Err(SelectorError::LockTimeout {
                    event_type_id: key.to_string(),
                    waited_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }

    /// 当前表中的键数量
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 只有表自身引用该锁时才移除
    fn release_idle(&self, key: &str) {
        let mut table = self.table();
        if let Some(entry) = table.get(key) {
            if Arc::strong_count(entry) == 1 {
                table.remove(key);
            }
        }
    }
}

impl KeyedLockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyedLockGuard {
    fn drop(&mut self) {
        // 先释放互斥锁，再检查是否还有等待者
        drop(self.guard.take());
        self.owner.release_idle(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = KeyedLock::new();
        let guard = locks
            .acquire("intro-call", Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(guard.key(), "intro-call");

        let err = locks
            .acquire("intro-call", Duration::from_millis(20))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, SelectorError::LockTimeout { waited_ms: 20, .. }));

        drop(guard);
        assert!(locks
            .acquire("intro-call", Duration::from_millis(20))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLock::new();
        let _a = locks.acquire("a", Duration::from_millis(20)).await.unwrap();
        let _b = locks.acquire("b", Duration::from_millis(20)).await.unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_idle_keys_are_removed() {
        let locks = KeyedLock::new();
        {
            let _guard = locks.acquire("a", Duration::from_millis(20)).await.unwrap();
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());

        let guard = locks.acquire("b", Duration::from_millis(20)).await.unwrap();
        let _ = locks.acquire("b", Duration::from_millis(10)).await;
        // 超时的等待者不会移除仍被持有的锁
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_waiter_gets_lock_after_release() {
        let locks = KeyedLock::new();
        let guard = locks.acquire("a", Duration::from_millis(50)).await.unwrap();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                locks
                    .acquire("a", Duration::from_secs(1))
                    .await
                    .map(|guard| guard.key().to_string())
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);

        assert_eq!(waiter.await.unwrap().unwrap(), "a");
        assert!(locks.is_empty());
    }
}
