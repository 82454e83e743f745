use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use lucky_core::{
    models::{EventType, FairnessWindow},
    traits::AssignmentHistoryStore,
    RetentionConfig, SelectorError, SelectorResult,
};

use crate::keyed_lock::KeyedLock;

/// 一次清理的统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionStats {
    pub event_types_scanned: usize,
    pub records_deleted: u64,
    /// 锁等待超时、本轮跳过的事件类型
    pub skipped_event_types: Vec<String>,
    /// 存储中有记录但未配置的事件类型，不做清理
    pub unconfigured_event_types: Vec<String>,
    pub duration_ms: u64,
}

/// 分配记录保留服务
///
/// 删除已经落在公平窗口（乘以保留倍数）之外的记录。与选择共用键锁，
/// 清理不会和同一事件类型的选择交错执行。
pub struct RetentionService {
    history: Arc<dyn AssignmentHistoryStore>,
    locks: KeyedLock,
    lock_timeout: Duration,
    config: RetentionConfig,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    retention_handle: Option<tokio::task::JoinHandle<()>>,
}

impl RetentionService {
    pub fn new(
        history: Arc<dyn AssignmentHistoryStore>,
        locks: KeyedLock,
        lock_timeout: Duration,
        config: RetentionConfig,
    ) -> Self {
        Self {
            history,
            locks,
            lock_timeout,
            config,
            shutdown_tx: None,
            retention_handle: None,
        }
    }

    /// 启动定期清理
    pub async fn start(&mut self, event_types: Vec<EventType>) -> SelectorResult<()> {
        if !self.config.enabled {
            info!("Retention service is disabled");
            return Ok(());
        }

        info!("Starting retention service with config: {:?}", self.config);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let history = Arc::clone(&self.history);
        let locks = self.locks.clone();
        let lock_timeout = self.lock_timeout;
        let config = self.config.clone();

        let handle = tokio::spawn(async move {
            let mut retention_interval = interval(Duration::from_secs(config.interval_seconds));

            loop {
                tokio::select! {
                    _ = retention_interval.tick() => {
                        if let Err(e) = Self::perform_prune(
                            &history,
                            &locks,
                            lock_timeout,
                            &config,
                            &event_types,
                            Utc::now(),
                        )
                        .await
                        {
                            error!("Retention run failed: {}", e);
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("Retention service shutdown requested");
                        break;
                    }
                }
            }
        });

        self.retention_handle = Some(handle);
        Ok(())
    }

    /// 停止定期清理
    pub async fn stop(&mut self) -> SelectorResult<()> {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }

        if let Some(handle) = self.retention_handle.take() {
            if let Err(e) = handle.await {
                warn!("Error waiting for retention service to stop: {}", e);
            }
        }

        info!("Retention service stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.retention_handle.is_some()
    }

    /// 执行一次清理
    pub async fn prune_once(
        &self,
        event_types: &[EventType],
        now: DateTime<Utc>,
    ) -> SelectorResult<RetentionStats> {
        if !self.config.enabled {
            return Ok(RetentionStats::default());
        }

        Self::perform_prune(
            &self.history,
            &self.locks,
            self.lock_timeout,
            &self.config,
            event_types,
            now,
        )
        .await
    }

    async fn perform_prune(
        history: &Arc<dyn AssignmentHistoryStore>,
        locks: &KeyedLock,
        lock_timeout: Duration,
        config: &RetentionConfig,
        event_types: &[EventType],
        now: DateTime<Utc>,
    ) -> SelectorResult<RetentionStats> {
        let start_time = std::time::Instant::now();
        let mut stats = RetentionStats::default();

        let configured: HashSet<&str> = event_types.iter().map(|e| e.id.as_str()).collect();
        match history.event_type_ids().await {
            Ok(stored) => {
                stats.unconfigured_event_types = stored
                    .into_iter()
                    .filter(|id| !configured.contains(id.as_str()))
                    .collect();
                if !stats.unconfigured_event_types.is_empty() {
                    debug!(
                        "未配置的事件类型，跳过其分配记录: {:?}",
                        stats.unconfigured_event_types
                    );
                }
            }
            Err(e) => warn!("查询存储中的事件类型失败，继续清理已配置的事件类型: {}", e),
        }

        for event_type in event_types {
            let _guard = match locks.acquire(&event_type.id, lock_timeout).await {
                Ok(guard) => guard,
                Err(SelectorError::LockTimeout { .. }) => {
                    warn!("事件类型 {} 正在分配中，本轮跳过清理", event_type.id);
                    stats.skipped_event_types.push(event_type.id.clone());
                    continue;
                }
                Err(e) => return Err(e),
            };
            let deleted =
                Self::prune_event_type(history, &event_type.id, &event_type.fairness_window, config, now)
                    .await?;

            stats.event_types_scanned += 1;
            stats.records_deleted += deleted;
            if deleted > 0 {
                debug!("事件类型 {} 清理了 {} 条分配记录", event_type.id, deleted);
            }
        }

        stats.duration_ms = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "Retention run finished: {} event types, {} records deleted, {} skipped in {}ms",
            stats.event_types_scanned,
            stats.records_deleted,
            stats.skipped_event_types.len(),
            stats.duration_ms
        );
        Ok(stats)
    }

    async fn prune_event_type(
        history: &Arc<dyn AssignmentHistoryStore>,
        event_type_id: &str,
        window: &FairnessWindow,
        config: &RetentionConfig,
        now: DateTime<Utc>,
    ) -> SelectorResult<u64> {
        let multiplier = config.retention_multiplier;

        if let Some(cutoff) = window.retention_cutoff(now, multiplier) {
            return history.prune_before(event_type_id, cutoff).await;
        }

        if let Some(keep) = window.retention_keep(multiplier) {
            return history.prune_keep_latest(event_type_id, keep).await;
        }

        Ok(0)
    }
}
