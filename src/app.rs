use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::info;

use lucky_core::{AppConfig, EventType, FairnessWindow, Host};
use lucky_infrastructure::DatabaseManager;
use lucky_selector::{HostLoad, HostSelector, RetentionService, RetentionStats, Selection};

/// 命令行子命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// 为一次预订选出主持人
    Select {
        event_type: String,
        candidates: Option<Vec<String>>,
    },
    /// 连续执行多次选择，输出分配顺序和最终分布
    Simulate {
        event_type: String,
        count: u32,
        candidates: Option<Vec<String>>,
    },
    /// 查看当前窗口内的分配分布
    Stats { event_type: String },
    /// 清理超出保留范围的分配记录
    Prune,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub event_type_id: String,
    pub selections: Vec<String>,
    pub distribution: Vec<HostLoad>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub event_type_id: String,
    pub fairness_window: FairnessWindow,
    pub total: u64,
    pub hosts: Vec<HostLoad>,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    database: DatabaseManager,
    selector: Arc<HostSelector>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig) -> Result<Self> {
        info!("连接分配历史存储: {}", mask_database_url(&config.database.url));

        let database = DatabaseManager::new(&config.database)
            .await
            .context("初始化分配历史存储失败")?;
        let selector = Arc::new(HostSelector::new(
            database.history_store(),
            &config.selector,
        ));

        Ok(Self {
            config,
            database,
            selector,
        })
    }

    /// 执行子命令，返回可直接输出的JSON
    pub async fn execute(&self, command: AppCommand) -> Result<serde_json::Value> {
        let output = match command {
            AppCommand::Select {
                event_type,
                candidates,
            } => serde_json::to_value(self.select(&event_type, candidates.as_deref()).await?)?,
            AppCommand::Simulate {
                event_type,
                count,
                candidates,
            } => serde_json::to_value(
                self.simulate(&event_type, count, candidates.as_deref())
                    .await?,
            )?,
            AppCommand::Stats { event_type } => serde_json::to_value(self.stats(&event_type).await?)?,
            AppCommand::Prune => serde_json::to_value(self.prune().await?)?,
        };
        Ok(output)
    }

    pub async fn select(
        &self,
        event_type_id: &str,
        candidate_ids: Option<&[String]>,
    ) -> Result<Selection> {
        let event_type = self.config.event_type(event_type_id)?;
        let candidates = resolve_candidates(event_type, candidate_ids)?;

        let selection = self
            .selector
            .select_host(event_type, &candidates)
            .await
            .with_context(|| format!("事件类型 {event_type_id} 选择主持人失败"))?;
        Ok(selection)
    }

    pub async fn simulate(
        &self,
        event_type_id: &str,
        count: u32,
        candidate_ids: Option<&[String]>,
    ) -> Result<SimulationReport> {
        let event_type = self.config.event_type(event_type_id)?;
        let candidates = resolve_candidates(event_type, candidate_ids)?;

        let mut selections = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let selection = self.selector.select_host(event_type, &candidates).await?;
            selections.push(selection.host.id);
        }

        info!("事件类型 {} 模拟分配 {} 次", event_type_id, count);
        Ok(SimulationReport {
            event_type_id: event_type_id.to_string(),
            selections,
            distribution: self.selector.distribution(event_type).await?,
        })
    }

    pub async fn stats(&self, event_type_id: &str) -> Result<StatsReport> {
        let event_type = self.config.event_type(event_type_id)?;
        let hosts = self.selector.distribution(event_type).await?;

        Ok(StatsReport {
            event_type_id: event_type_id.to_string(),
            fairness_window: event_type.fairness_window,
            total: hosts.iter().map(|load| load.count).sum(),
            hosts,
        })
    }

    pub async fn prune(&self) -> Result<RetentionStats> {
        let service = RetentionService::new(
            self.selector.history(),
            self.selector.locks(),
            self.config.selector.lock_timeout(),
            self.config.retention.clone(),
        );

        let stats = service
            .prune_once(&self.config.event_types, Utc::now())
            .await
            .context("清理分配记录失败")?;
        Ok(stats)
    }

    pub async fn shutdown(&self) {
        self.database.close().await;
        info!("分配历史存储已关闭");
    }
}

/// 未指定候选时使用事件类型的全部主持人
fn resolve_candidates(event_type: &EventType, candidate_ids: Option<&[String]>) -> Result<Vec<Host>> {
    match candidate_ids {
        Some(ids) => Ok(event_type.candidates_from_ids(ids)?),
        None => Ok(event_type.hosts.clone()),
    }
}

/// 屏蔽数据库URL中的敏感信息
fn mask_database_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let mut masked = url.to_string();
            masked.replace_range(colon_pos + 1..at_pos, "***");
            return masked;
        }
    }
    url.to_string()
}
