use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lucky_core::{
    AssignmentHistoryStore, AssignmentRecord, FairnessWindow, NewAssignment, SelectorError,
    SelectorResult,
};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

pub struct SqliteAssignmentRepository {
    pool: SqlitePool,
}

impl SqliteAssignmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 创建嵌入式SQLite分配历史，自动初始化数据库
    pub async fn new_embedded(database_url: &str) -> SelectorResult<Self> {
        let pool = Self::connect(database_url, 5).await?;
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// 建立SQLite连接池，数据库文件不存在时自动创建
    pub async fn connect(database_url: &str, max_connections: u32) -> SelectorResult<SqlitePool> {
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
        use std::str::FromStr;

        debug!("Connecting to SQLite assignment history at: {}", database_url);

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| SelectorError::history_unavailable("解析SQLite连接串", e))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .min_connections(1);
        // 内存数据库每个连接相互独立，只能使用单个常驻连接
        if database_url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| SelectorError::history_unavailable("连接SQLite", e))
    }

    /// 运行数据库迁移
    pub async fn run_migrations(pool: &SqlitePool) -> SelectorResult<()> {
        debug!("Running SQLite assignment history migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS assignment_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type_id TEXT NOT NULL,
                host_id TEXT NOT NULL,
                assigned_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| SelectorError::history_unavailable("创建分配记录表", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_assignment_records_event_type \
             ON assignment_records(event_type_id, assigned_at)",
        )
        .execute(pool)
        .await
        .map_err(|e| SelectorError::history_unavailable("创建分配记录索引", e))?;

        Ok(())
    }

    fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> SelectorResult<AssignmentRecord> {
        let map_err = |e: sqlx::Error| SelectorError::history_unavailable("解析分配记录", e);
        Ok(AssignmentRecord {
            id: row.try_get("id").map_err(map_err)?,
            event_type_id: row.try_get("event_type_id").map_err(map_err)?,
            host_id: row.try_get("host_id").map_err(map_err)?,
            assigned_at: row.try_get("assigned_at").map_err(map_err)?,
        })
    }
}

#[async_trait]
impl AssignmentHistoryStore for SqliteAssignmentRepository {
    #[instrument(skip(self, window))]
    async fn records_in_window(
        &self,
        event_type_id: &str,
        window: &FairnessWindow,
        now: DateTime<Utc>,
    ) -> SelectorResult<Vec<AssignmentRecord>> {
        let rows = match (window.max_records(), window.cutoff(now)) {
            (Some(limit), _) => {
                sqlx::query(
                    r#"
                    SELECT id, event_type_id, host_id, assigned_at FROM (
                        SELECT id, event_type_id, host_id, assigned_at
                        FROM assignment_records
                        WHERE event_type_id = $1
                        ORDER BY id DESC
                        LIMIT $2
                    ) ORDER BY id ASC
                    "#,
                )
                .bind(event_type_id)
                .bind(i64::try_from(limit).unwrap_or(i64::MAX))
                .fetch_all(&self.pool)
                .await
            }
            (None, Some(cutoff)) => {
                sqlx::query(
                    "SELECT id, event_type_id, host_id, assigned_at
                     FROM assignment_records
                     WHERE event_type_id = $1 AND assigned_at >= $2
                     ORDER BY id ASC",
                )
                .bind(event_type_id)
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await
            }
            (None, None) => {
                sqlx::query(
                    "SELECT id, event_type_id, host_id, assigned_at
                     FROM assignment_records
                     WHERE event_type_id = $1
                     ORDER BY id ASC",
                )
                .bind(event_type_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| SelectorError::history_unavailable("读取分配历史", e))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    #[instrument(skip(self, assignment), fields(
        event_type_id = %assignment.event_type_id,
        host_id = %assignment.host_id,
    ))]
    async fn append(&self, assignment: &NewAssignment) -> SelectorResult<AssignmentRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO assignment_records (event_type_id, host_id, assigned_at)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&assignment.event_type_id)
        .bind(&assignment.host_id)
        .bind(assignment.assigned_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| SelectorError::history_unavailable("追加分配记录", e))?;

        let id: i64 = row
            .try_get("id")
            .map_err(|e| SelectorError::history_unavailable("读取分配记录ID", e))?;

        debug!("追加分配记录成功: ID {}", id);
        Ok(assignment.clone().into_record(id))
    }

    async fn prune_before(
        &self,
        event_type_id: &str,
        cutoff: DateTime<Utc>,
    ) -> SelectorResult<u64> {
        let result = sqlx::query(
            "DELETE FROM assignment_records WHERE event_type_id = $1 AND assigned_at < $2",
        )
        .bind(event_type_id)
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(|e| SelectorError::history_unavailable("清理过期分配记录", e))?;

        Ok(result.rows_affected())
    }

    async fn prune_keep_latest(&self, event_type_id: &str, keep: u64) -> SelectorResult<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM assignment_records
            WHERE event_type_id = $1 AND id NOT IN (
                SELECT id FROM assignment_records
                WHERE event_type_id = $2
                ORDER BY id DESC
                LIMIT $3
            )
            "#,
        )
        .bind(event_type_id)
        .bind(event_type_id)
        .bind(i64::try_from(keep).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await
        .map_err(|e| SelectorError::history_unavailable("清理超出窗口的分配记录", e))?;

        Ok(result.rows_affected())
    }

    async fn event_type_ids(&self) -> SelectorResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT event_type_id FROM assignment_records ORDER BY event_type_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SelectorError::history_unavailable("查询事件类型", e))?;

        rows.iter()
            .map(|row| {
                row.try_get("event_type_id")
                    .map_err(|e| SelectorError::history_unavailable("解析事件类型", e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    async fn setup_repository() -> SqliteAssignmentRepository {
        SqliteAssignmentRepository::new_embedded("sqlite::memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_append_and_read_back() {
        let repo = setup_repository().await;
        let now = Utc::now();

        let first = repo
            .append(&NewAssignment::new("intro", "alice", now))
            .await
            .unwrap();
        let second = repo
            .append(&NewAssignment::new("intro", "bob", now))
            .await
            .unwrap();
        repo.append(&NewAssignment::new("other", "carol", now))
            .await
            .unwrap();
        assert!(second.id > first.id);

        let records = repo
            .records_in_window("intro", &FairnessWindow::TrailingBookings { count: 10 }, now)
            .await
            .unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(records[0].host_id, "alice");
        assert_eq!(records[1].event_type_id, "intro");
        assert_eq!(repo.event_type_ids().await.unwrap(), vec!["intro", "other"]);
    }

    #[tokio::test]
    async fn test_trailing_bookings_returns_latest_in_order() {
        let repo = setup_repository().await;
        let now = Utc::now();
        for host in ["a", "b", "c", "d"] {
            repo.append(&NewAssignment::new("intro", host, now))
                .await
                .unwrap();
        }

        let records = repo
            .records_in_window("intro", &FairnessWindow::TrailingBookings { count: 3 }, now)
            .await
            .unwrap();
        let hosts: Vec<&str> = records.iter().map(|r| r.host_id.as_str()).collect();
        assert_eq!(hosts, vec!["b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_trailing_period_and_prune_before() {
        let repo = setup_repository().await;
        let now = Utc::now();
        repo.append(&NewAssignment::new("intro", "old", now - TimeDelta::days(3)))
            .await
            .unwrap();
        repo.append(&NewAssignment::new("intro", "fresh", now - TimeDelta::minutes(1)))
            .await
            .unwrap();

        let window = FairnessWindow::TrailingPeriod { seconds: 86_400 };
        let records = repo.records_in_window("intro", &window, now).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].host_id, "fresh");

        let deleted = repo
            .prune_before("intro", now - TimeDelta::days(1))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
    }

    #[tokio::test]
    async fn test_prune_keep_latest() {
        let repo = setup_repository().await;
        let now = Utc::now();
        for host in ["a", "b", "c", "d"] {
            repo.append(&NewAssignment::new("intro", host, now))
                .await
                .unwrap();
        }
        repo.append(&NewAssignment::new("other", "z", now))
            .await
            .unwrap();

        assert_eq!(repo.prune_keep_latest("intro", 2).await.unwrap(), 2);

        let records = repo
            .records_in_window("intro", &FairnessWindow::TrailingBookings { count: 10 }, now)
            .await
            .unwrap();
        let hosts: Vec<&str> = records.iter().map(|r| r.host_id.as_str()).collect();
        assert_eq!(hosts, vec!["c", "d"]);

        let other = repo
            .records_in_window("other", &FairnessWindow::TrailingBookings { count: 10 }, now)
            .await
            .unwrap();
        assert_eq!(other.len(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_reports_history_unavailable() {
        let repo = setup_repository().await;
        repo.pool.close().await;

        let err = repo
            .records_in_window("intro", &FairnessWindow::TrailingBookings { count: 1 }, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, SelectorError::HistoryUnavailable(_)));
    }
}
