use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lucky_core::{
    AssignmentHistoryStore, AssignmentRecord, FairnessWindow, NewAssignment, SelectorError,
    SelectorResult,
};
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};

/// PostgreSQL分配历史实现
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    /// 创建新的PostgreSQL分配历史仓储
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 运行数据库迁移
    pub async fn run_migrations(pool: &PgPool) -> SelectorResult<()> {
        debug!("Running PostgreSQL assignment history migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS assignment_records (
                id BIGSERIAL PRIMARY KEY,
                event_type_id VARCHAR(255) NOT NULL,
                host_id VARCHAR(255) NOT NULL,
                assigned_at TIMESTAMPTZ NOT NULL
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

    /// 将数据库行转换为AssignmentRecord模型
    fn row_to_record(row: &sqlx::postgres::PgRow) -> SelectorResult<AssignmentRecord> {
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
impl AssignmentHistoryStore for PostgresAssignmentRepository {
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
                    ) AS latest
                    ORDER BY id ASC
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
                WHERE event_type_id = $1
                ORDER BY id DESC
                LIMIT $2
            )
            "#,
        )
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
