use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::models::approval::{ApprovalRecord, Decision, ManagerLevel};
use crate::models::dashboard::{DashboardQuery, StatusCounts};
use crate::models::request::{text_columns, ChangeRequest, RequestDraft, RequestStatus, RequestType};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// Private in-memory database. A single long-lived connection keeps the
    /// database alive for the lifetime of the pool.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -- Request Operations --

    pub async fn insert_request(&self, req: &NewRequest<'_>) -> anyhow::Result<i64> {
        let status = RequestStatus::PendingL1;
        let mut columns = vec!["created_at", "updated_at", "status", "current_step", "edit_token"];
        columns.extend(RequestType::ALL.iter().map(|t| t.flag_key()));
        let text_cols = text_columns();
        columns.extend(text_cols.iter().copied());

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO requests ({}) VALUES ({})",
            columns.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql)
            .bind(req.now)
            .bind(req.now)
            .bind(status.as_str())
            .bind(status.step())
            .bind(req.edit_token);
        for t in RequestType::ALL {
            query = query.bind(req.draft.is_selected(t) as i64);
        }
        for col in &text_cols {
            query = query.bind(req.draft.get(col));
        }

        let mut tx = self.pool.begin().await?;
        let id = query.execute(&mut *tx).await?.last_insert_rowid();
        tx.commit().await?;
        Ok(id)
    }

    pub async fn get_request(&self, id: i64) -> anyhow::Result<Option<ChangeRequest>> {
        let row = sqlx::query("SELECT * FROM requests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(request_from_row).transpose()
    }

    pub async fn get_request_by_token(&self, token: &str) -> anyhow::Result<Option<ChangeRequest>> {
        let row = sqlx::query("SELECT * FROM requests WHERE edit_token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(request_from_row).transpose()
    }

    /// Overwrite every editable field. Identity, token, status, step and
    /// created_at are left alone.
    pub async fn update_request_fields(
        &self,
        id: i64,
        draft: &RequestDraft,
        now: DateTime<Utc>,
    ) -> anyhow::Result<bool> {
        let text_cols = text_columns();
        let assignments: Vec<String> = RequestType::ALL
            .iter()
            .map(|t| t.flag_key())
            .chain(text_cols.iter().copied())
            .chain(std::iter::once("updated_at"))
            .map(|c| format!("{} = ?", c))
            .collect();
        let sql = format!("UPDATE requests SET {} WHERE id = ?", assignments.join(", "));

        let mut query = sqlx::query(&sql);
        for t in RequestType::ALL {
            query = query.bind(draft.is_selected(t) as i64);
        }
        for col in &text_cols {
            query = query.bind(draft.get(col));
        }
        query = query.bind(now).bind(id);

        let mut tx = self.pool.begin().await?;
        let result = query.execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    // -- Approval Operations --

    pub async fn list_approvals(&self, request_id: i64) -> anyhow::Result<Vec<ApprovalRecord>> {
        let rows = sqlx::query_as::<_, ApprovalRecord>(
            "SELECT id, request_id, level, approver_name, decision, comments, decided_at FROM approvals WHERE request_id = ? ORDER BY level ASC, decided_at ASC, id ASC"
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Move the request from `expected` to `next` and append the decision row,
    /// in one transaction. Returns false, writing nothing, when the request is
    /// no longer in `expected`.
    pub async fn record_decision(&self, d: &NewDecision<'_>) -> anyhow::Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE requests SET status = ?, current_step = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(d.next.as_str())
        .bind(d.next.step())
        .bind(d.decided_at)
        .bind(d.request_id)
        .bind(d.expected.as_str())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"INSERT INTO approvals (request_id, level, approver_name, decision, comments, decided_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(d.request_id)
        .bind(d.level.number() as i64)
        .bind(d.approver_name)
        .bind(d.decision)
        .bind(d.comments)
        .bind(d.decided_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    // -- Dashboard Operations --

    pub async fn status_counts(&self) -> anyhow::Result<StatusCounts> {
        let counts = sqlx::query_as::<_, StatusCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(status = 'Pending L1'), 0) AS pending_l1,
                COALESCE(SUM(status = 'Pending L2'), 0) AS pending_l2,
                COALESCE(SUM(status = 'Approved'), 0) AS approved,
                COALESCE(SUM(status = 'Rejected'), 0) AS rejected
            FROM requests
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }

    pub async fn list_requests(&self, q: &DashboardQuery) -> anyhow::Result<Vec<ChangeRequest>> {
        let mut clauses = Vec::new();
        let mut params: Vec<&str> = Vec::new();

        if let Some(status) = q.filter.status() {
            clauses.push("status = ?");
            params.push(status.as_str());
        }
        if let Some(project) = q.project.as_deref() {
            clauses.push("project_name = ?");
            params.push(project);
        }
        if let Some(unit) = q.unit.as_deref() {
            clauses.push("unit_number = ?");
            params.push(unit);
        }

        let mut sql = String::from("SELECT * FROM requests");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY ");
        sql.push_str(q.sort.order_by());

        let mut query = sqlx::query(&sql);
        for p in params {
            query = query.bind(p);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(request_from_row).collect()
    }

    pub async fn distinct_projects(&self) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT project_name FROM requests ORDER BY project_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn distinct_units(&self) -> anyhow::Result<Vec<String>> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT unit_number FROM requests ORDER BY unit_number",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn request_from_row(row: &SqliteRow) -> anyhow::Result<ChangeRequest> {
    let id: i64 = row.try_get("id")?;
    let raw_status: String = row.try_get("status")?;
    let step: i64 = row.try_get("current_step")?;

    let status = RequestStatus::parse(&raw_status)
        .with_context(|| format!("request {} has unknown status '{}'", id, raw_status))?;
    if status.step() != step {
        anyhow::bail!(
            "request {} has inconsistent status '{}' and step {}",
            id,
            raw_status,
            step
        );
    }

    let mut draft = RequestDraft::default();
    for t in RequestType::ALL {
        let flag: i64 = row.try_get(t.flag_key())?;
        if flag != 0 {
            draft.select(t);
        }
    }
    for col in text_columns() {
        let value: Option<String> = row.try_get(col)?;
        draft.set(col, value.unwrap_or_default());
    }

    Ok(ChangeRequest {
        id,
        edit_token: row.try_get("edit_token")?,
        status,
        step,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        draft,
    })
}

// -- Input structs --

pub struct NewRequest<'a> {
    pub edit_token: &'a str,
    pub draft: &'a RequestDraft,
    pub now: DateTime<Utc>,
}

pub struct NewDecision<'a> {
    pub request_id: i64,
    pub level: ManagerLevel,
    pub expected: RequestStatus,
    pub next: RequestStatus,
    pub approver_name: &'a str,
    pub decision: Decision,
    pub comments: Option<&'a str>,
    pub decided_at: DateTime<Utc>,
}
