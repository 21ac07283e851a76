use crate::locks::EstimateLocks;
use crate::migrations;
use crate::name::generate_estimate_name;
use crate::renumber::shift_down_after;
use crate::service::{
    BATCH_SIZE, CreateIssueRequest, CreateProjectRequest, CreateRequest, CreateWorkspaceRequest,
    DeletePointRequest, DeleteRequest, EstimateService, GetRequest, IssueStore, ListRequest,
    PointValueUpdate, ProjectStore, UpdateRequest,
};
use crate::validation::{check_points, check_updates};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use pts_core::{
    Estimate, EstimatePoint, Issue, NewEstimatePoint, Project, ProjectRef, PtsError, Result,
    Workspace,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// How long a writer waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const PROJECT_COLUMNS: &str =
    "p.id, p.workspace_id, p.name, p.identifier, p.estimate_id, p.created_at, p.updated_at";
const POINT_COLUMNS: &str = r#"id, estimate_id, "key", value, description, project_id,
    workspace_id, created_at, updated_at"#;
const ISSUE_COLUMNS: &str =
    "id, name, project_id, workspace_id, estimate_ref, estimate_point_ref, created_at, updated_at";

/// SQLite-backed service. Multi-step mutations run in one transaction and point
/// mutations of one estimate are serialized by [`EstimateLocks`].
pub struct DatabaseEstimateService {
    pool: SqlitePool,
    locks: EstimateLocks,
}

impl DatabaseEstimateService {
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| PtsError::Config(format!("invalid database url: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);

        // Every connection to an in-memory database would see its own empty
        // database, so those get exactly one connection that never expires.
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let (options, pool_options) = if in_memory {
            let pool_options = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
            (options, pool_options)
        } else {
            // WAL lets readers proceed while one writer holds the lock.
            let options = options.journal_mode(SqliteJournalMode::Wal);
            (options, SqlitePoolOptions::new().max_connections(5))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| PtsError::Storage(format!("database connection failed: {}", e)))?;
        Ok(Self { pool, locks: EstimateLocks::new() })
    }

    pub async fn migrate(&self) -> Result<()> {
        migrations::run(&self.pool).await.map(|_| ())
    }

    pub async fn schema_version(&self) -> Result<i64> {
        migrations::current_version(&self.pool).await
    }

    /// Opens a write transaction. `BEGIN IMMEDIATE` takes the write lock up
    /// front, so a second writer waits out `BUSY_TIMEOUT` instead of failing
    /// when its read lock cannot be upgraded.
    async fn begin(&self) -> Result<sqlx::Transaction<'_, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| PtsError::Storage(format!("transaction failed: {}", e)))
    }
}

fn storage(context: &str) -> impl FnOnce(sqlx::Error) -> PtsError + '_ {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            PtsError::Conflict(format!("{context}: {}", db.message()))
        }
        _ => PtsError::Storage(format!("{context}: {e}")),
    }
}

async fn commit(tx: sqlx::Transaction<'_, Sqlite>) -> Result<()> {
    tx.commit().await.map_err(|e| PtsError::Storage(format!("commit failed: {}", e)))
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn get_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column).map_err(storage("decode failed"))?;
    Uuid::parse_str(&raw).map_err(|e| PtsError::Storage(format!("bad uuid in {column}: {e}")))
}

fn get_opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let raw: Option<String> = row.try_get(column).map_err(storage("decode failed"))?;
    raw.map(|raw| {
        Uuid::parse_str(&raw).map_err(|e| PtsError::Storage(format!("bad uuid in {column}: {e}")))
    })
    .transpose()
}

fn get_time(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.try_get(column).map_err(storage("decode failed"))?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PtsError::Storage(format!("parse date failed: {e}")))
}

fn get_string(row: &SqliteRow, column: &str) -> Result<String> {
    row.try_get(column).map_err(storage("decode failed"))
}

fn project_from_row(row: &SqliteRow) -> Result<Project> {
    Ok(Project {
        id: get_uuid(row, "id")?,
        workspace_id: get_uuid(row, "workspace_id")?,
        name: get_string(row, "name")?,
        identifier: get_string(row, "identifier")?,
        estimate_id: get_opt_uuid(row, "estimate_id")?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

fn point_from_row(row: &SqliteRow) -> Result<EstimatePoint> {
    Ok(EstimatePoint {
        id: get_uuid(row, "id")?,
        estimate_id: get_uuid(row, "estimate_id")?,
        key: row.try_get("key").map_err(storage("decode failed"))?,
        value: get_string(row, "value")?,
        description: get_string(row, "description")?,
        project_id: get_uuid(row, "project_id")?,
        workspace_id: get_uuid(row, "workspace_id")?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

fn issue_from_row(row: &SqliteRow) -> Result<Issue> {
    Ok(Issue {
        id: get_uuid(row, "id")?,
        name: get_string(row, "name")?,
        project_id: get_uuid(row, "project_id")?,
        workspace_id: get_uuid(row, "workspace_id")?,
        estimate_ref: get_opt_uuid(row, "estimate_ref")?,
        estimate_point_ref: get_opt_uuid(row, "estimate_point_ref")?,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

fn estimate_from_row(row: &SqliteRow, points: Vec<EstimatePoint>) -> Result<Estimate> {
    Ok(Estimate {
        id: get_uuid(row, "id")?,
        name: get_string(row, "name")?,
        description: get_string(row, "description")?,
        project_id: get_uuid(row, "project_id")?,
        workspace_id: get_uuid(row, "workspace_id")?,
        points,
        created_at: get_time(row, "created_at")?,
        updated_at: get_time(row, "updated_at")?,
    })
}

async fn fetch_project(conn: &mut SqliteConnection, project: &ProjectRef) -> Result<Project> {
    let sql = format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p JOIN workspaces w ON w.id = p.workspace_id \
         WHERE w.slug = ? AND p.id = ?"
    );
    let row = sqlx::query(&sql)
        .bind(&project.workspace_slug)
        .bind(project.project_id.to_string())
        .fetch_optional(&mut *conn)
        .await
        .map_err(storage("query failed"))?
        .ok_or_else(|| PtsError::not_found("project", project.project_id))?;
    project_from_row(&row)
}

async fn fetch_estimate_row(
    conn: &mut SqliteConnection,
    project: &Project,
    estimate_id: Uuid,
) -> Result<SqliteRow> {
    sqlx::query(
        "SELECT id, name, description, project_id, workspace_id, created_at, updated_at \
         FROM estimates WHERE id = ? AND project_id = ?",
    )
    .bind(estimate_id.to_string())
    .bind(project.id.to_string())
    .fetch_optional(&mut *conn)
    .await
    .map_err(storage("query failed"))?
    .ok_or_else(|| PtsError::not_found("estimate", estimate_id))
}

async fn fetch_points(
    conn: &mut SqliteConnection,
    estimate_id: Uuid,
) -> Result<Vec<EstimatePoint>> {
    let sql = format!(
        r#"SELECT {POINT_COLUMNS} FROM estimate_points WHERE estimate_id = ? ORDER BY "key""#
    );
    sqlx::query(&sql)
        .bind(estimate_id.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(storage("query failed"))?
        .iter()
        .map(point_from_row)
        .collect()
}

async fn fetch_estimate(
    conn: &mut SqliteConnection,
    project: &Project,
    estimate_id: Uuid,
) -> Result<Estimate> {
    let row = fetch_estimate_row(conn, project, estimate_id).await?;
    let points = fetch_points(conn, estimate_id).await?;
    estimate_from_row(&row, points)
}

async fn insert_points(
    conn: &mut SqliteConnection,
    estimate_id: Uuid,
    project: &Project,
    points: &[NewEstimatePoint],
    now: &str,
) -> Result<()> {
    for chunk in points.chunks(BATCH_SIZE) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "INSERT OR IGNORE INTO estimate_points ({POINT_COLUMNS}) "
        ));
        builder.push_values(chunk, |mut b, point| {
            b.push_bind(Uuid::new_v4().to_string())
                .push_bind(estimate_id.to_string())
                .push_bind(point.key)
                .push_bind(point.value.clone())
                .push_bind(point.description.clone())
                .push_bind(project.id.to_string())
                .push_bind(project.workspace_id.to_string())
                .push_bind(now.to_string())
                .push_bind(now.to_string());
        });
        builder.build().execute(&mut *conn).await.map_err(storage("insert failed"))?;
    }
    Ok(())
}

async fn update_values(
    conn: &mut SqliteConnection,
    changes: &[(Uuid, String)],
    now: &str,
) -> Result<()> {
    for chunk in changes.chunks(BATCH_SIZE) {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("UPDATE estimate_points SET value = CASE id");
        for (id, value) in chunk {
            builder
                .push(" WHEN ")
                .push_bind(id.to_string())
                .push(" THEN ")
                .push_bind(value.clone());
        }
        builder.push(" END, updated_at = ").push_bind(now.to_string()).push(" WHERE id IN (");
        let mut ids = builder.separated(", ");
        for (id, _) in chunk {
            ids.push_bind(id.to_string());
        }
        ids.push_unseparated(")");
        builder.build().execute(&mut *conn).await.map_err(storage("update failed"))?;
    }
    Ok(())
}

#[async_trait]
impl EstimateService for DatabaseEstimateService {
    async fn list_points(&self, req: ListRequest) -> Result<Vec<EstimatePoint>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PtsError::Storage(format!("connection failed: {}", e)))?;
        let project = fetch_project(&mut conn, &req.project).await?;
        match project.estimate_id {
            Some(estimate_id) => fetch_points(&mut conn, estimate_id).await,
            None => Ok(Vec::new()),
        }
    }

    async fn list(&self, req: ListRequest) -> Result<Vec<Estimate>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PtsError::Storage(format!("connection failed: {}", e)))?;
        let project = fetch_project(&mut conn, &req.project).await?;

        let rows = sqlx::query(
            "SELECT id, name, description, project_id, workspace_id, created_at, updated_at \
             FROM estimates WHERE project_id = ? ORDER BY created_at, id",
        )
        .bind(project.id.to_string())
        .fetch_all(&mut *conn)
        .await
        .map_err(storage("query failed"))?;

        let mut estimates = Vec::with_capacity(rows.len());
        for row in &rows {
            let points = fetch_points(&mut conn, get_uuid(row, "id")?).await?;
            estimates.push(estimate_from_row(row, points)?);
        }
        Ok(estimates)
    }

    async fn create(&self, req: CreateRequest) -> Result<Estimate> {
        check_points(&req.points)?;

        let mut tx = self.begin().await?;
        let project = fetch_project(&mut tx, &req.project).await?;

        let estimate_id = Uuid::new_v4();
        let name = generate_estimate_name();
        let now = ts(Utc::now());

        sqlx::query(
            "INSERT INTO estimates \
             (id, name, description, project_id, workspace_id, created_at, updated_at) \
             VALUES (?, ?, '', ?, ?, ?, ?)",
        )
        .bind(estimate_id.to_string())
        .bind(&name)
        .bind(project.id.to_string())
        .bind(project.workspace_id.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(storage("insert failed"))?;

        insert_points(&mut tx, estimate_id, &project, &req.points, &now).await?;
        let estimate = fetch_estimate(&mut tx, &project, estimate_id).await?;
        commit(tx).await?;

        if estimate.points.len() < req.points.len() {
            tracing::debug!(
                estimate.id = %estimate_id,
                skipped = req.points.len() - estimate.points.len(),
                "skipped points with duplicate keys"
            );
        }
        tracing::info!(
            estimate.id = %estimate_id,
            project.id = %project.id,
            points = estimate.points.len(),
            "estimate created"
        );
        Ok(estimate)
    }

    async fn get(&self, req: GetRequest) -> Result<Estimate> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PtsError::Storage(format!("connection failed: {}", e)))?;
        let project = fetch_project(&mut conn, &req.project).await?;
        fetch_estimate(&mut conn, &project, req.estimate_id).await
    }

    async fn update(&self, req: UpdateRequest) -> Result<Vec<EstimatePoint>> {
        check_updates(&req.points)?;

        let _guard = self.locks.acquire(req.estimate_id).await;
        let mut tx = self.begin().await?;
        let project = fetch_project(&mut tx, &req.project).await?;
        fetch_estimate_row(&mut tx, &project, req.estimate_id).await?;

        let existing = fetch_points(&mut tx, req.estimate_id).await?;
        let supplied = |id: Uuid| -> Option<&PointValueUpdate> {
            req.points.iter().find(|p| p.id == id)
        };

        let matched_ids: Vec<Uuid> =
            existing.iter().filter(|p| supplied(p.id).is_some()).map(|p| p.id).collect();
        let changes: Vec<(Uuid, String)> = matched_ids
            .iter()
            .filter_map(|id| supplied(*id).and_then(|p| p.value.clone()).map(|v| (*id, v)))
            .collect();

        update_values(&mut tx, &changes, &ts(Utc::now())).await?;

        let matched: Vec<EstimatePoint> = fetch_points(&mut tx, req.estimate_id)
            .await?
            .into_iter()
            .filter(|p| matched_ids.contains(&p.id))
            .collect();
        commit(tx).await?;

        tracing::info!(
            estimate.id = %req.estimate_id,
            updated = changes.len(),
            "estimate points updated"
        );
        Ok(matched)
    }

    async fn delete(&self, req: DeleteRequest) -> Result<()> {
        let _guard = self.locks.acquire(req.estimate_id).await;
        let mut tx = self.begin().await?;
        let project = fetch_project(&mut tx, &req.project).await?;
        fetch_estimate_row(&mut tx, &project, req.estimate_id).await?;

        // Issues lose both references, not only the point one the foreign key clears.
        sqlx::query(
            "UPDATE issues SET estimate_ref = NULL, estimate_point_ref = NULL, updated_at = ? \
             WHERE estimate_ref = ?",
        )
        .bind(ts(Utc::now()))
        .bind(req.estimate_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(storage("update failed"))?;

        sqlx::query("DELETE FROM estimates WHERE id = ?")
            .bind(req.estimate_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(storage("delete failed"))?;
        commit(tx).await?;

        tracing::info!(estimate.id = %req.estimate_id, "estimate deleted");
        Ok(())
    }

    async fn delete_point(&self, req: DeletePointRequest) -> Result<Vec<EstimatePoint>> {
        let _guard = self.locks.acquire(req.estimate_id).await;
        let mut tx = self.begin().await?;
        let project = fetch_project(&mut tx, &req.project).await?;
        fetch_estimate_row(&mut tx, &project, req.estimate_id).await?;

        let points = fetch_points(&mut tx, req.estimate_id).await?;
        let old_point = points
            .iter()
            .find(|p| p.id == req.point_id)
            .cloned()
            .ok_or_else(|| PtsError::not_found("estimate point", req.point_id))?;

        if let Some(target) = req.new_estimate_point_id {
            if target == old_point.id {
                return Err(PtsError::BadRequest(
                    "issues cannot be moved to the point being deleted".into(),
                ));
            }
            if !points.iter().any(|p| p.id == target) {
                return Err(PtsError::not_found("estimate point", target));
            }
        }

        let now = Utc::now();
        let (point_ref, estimate_ref) = match req.new_estimate_point_id {
            Some(target) => (Some(target.to_string()), Some(req.estimate_id.to_string())),
            None => (None, None),
        };
        let moved = sqlx::query(
            "UPDATE issues SET estimate_point_ref = ?, estimate_ref = ?, updated_at = ? \
             WHERE project_id = ? AND estimate_point_ref = ?",
        )
        .bind(point_ref)
        .bind(estimate_ref)
        .bind(ts(now))
        .bind(project.id.to_string())
        .bind(old_point.id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(storage("update failed"))?
        .rows_affected();

        // The removed point goes first so the freed key can be taken by the
        // point above it; the rest follow in ascending key order.
        sqlx::query("DELETE FROM estimate_points WHERE id = ?")
            .bind(old_point.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(storage("delete failed"))?;

        let shifted = shift_down_after(&points, &old_point, now);
        for point in &shifted {
            sqlx::query(r#"UPDATE estimate_points SET "key" = ?, updated_at = ? WHERE id = ?"#)
                .bind(point.key)
                .bind(ts(point.updated_at))
                .bind(point.id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(storage("renumber failed"))?;
        }
        commit(tx).await?;

        tracing::info!(
            estimate.id = %req.estimate_id,
            point.id = %old_point.id,
            point.key = old_point.key,
            renumbered = shifted.len(),
            issues_moved = moved,
            "estimate point deleted"
        );
        Ok(shifted)
    }
}

#[async_trait]
impl ProjectStore for DatabaseEstimateService {
    async fn create_workspace(&self, req: CreateWorkspaceRequest) -> Result<Workspace> {
        let workspace = Workspace {
            id: Uuid::new_v4(),
            slug: req.slug,
            name: req.name,
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO workspaces (id, slug, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(workspace.id.to_string())
            .bind(&workspace.slug)
            .bind(&workspace.name)
            .bind(ts(workspace.created_at))
            .execute(&self.pool)
            .await
            .map_err(storage("insert failed"))?;
        Ok(workspace)
    }

    async fn create_project(&self, req: CreateProjectRequest) -> Result<Project> {
        let row = sqlx::query("SELECT id FROM workspaces WHERE slug = ?")
            .bind(&req.workspace_slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage("query failed"))?
            .ok_or_else(|| PtsError::not_found("workspace", &req.workspace_slug))?;

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            workspace_id: get_uuid(&row, "id")?,
            name: req.name,
            identifier: req.identifier,
            estimate_id: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO projects \
             (id, workspace_id, name, identifier, estimate_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, NULL, ?, ?)",
        )
        .bind(project.id.to_string())
        .bind(project.workspace_id.to_string())
        .bind(&project.name)
        .bind(&project.identifier)
        .bind(ts(now))
        .bind(ts(now))
        .execute(&self.pool)
        .await
        .map_err(storage("insert failed"))?;
        Ok(project)
    }

    async fn get_project(&self, project: ProjectRef) -> Result<Project> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PtsError::Storage(format!("connection failed: {}", e)))?;
        fetch_project(&mut conn, &project).await
    }

    async fn set_active_estimate(
        &self,
        project: ProjectRef,
        estimate_id: Option<Uuid>,
    ) -> Result<Project> {
        let mut tx = self.begin().await?;
        let current = fetch_project(&mut tx, &project).await?;
        if let Some(estimate_id) = estimate_id {
            fetch_estimate_row(&mut tx, &current, estimate_id).await?;
        }

        sqlx::query("UPDATE projects SET estimate_id = ?, updated_at = ? WHERE id = ?")
            .bind(estimate_id.map(|id| id.to_string()))
            .bind(ts(Utc::now()))
            .bind(current.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(storage("update failed"))?;

        let updated = fetch_project(&mut tx, &project).await?;
        commit(tx).await?;
        Ok(updated)
    }
}

#[async_trait]
impl IssueStore for DatabaseEstimateService {
    async fn create_issue(&self, req: CreateIssueRequest) -> Result<Issue> {
        let mut tx = self.begin().await?;
        let project = fetch_project(&mut tx, &req.project).await?;

        let estimate_ref = match req.estimate_point_ref {
            Some(point_id) => {
                let row = sqlx::query(
                    "SELECT estimate_id FROM estimate_points WHERE id = ? AND project_id = ?",
                )
                .bind(point_id.to_string())
                .bind(project.id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage("query failed"))?
                .ok_or_else(|| PtsError::not_found("estimate point", point_id))?;
                Some(get_uuid(&row, "estimate_id")?)
            }
            None => None,
        };

        let now = Utc::now();
        let issue = Issue {
            id: Uuid::new_v4(),
            name: req.name,
            project_id: project.id,
            workspace_id: project.workspace_id,
            estimate_ref,
            estimate_point_ref: req.estimate_point_ref,
            created_at: now,
            updated_at: now,
        };

        let sql = format!("INSERT INTO issues ({ISSUE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)");
        sqlx::query(&sql)
            .bind(issue.id.to_string())
            .bind(&issue.name)
            .bind(issue.project_id.to_string())
            .bind(issue.workspace_id.to_string())
            .bind(issue.estimate_ref.map(|id| id.to_string()))
            .bind(issue.estimate_point_ref.map(|id| id.to_string()))
            .bind(ts(now))
            .bind(ts(now))
            .execute(&mut *tx)
            .await
            .map_err(storage("insert failed"))?;
        commit(tx).await?;
        Ok(issue)
    }

    async fn get_issue(&self, project: ProjectRef, issue_id: Uuid) -> Result<Issue> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PtsError::Storage(format!("connection failed: {}", e)))?;
        let project = fetch_project(&mut conn, &project).await?;

        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ? AND project_id = ?");
        let row = sqlx::query(&sql)
            .bind(issue_id.to_string())
            .bind(project.id.to_string())
            .fetch_optional(&mut *conn)
            .await
            .map_err(storage("query failed"))?
            .ok_or_else(|| PtsError::not_found("issue", issue_id))?;
        issue_from_row(&row)
    }

    async fn list_issues(&self, project: ProjectRef) -> Result<Vec<Issue>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| PtsError::Storage(format!("connection failed: {}", e)))?;
        let project = fetch_project(&mut conn, &project).await?;

        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE project_id = ? ORDER BY created_at, id"
        );
        sqlx::query(&sql)
            .bind(project.id.to_string())
            .fetch_all(&mut *conn)
            .await
            .map_err(storage("query failed"))?
            .iter()
            .map(issue_from_row)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (DatabaseEstimateService, ProjectRef) {
        let service = DatabaseEstimateService::new("sqlite::memory:").await.unwrap();
        service.migrate().await.unwrap();
        service
            .create_workspace(CreateWorkspaceRequest { slug: "acme".into(), name: "Acme".into() })
            .await
            .unwrap();
        let project = service
            .create_project(CreateProjectRequest {
                workspace_slug: "acme".into(),
                name: "Web".into(),
                identifier: "WEB".into(),
            })
            .await
            .unwrap();
        (service, ProjectRef::new("acme", project.id))
    }

    #[tokio::test]
    async fn test_unknown_estimates_leave_no_lock_entries() {
        let (service, project) = seeded().await;

        let update = service
            .update(UpdateRequest {
                project: project.clone(),
                estimate_id: Uuid::new_v4(),
                points: vec![PointValueUpdate { id: Uuid::new_v4(), value: None }],
            })
            .await;
        assert!(matches!(update, Err(PtsError::NotFound(_))));

        let delete_point = service
            .delete_point(DeletePointRequest {
                project: project.clone(),
                estimate_id: Uuid::new_v4(),
                point_id: Uuid::new_v4(),
                new_estimate_point_id: None,
            })
            .await;
        assert!(matches!(delete_point, Err(PtsError::NotFound(_))));

        let delete = service.delete(DeleteRequest { project, estimate_id: Uuid::new_v4() }).await;
        assert!(matches!(delete, Err(PtsError::NotFound(_))));

        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_entry_released_after_success() {
        let (service, project) = seeded().await;
        let estimate = service
            .create(CreateRequest {
                project: project.clone(),
                points: vec![NewEstimatePoint {
                    key: 0,
                    value: "1".into(),
                    description: String::new(),
                }],
            })
            .await
            .unwrap();

        service
            .update(UpdateRequest {
                project,
                estimate_id: estimate.id,
                points: vec![PointValueUpdate {
                    id: estimate.points[0].id,
                    value: Some("2".into()),
                }],
            })
            .await
            .unwrap();
        assert!(service.locks.is_empty());
    }
}
