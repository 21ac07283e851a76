//! Versioned schema for the SQLite backend.
//!
//! Each migration runs in its own transaction and is recorded in
//! `schema_migrations`; running the list again is a no-op.

use chrono::Utc;
use pts_core::{PtsError, Result};
use sqlx::{Row, sqlite::SqlitePool};

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub statements: &'static [&'static str],
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_workspaces_and_projects",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS workspaces (
                id TEXT PRIMARY KEY,
                slug TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                identifier TEXT NOT NULL,
                estimate_id TEXT REFERENCES estimates(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        ],
    },
    Migration {
        version: 2,
        name: "create_estimates",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS estimates (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (project_id, name)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS estimate_points (
                id TEXT PRIMARY KEY,
                estimate_id TEXT NOT NULL REFERENCES estimates(id) ON DELETE CASCADE,
                "key" INTEGER NOT NULL CHECK ("key" >= 0 AND "key" <= 12),
                value TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (estimate_id, "key")
            )
            "#,
        ],
    },
    Migration {
        version: 3,
        name: "create_issues",
        statements: &[
            r#"
            CREATE TABLE IF NOT EXISTS issues (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                estimate_ref TEXT REFERENCES estimates(id) ON DELETE SET NULL,
                estimate_point_ref TEXT REFERENCES estimate_points(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_issues_point ON issues(project_id, estimate_point_ref)",
        ],
    },
    Migration {
        version: 4,
        name: "estimate_lookup_indexes",
        statements: &[
            "CREATE INDEX IF NOT EXISTS idx_estimates_project ON estimates(project_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_projects_workspace ON projects(workspace_id)",
        ],
    },
];

/// Applies every migration newer than the recorded version and returns the
/// versions that ran.
pub async fn run(pool: &SqlitePool) -> Result<Vec<i64>> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| PtsError::Storage(format!("migration failed: {}", e)))?;

    let current = current_version(pool).await?;
    let mut applied = Vec::new();

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| PtsError::Storage(format!("transaction failed: {}", e)))?;

        for statement in migration.statements {
            sqlx::query(statement).execute(&mut *tx).await.map_err(|e| {
                PtsError::Storage(format!("migration {} failed: {}", migration.name, e))
            })?;
        }

        sqlx::query("INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| PtsError::Storage(format!("migration failed: {}", e)))?;

        tx.commit().await.map_err(|e| PtsError::Storage(format!("commit failed: {}", e)))?;

        tracing::info!(version = migration.version, name = migration.name, "applied migration");
        applied.push(migration.version);
    }

    Ok(applied)
}

/// Highest applied version, 0 on a fresh database.
pub async fn current_version(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COALESCE(MAX(version), 0) AS version FROM schema_migrations")
        .fetch_one(pool)
        .await
        .map_err(|e| PtsError::Storage(format!("query failed: {}", e)))?;
    row.try_get("version").map_err(|e| PtsError::Storage(format!("query failed: {}", e)))
}
