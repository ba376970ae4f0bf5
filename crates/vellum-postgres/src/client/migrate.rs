//! Database migration management.
//!
//! This module applies the embedded schema migrations through an extension
//! trait on [`PgClient`], and exposes utilities for inspecting migration
//! state. Migrations run on a dedicated pooled connection moved onto a
//! blocking task, since the Diesel migration harness is synchronous.

use std::ops::DerefMut;
use std::time::{Duration, Instant};

use diesel::migration::{Migration, MigrationName, MigrationSource};
use diesel::pg::Pg;
use diesel_async::RunQueryDsl;
use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::MigrationHarness;
use tokio::task::spawn_blocking;

use crate::{MIGRATIONS, PgClient, PgConnection, PgError, PgResult, TRACING_TARGET_MIGRATION};

/// Migration status information.
///
/// Describes which migration versions have been applied to the database
/// and which are still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// List of applied migration versions in chronological order
    pub applied_versions: Vec<String>,
    /// List of pending migration versions
    pub pending_versions: Vec<String>,
}

impl MigrationStatus {
    /// Creates a new migration status.
    pub fn new(
        applied_versions: impl Into<Vec<String>>,
        pending_versions: impl Into<Vec<String>>,
    ) -> Self {
        Self {
            applied_versions: applied_versions.into(),
            pending_versions: pending_versions.into(),
        }
    }

    /// Returns the last applied migration version, if any.
    pub fn last_applied_version(&self) -> Option<&str> {
        self.applied_versions.last().map(|s| s.as_str())
    }

    /// Returns the number of applied migrations.
    #[inline]
    pub fn applied_migrations(&self) -> usize {
        self.applied_versions.len()
    }

    /// Returns the number of pending migrations.
    #[inline]
    pub fn pending_migrations(&self) -> usize {
        self.pending_versions.len()
    }

    /// Returns true if all migrations have been applied.
    #[inline]
    pub fn is_up_to_date(&self) -> bool {
        self.pending_versions.is_empty()
    }
}

/// Migration operation result information.
///
/// Contains the outcome of a migration run, including how long it took and
/// which versions were processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    /// Total duration of the migration operation
    pub duration: Duration,
    /// List of migration versions that were processed
    pub processed_versions: Vec<String>,
}

impl MigrationResult {
    /// Creates a successful migration result.
    pub fn success(duration: Duration, processed_versions: Vec<String>) -> Self {
        Self {
            duration,
            processed_versions,
        }
    }

    /// Returns whether this result indicates a run with no migrations processed.
    pub fn is_no_op(&self) -> bool {
        self.processed_versions.is_empty()
    }

    /// Returns the last processed migration version, if any.
    pub fn last_processed_version(&self) -> Option<&str> {
        self.processed_versions.last().map(|s| s.as_str())
    }
}

/// Run all pending migrations on the database.
#[tracing::instrument(skip(pg), target = TRACING_TARGET_MIGRATION)]
pub async fn run_pending_migrations(pg: &PgClient) -> PgResult<MigrationResult> {
    tracing::info!(
        target: TRACING_TARGET_MIGRATION,
        "Starting database migration process",
    );

    let start_time = Instant::now();
    let conn = pg.get_pooled_connection().await?;

    // The Diesel migration harness is synchronous, so the connection is moved
    // into a blocking task through the async wrapper and handed back after.
    let mut conn: AsyncConnectionWrapper<_> = conn.into();
    let results = spawn_blocking(move || match conn.run_pending_migrations(MIGRATIONS) {
        Ok(versions) => (
            Ok(versions
                .into_iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()),
            conn,
        ),
        Err(x) => (Err(x), conn),
    })
    .await;

    let duration = start_time.elapsed();
    let (results, mut conn) = results.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_MIGRATION,
            duration = ?duration,
            error = %err,
            "Migration task panicked, join error occurred"
        );

        PgError::Migration(err.into())
    })?;

    let versions = results.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_MIGRATION,
            duration = ?duration,
            error = &err,
            "Database migration process failed"
        );

        PgError::Migration(err)
    })?;

    // Confirm the connection survived the blocking harness before it is
    // returned to the pool.
    verify_schema_integrity(conn.deref_mut()).await?;

    tracing::info!(
        target: TRACING_TARGET_MIGRATION,
        duration = ?duration,
        migrations_count = versions.len(),
        "Database migration process completed successfully"
    );

    Ok(MigrationResult::success(duration, versions))
}

/// Gets the current migration status of the database.
#[tracing::instrument(skip(conn), target = TRACING_TARGET_MIGRATION)]
pub async fn get_migration_status(conn: &mut PgConnection) -> PgResult<MigrationStatus> {
    let applied_versions = get_applied_migrations(conn).await?;

    // Embedded migrations that are not recorded in the migrations table yet.
    let embedded = MigrationSource::<Pg>::migrations(&MIGRATIONS).map_err(PgError::Migration)?;
    let pending_versions: Vec<String> = embedded
        .iter()
        .map(|m| m.name().version().to_string())
        .filter(|version| !applied_versions.contains(version))
        .collect();

    let status = MigrationStatus::new(applied_versions, pending_versions);

    tracing::debug!(
        target: TRACING_TARGET_MIGRATION,
        applied_count = status.applied_migrations(),
        pending_count = status.pending_migrations(),
        is_up_to_date = status.is_up_to_date(),
        "Migration status retrieved"
    );

    Ok(status)
}

/// Gets list of applied migration versions from the database.
#[tracing::instrument(skip(conn), target = TRACING_TARGET_MIGRATION)]
pub async fn get_applied_migrations(conn: &mut PgConnection) -> PgResult<Vec<String>> {
    use diesel::sql_query;

    #[derive(diesel::QueryableByName)]
    struct MigrationVersion {
        #[diesel(sql_type = diesel::sql_types::Text)]
        version: String,
    }

    let versions = sql_query("SELECT version FROM __diesel_schema_migrations ORDER BY version")
        .get_results::<MigrationVersion>(conn)
        .await
        .map_err(|e| PgError::Migration(format!("Failed to get applied migrations: {}", e).into()))?
        .into_iter()
        .map(|row| row.version)
        .collect();

    Ok(versions)
}

/// Verifies the integrity of the database schema.
#[tracing::instrument(skip(conn), target = TRACING_TARGET_MIGRATION)]
pub async fn verify_schema_integrity(conn: &mut PgConnection) -> PgResult<()> {
    use diesel::sql_query;

    #[derive(diesel::QueryableByName)]
    struct ExistsResult {
        #[diesel(sql_type = diesel::sql_types::Bool)]
        exists: bool,
    }

    // Check that migration table exists
    let migration_table_exists: bool = sql_query(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_name = '__diesel_schema_migrations'
         ) as exists",
    )
    .get_result::<ExistsResult>(conn)
    .await
    .map_err(|e| PgError::Migration(format!("Failed to check migration table: {}", e).into()))?
    .exists;

    if !migration_table_exists {
        tracing::warn!(
            target: TRACING_TARGET_MIGRATION,
            "Migration table does not exist, database may not be initialized"
        );
        return Err(PgError::Migration(
            "Migration table __diesel_schema_migrations does not exist".into(),
        ));
    }

    Ok(())
}

/// Extension trait providing migration functionality for [`PgClient`].
///
/// Keeps migration-related methods separate from the core database client
/// implementation.
pub trait PgClientMigrationExt {
    /// Runs all pending database migrations.
    ///
    /// Applies any unapplied migrations to bring the database schema up to
    /// date. Safe to call multiple times.
    ///
    /// # Errors
    ///
    /// Returns an error if any migration fails to apply or if there are
    /// connectivity issues with the database.
    fn run_pending_migrations(&self) -> impl Future<Output = PgResult<MigrationResult>>;

    /// Gets the current migration status of the database.
    ///
    /// # Errors
    ///
    /// Returns an error if there are connectivity issues or if the migration
    /// table cannot be accessed.
    fn get_migration_status(&self) -> impl Future<Output = PgResult<MigrationStatus>>;

    /// Verifies the integrity of the database schema.
    ///
    /// # Errors
    ///
    /// Returns an error if schema integrity issues are detected or if
    /// verification cannot be completed.
    fn verify_schema_integrity(&self) -> impl Future<Output = PgResult<()>>;
}

impl PgClientMigrationExt for PgClient {
    async fn run_pending_migrations(&self) -> PgResult<MigrationResult> {
        run_pending_migrations(self).await
    }

    async fn get_migration_status(&self) -> PgResult<MigrationStatus> {
        let mut conn = self.get_connection().await?;
        get_migration_status(&mut conn).await
    }

    async fn verify_schema_integrity(&self) -> PgResult<()> {
        let mut conn = self.get_connection().await?;
        verify_schema_integrity(&mut conn).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn migration_status_calculations() {
        let applied = vec!["001".to_string(), "002".to_string()];
        let pending = vec!["003".to_string()];
        let status = MigrationStatus::new(applied, pending);

        assert_eq!(status.applied_migrations(), 2);
        assert_eq!(status.pending_migrations(), 1);
        assert_eq!(status.last_applied_version(), Some("002"));
        assert!(!status.is_up_to_date());
    }

    #[test]
    fn migration_status_up_to_date() {
        let status = MigrationStatus::new(vec!["001".to_string()], vec![]);
        assert!(status.is_up_to_date());
    }

    #[test]
    fn migration_result_no_op() {
        let result = MigrationResult::success(Duration::from_millis(100), vec![]);

        assert!(result.is_no_op());
        assert_eq!(result.last_processed_version(), None);
    }
}
