use std::{
    collections::{HashMap, HashSet},
    time::{Duration, Instant},
};

use jiff::Timestamp;
use sea_orm_migration::{
    prelude::*,
    sea_orm::{
        ConnectionTrait, DatabaseConnection, DatabaseTransaction, SqlErr, Statement,
        TransactionTrait, Value,
    },
};

use crate::{
    failure::{MigrationError, MigrationResult},
    step::MigrationStep,
};

pub const RECORD_TABLE: &str = "catalog_migration";
pub const LOCK_TABLE: &str = "catalog_migration_lock";

const LOCK_ROW: i32 = 1;

/// A row of the applied-step record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedStep {
    pub name: String,
    pub kind: String,
    pub applied_at: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepStatus {
    Applied(Timestamp),
    Pending,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

/// Applies migration steps against one store and keeps the durable applied-step record.
#[derive(Clone)]
pub struct MigrationEngine {
    db: DatabaseConnection,
    lock_timeout: Duration,
    lock_poll: Duration,
}

impl MigrationEngine {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, lock_timeout: Duration::from_secs(30), lock_poll: Duration::from_millis(100) }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration, poll: Duration) -> Self {
        self.lock_timeout = timeout;
        self.lock_poll = poll;
        self
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Creates the bookkeeping tables. Safe to call repeatedly.
    pub async fn init(&self) -> MigrationResult<()> {
        let manager = SchemaManager::new(&self.db);
        manager
            .create_table(
                Table::create()
                    .table(Alias::new(RECORD_TABLE))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("name")).string().not_null().primary_key())
                    .col(ColumnDef::new(Alias::new("kind")).string().not_null())
                    .col(ColumnDef::new(Alias::new("applied_at")).big_integer().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                Table::create()
                    .table(Alias::new(LOCK_TABLE))
                    .if_not_exists()
                    .col(ColumnDef::new(Alias::new("id")).integer().not_null().primary_key())
                    .col(ColumnDef::new(Alias::new("acquired_at")).big_integer().not_null())
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    pub async fn applied(&self) -> MigrationResult<Vec<AppliedStep>> {
        self.init().await?;
        let backend = self.db.get_database_backend();
        let rows = self
            .db
            .query_all(Statement::from_string(
                backend,
                format!(r#"SELECT "name", "kind", "applied_at" FROM "{RECORD_TABLE}" ORDER BY "applied_at", "name""#),
            ))
            .await?;

        let mut applied = Vec::with_capacity(rows.len());
        for row in rows {
            let micros: i64 = row.try_get("", "applied_at")?;
            applied.push(AppliedStep {
                name: row.try_get("", "name")?,
                kind: row.try_get("", "kind")?,
                applied_at: Timestamp::from_microsecond(micros).unwrap_or(Timestamp::UNIX_EPOCH),
            });
        }
        Ok(applied)
    }

    pub async fn applied_names(&self) -> MigrationResult<HashSet<String>> {
        Ok(self.applied().await?.into_iter().map(|a| a.name).collect())
    }

    pub async fn is_applied(&self, name: &str) -> MigrationResult<bool> {
        self.init().await?;
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                backend,
                format!(r#"SELECT 1 AS "hit" FROM "{RECORD_TABLE}" WHERE "name" = ?"#),
                [Value::from(name)],
            ))
            .await?;
        Ok(row.is_some())
    }

    /// Steps of `all_steps` not yet recorded, in declaration order.
    pub async fn pending<'a>(
        &self,
        all_steps: &'a [MigrationStep],
    ) -> MigrationResult<Vec<&'a MigrationStep>> {
        let applied = self.applied_names().await?;
        Ok(all_steps.iter().filter(|s| !applied.contains(s.name())).collect())
    }

    pub async fn status<'a>(
        &self,
        all_steps: &'a [MigrationStep],
    ) -> MigrationResult<Vec<(&'a str, StepStatus)>> {
        let applied: HashMap<String, Timestamp> =
            self.applied().await?.into_iter().map(|a| (a.name, a.applied_at)).collect();
        Ok(all_steps
            .iter()
            .map(|s| {
                let status = match applied.get(s.name()) {
                    Some(at) => StepStatus::Applied(*at),
                    None => StepStatus::Pending,
                };
                (s.name(), status)
            })
            .collect())
    }

    /// Applies `steps` in dependency order, skipping any already recorded.
    ///
    /// The whole batch is planned before anything runs, so authoring defects leave the
    /// store untouched. Each step commits together with its record row; the first
    /// failure aborts the rest of the batch.
    pub async fn apply(&self, steps: &[MigrationStep]) -> MigrationResult<ApplyReport> {
        check_unique_names(steps)?;
        self.init().await?;
        self.acquire_lock().await?;

        let outcome = self.apply_locked(steps).await;
        let released = self.release_lock().await;
        let report = outcome?;
        released?;

        tracing::info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "migration batch complete"
        );
        Ok(report)
    }

    async fn apply_locked(&self, steps: &[MigrationStep]) -> MigrationResult<ApplyReport> {
        let applied = self.applied_names().await?;
        let ordered = plan(steps, &applied)?;

        let mut report = ApplyReport::default();
        for step in ordered {
            if applied.contains(step.name()) {
                tracing::debug!(step = step.name(), "already applied, skipping");
                report.skipped.push(step.name().to_string());
                continue;
            }

            let txn = self.db.begin().await?;
            match self.run_step(&txn, step).await {
                Ok(()) => {
                    txn.commit().await.map_err(|source| MigrationError::StepFailed {
                        step: step.name().to_string(),
                        source,
                    })?;
                }
                Err(source) => {
                    txn.rollback().await?;
                    tracing::error!(step = step.name(), error = %source, "migration step failed");
                    return Err(MigrationError::StepFailed { step: step.name().to_string(), source });
                }
            }

            tracing::info!(step = step.name(), kind = %step.kind(), "applied migration step");
            report.applied.push(step.name().to_string());
        }
        Ok(report)
    }

    async fn run_step(&self, txn: &DatabaseTransaction, step: &MigrationStep) -> Result<(), DbErr> {
        // A pooled connection may hold a schema cached before earlier steps committed;
        // touching sqlite_master makes SQLite reload it before the DDL is parsed.
        txn.execute_unprepared("SELECT count(*) FROM sqlite_master").await?;
        let manager = SchemaManager::new(txn);
        step.up(&manager).await?;
        txn.execute(Statement::from_sql_and_values(
            txn.get_database_backend(),
            format!(r#"INSERT INTO "{RECORD_TABLE}" ("name", "kind", "applied_at") VALUES (?, ?, ?)"#),
            [
                Value::from(step.name()),
                Value::from(step.kind().as_str()),
                Value::from(Timestamp::now().as_microsecond()),
            ],
        ))
        .await?;
        Ok(())
    }

    async fn acquire_lock(&self) -> MigrationResult<()> {
        let started = Instant::now();
        let backend = self.db.get_database_backend();
        loop {
            let attempt = self
                .db
                .execute(Statement::from_sql_and_values(
                    backend,
                    format!(r#"INSERT INTO "{LOCK_TABLE}" ("id", "acquired_at") VALUES (?, ?)"#),
                    [Value::from(LOCK_ROW), Value::from(Timestamp::now().as_microsecond())],
                ))
                .await;

            match attempt {
                Ok(_) => return Ok(()),
                Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    let waited = started.elapsed();
                    if waited >= self.lock_timeout {
                        return Err(MigrationError::Locked { waited_ms: waited.as_millis() as u64 });
                    }
                    tracing::warn!(waited_ms = waited.as_millis() as u64, "waiting for migration lock");
                    tokio::time::sleep(self.lock_poll).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn release_lock(&self) -> MigrationResult<()> {
        let backend = self.db.get_database_backend();
        self.db
            .execute(Statement::from_sql_and_values(
                backend,
                format!(r#"DELETE FROM "{LOCK_TABLE}" WHERE "id" = ?"#),
                [Value::from(LOCK_ROW)],
            ))
            .await?;
        Ok(())
    }
}

fn check_unique_names(steps: &[MigrationStep]) -> MigrationResult<()> {
    let mut seen = HashSet::with_capacity(steps.len());
    for step in steps {
        if !seen.insert(step.name()) {
            return Err(MigrationError::DuplicateStep { name: step.name().to_string() });
        }
    }
    Ok(())
}

/// Orders `steps` so every step follows its in-batch predecessors.
///
/// Ties keep declaration order. Predecessors must be applied already or be part of the
/// batch.
pub fn plan<'a>(
    steps: &'a [MigrationStep],
    applied: &HashSet<String>,
) -> MigrationResult<Vec<&'a MigrationStep>> {
    check_unique_names(steps)?;
    let in_batch: HashSet<&str> = steps.iter().map(|s| s.name()).collect();

    for step in steps {
        for dep in step.depends_on() {
            if !applied.contains(dep) && !in_batch.contains(dep.as_str()) {
                return Err(MigrationError::MissingDependency {
                    step: step.name().to_string(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    let mut ordered: Vec<&MigrationStep> = Vec::with_capacity(steps.len());
    let mut placed: HashSet<&str> = HashSet::with_capacity(steps.len());
    while ordered.len() < steps.len() {
        let next = steps.iter().find(|s| {
            !placed.contains(s.name())
                && s.depends_on().iter().all(|d| {
                    placed.contains(d.as_str()) || (applied.contains(d) && !in_batch.contains(d.as_str()))
                })
        });
        let Some(next) = next else {
            let stuck = steps
                .iter()
                .filter(|s| !placed.contains(s.name()))
                .map(|s| s.name().to_string())
                .collect();
            return Err(MigrationError::DependencyCycle { steps: stuck });
        };
        placed.insert(next.name());
        ordered.push(next);
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use sea_orm_migration::sea_orm::{ConnectOptions, Database};

    use super::*;
    use crate::step::StepKind;

    struct Sql {
        name: &'static str,
        sql: &'static str,
    }

    impl MigrationName for Sql {
        fn name(&self) -> &str {
            self.name
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Sql {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for stmt in self.sql.split(';') {
                let stmt = stmt.trim();
                if !stmt.is_empty() {
                    manager.get_connection().execute_unprepared(stmt).await?;
                }
            }
            Ok(())
        }
    }

    fn sql(name: &'static str, sql: &'static str) -> MigrationStep {
        MigrationStep::new(StepKind::CreateTable, Sql { name, sql })
    }

    async fn memory_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        Database::connect(options).await.expect("in-memory sqlite")
    }

    async fn tables(db: &DatabaseConnection) -> Vec<String> {
        let rows = db
            .query_all(Statement::from_string(
                db.get_database_backend(),
                "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name".to_string(),
            ))
            .await
            .unwrap();
        rows.iter().map(|r| r.try_get::<String>("", "name").unwrap()).collect()
    }

    fn names(steps: &[&MigrationStep]) -> Vec<String> {
        steps.iter().map(|s| s.name().to_string()).collect()
    }

    #[test]
    fn plan_puts_predecessors_first() {
        let steps = vec![
            sql("c", "CREATE TABLE c (id INTEGER)").after(&["b"]),
            sql("a", "CREATE TABLE a (id INTEGER)"),
            sql("b", "CREATE TABLE b (id INTEGER)").after(&["a"]),
        ];
        let ordered = plan(&steps, &HashSet::new()).unwrap();
        assert_eq!(names(&ordered), ["a", "b", "c"]);
    }

    #[test]
    fn plan_accepts_already_applied_predecessor() {
        let steps = vec![sql("b", "CREATE TABLE b (id INTEGER)").after(&["a"])];
        let applied = HashSet::from(["a".to_string()]);
        let ordered = plan(&steps, &applied).unwrap();
        assert_eq!(names(&ordered), ["b"]);
    }

    #[test]
    fn plan_rejects_missing_predecessor() {
        let steps = vec![
            sql("a", "CREATE TABLE a (id INTEGER)"),
            sql("b", "CREATE TABLE b (id INTEGER)").after(&["ghost"]),
        ];
        let err = plan(&steps, &HashSet::new()).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::MissingDependency { ref step, ref dependency } if step == "b" && dependency == "ghost"
        ));
    }

    #[test]
    fn plan_rejects_duplicate_names() {
        let steps = vec![sql("a", "SELECT 1"), sql("a", "SELECT 2")];
        let err = plan(&steps, &HashSet::new()).unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateStep { ref name } if name == "a"));
    }

    #[test]
    fn plan_reports_cycles() {
        let steps = vec![sql("a", "SELECT 1").after(&["b"]), sql("b", "SELECT 1").after(&["a"])];
        let err = plan(&steps, &HashSet::new()).unwrap_err();
        assert!(matches!(err, MigrationError::DependencyCycle { ref steps } if steps.len() == 2));
    }

    #[tokio::test]
    async fn apply_twice_is_a_no_op() {
        let engine = MigrationEngine::new(memory_db().await);
        let steps = vec![
            sql("a", "CREATE TABLE a (id INTEGER PRIMARY KEY)"),
            sql("b", "CREATE TABLE b (id INTEGER PRIMARY KEY, a_id INTEGER REFERENCES a(id))")
                .after(&["a"]),
        ];

        let first = engine.apply(&steps).await.unwrap();
        assert_eq!(first.applied, ["a", "b"]);
        let before = tables(engine.db()).await;

        let second = engine.apply(&steps).await.unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.skipped, ["a", "b"]);
        assert_eq!(tables(engine.db()).await, before);
        assert!(engine.is_applied("b").await.unwrap());
        assert!(engine.pending(&steps).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_dependency_leaves_store_untouched() {
        let engine = MigrationEngine::new(memory_db().await);
        let steps = vec![
            sql("a", "CREATE TABLE a (id INTEGER PRIMARY KEY)"),
            sql("b", "CREATE TABLE b (id INTEGER PRIMARY KEY)").after(&["z"]),
        ];

        let err = engine.apply(&steps).await.unwrap_err();
        assert!(matches!(err, MigrationError::MissingDependency { .. }));
        assert!(!tables(engine.db()).await.contains(&"a".to_string()));
        assert!(engine.applied().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_step_rolls_back_and_stops_the_batch() {
        let engine = MigrationEngine::new(memory_db().await);
        let steps = vec![
            sql("a", "CREATE TABLE a (id INTEGER PRIMARY KEY)"),
            sql("b", "CREATE TABLE b (id INTEGER); CREATE TABLE broken (").after(&["a"]),
            sql("c", "CREATE TABLE c (id INTEGER)").after(&["b"]),
        ];

        let err = engine.apply(&steps).await.unwrap_err();
        assert!(matches!(err, MigrationError::StepFailed { ref step, .. } if step == "b"));

        let present = tables(engine.db()).await;
        assert!(present.contains(&"a".to_string()));
        assert!(!present.contains(&"b".to_string()));
        assert!(!present.contains(&"c".to_string()));
        assert!(engine.is_applied("a").await.unwrap());
        assert!(!engine.is_applied("b").await.unwrap());

        let pending = engine.pending(&steps).await.unwrap();
        assert_eq!(names(&pending), ["b", "c"]);

        // The lock is released even though the batch failed.
        let retry = vec![sql("d", "CREATE TABLE d (id INTEGER)")];
        assert_eq!(engine.apply(&retry).await.unwrap().applied, ["d"]);
    }

    #[tokio::test]
    async fn held_lock_times_out_as_retryable() {
        let engine = MigrationEngine::new(memory_db().await)
            .with_lock_timeout(Duration::from_millis(50), Duration::from_millis(10));
        engine.init().await.unwrap();
        engine.acquire_lock().await.unwrap();

        let err = engine.apply(&[sql("a", "CREATE TABLE a (id INTEGER)")]).await.unwrap_err();
        assert!(matches!(err, MigrationError::Locked { .. }));
        assert!(err.is_retryable());
        assert!(!engine.is_applied("a").await.unwrap());

        engine.release_lock().await.unwrap();
        engine.apply(&[sql("a", "CREATE TABLE a (id INTEGER)")]).await.unwrap();
    }

    #[tokio::test]
    async fn status_reports_applied_and_pending() {
        let engine = MigrationEngine::new(memory_db().await);
        engine.apply(&[sql("a", "CREATE TABLE a (id INTEGER)")]).await.unwrap();

        let all = vec![sql("a", "CREATE TABLE a (id INTEGER)"), sql("b", "CREATE TABLE b (id INTEGER)")];
        let status = engine.status(&all).await.unwrap();
        assert!(matches!(status[0], ("a", StepStatus::Applied(_))));
        assert_eq!(status[1], ("b", StepStatus::Pending));
    }
}
