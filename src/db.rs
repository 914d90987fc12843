use migration::{ApplyReport, MigrationEngine, Migrator};
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection,
    sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous},
};

use crate::{config::Config, error::CatalogResult};

/// Connects to the store and brings its schema up to date.
///
/// Any migration error is returned before the connection is handed out, so a store
/// with a defective history never serves reads or writes.
pub async fn connect_and_migrate(config: &Config) -> CatalogResult<(DatabaseConnection, ApplyReport)> {
    let db = Database::connect(connect_options(config)).await?;
    let report = migrate(&db, config).await?;
    Ok((db, report))
}

/// Pool options; the pragmas are applied to every connection the pool opens.
pub(crate) fn connect_options(config: &Config) -> ConnectOptions {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(config.max_connections)
        .sqlx_logging(false)
        .map_sqlx_sqlite_opts(|opts| {
            opts.journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .foreign_keys(true)
        });
    options
}

pub async fn migrate(db: &DatabaseConnection, config: &Config) -> CatalogResult<ApplyReport> {
    let engine = MigrationEngine::new(db.clone())
        .with_lock_timeout(config.migration_lock_timeout, config.migration_lock_poll);
    Ok(engine.apply(&Migrator::steps()).await?)
}


#[cfg(test)]
mod tests {
    use migration::StepStatus;
    use sea_orm::{ConnectionTrait, Statement};
    use tempfile::TempDir;

    use super::testing::{self, catalog};
    use super::*;

    async fn schema_objects(db: &DatabaseConnection, kind: &str) -> Vec<String> {
        let rows = db
            .query_all(Statement::from_string(
                db.get_database_backend(),
                format!("SELECT name FROM sqlite_master WHERE type = '{kind}' AND name NOT LIKE 'sqlite_%' ORDER BY name"),
            ))
            .await
            .unwrap();
        rows.iter().map(|r| r.try_get::<String>("", "name").unwrap()).collect()
    }

    async fn columns(db: &DatabaseConnection, table: &str) -> Vec<String> {
        let rows = db
            .query_all(Statement::from_string(
                db.get_database_backend(),
                format!("SELECT name FROM pragma_table_info('{table}')"),
            ))
            .await
            .unwrap();
        rows.iter().map(|r| r.try_get::<String>("", "name").unwrap()).collect()
    }

    async fn pragma<T: sea_orm::TryGetable>(db: &DatabaseConnection, name: &str) -> T {
        let row = db
            .query_one(Statement::from_string(db.get_database_backend(), format!("PRAGMA {name}")))
            .await
            .unwrap()
            .unwrap();
        row.try_get::<T>("", name).unwrap()
    }

    #[tokio::test]
    async fn full_history_builds_the_catalog_namespace() {
        let catalog = catalog().await;
        let tables = schema_objects(catalog.db(), "table").await;
        for table in [
            "content_film_work",
            "content_genre",
            "content_genre_film_work",
            "content_person",
            "content_person_film_work",
        ] {
            assert!(tables.contains(&table.to_string()), "{table}");
        }

        let indexes = schema_objects(catalog.db(), "index").await;
        for index in [
            "film_work_genre_idx",
            "film_work_person_role_idx",
            "film_work_person_idx",
            "film_work_rating_idx",
            "film_work_title_idx",
            "film_work_type_idx",
            "genre_name_idx",
            "person_full_name_idx",
        ] {
            assert!(indexes.contains(&index.to_string()), "{index}");
        }
    }

    #[tokio::test]
    async fn retired_and_late_fields_follow_the_history() {
        let catalog = catalog().await;
        assert!(!columns(catalog.db(), "content_person").await.contains(&"gender".to_string()));
        assert!(columns(catalog.db(), "content_film_work").await.contains(&"file_path".to_string()));

        let junction = columns(catalog.db(), "content_genre_film_work").await;
        assert!(junction.contains(&"film_work_id".to_string()));
        assert!(junction.contains(&"genre_id".to_string()));
    }

    #[tokio::test]
    async fn second_run_applies_nothing() {
        let catalog = catalog().await;
        let before = schema_objects(catalog.db(), "index").await;

        let report = migrate(catalog.db(), &testing::memory_config()).await.unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(report.skipped.len(), Migrator::steps().len());
        assert_eq!(schema_objects(catalog.db(), "index").await, before);

        let steps = Migrator::steps();
        let status = MigrationEngine::new(catalog.db().clone()).status(&steps).await.unwrap();
        assert!(status.iter().all(|(_, s)| matches!(s, StepStatus::Applied(_))));
    }

    #[tokio::test]
    async fn file_store_migrates_through_a_connection_pool() {
        let dir = TempDir::new().unwrap();
        let config = testing::file_config(&dir, 3);

        let (db, report) = connect_and_migrate(&config).await.unwrap();
        assert_eq!(report.applied.len(), Migrator::steps().len());
        assert!(!columns(&db, "content_person").await.contains(&"gender".to_string()));
        assert_eq!(pragma::<String>(&db, "journal_mode").await, "wal");
        assert_eq!(pragma::<i32>(&db, "foreign_keys").await, 1);
        db.close().await.unwrap();

        let (db, report) = connect_and_migrate(&config).await.unwrap();
        assert!(report.applied.is_empty());
        assert_eq!(report.skipped.len(), Migrator::steps().len());
        db.close().await.unwrap();
    }
}
