use filmcatalog::{Catalog, config::Config, db, schema::EntityKind};
use migration::{MigrationEngine, Migrator, StepStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,filmcatalog=debug,migration=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let (db, report) = db::connect_and_migrate(&config).await?;
    tracing::info!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        "schema up to date"
    );

    let steps = Migrator::steps();
    for (name, status) in MigrationEngine::new(db.clone()).status(&steps).await? {
        match status {
            StepStatus::Applied(at) => tracing::debug!(step = name, applied_at = %at, "migration"),
            StepStatus::Pending => tracing::warn!(step = name, "migration pending"),
        }
    }

    let catalog = Catalog::open(db).await?;
    for kind in EntityKind::ALL {
        let rows = catalog.count(kind).await?;
        tracing::info!(entity = %kind, rows, "catalog contents");
    }

    Ok(())
}
