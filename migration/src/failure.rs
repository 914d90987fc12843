use sea_orm_migration::prelude::DbErr;

/// Failures raised while planning or applying a migration batch.
///
/// Authoring defects (duplicate names, missing predecessors, cycles) are fatal and
/// must abort startup. `Locked` and busy store errors are worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("migration step `{name}` is declared more than once")]
    DuplicateStep { name: String },

    #[error("migration step `{step}` depends on `{dependency}`, which is neither applied nor part of this batch")]
    MissingDependency { step: String, dependency: String },

    #[error("migration steps form a dependency cycle: {}", steps.join(", "))]
    DependencyCycle { steps: Vec<String> },

    #[error("migration step `{step}` failed")]
    StepFailed {
        step: String,
        #[source]
        source: DbErr,
    },

    #[error("another migration batch holds the store lock (waited {waited_ms} ms)")]
    Locked { waited_ms: u64 },

    #[error(transparent)]
    Store(#[from] DbErr),
}

impl MigrationError {
    pub fn is_retryable(&self) -> bool {
        match self {
            MigrationError::Locked { .. } => true,
            MigrationError::StepFailed { source, .. } | MigrationError::Store(source) => {
                is_busy(source)
            }
            _ => false,
        }
    }
}

/// Busy, locked and pool-timeout errors from the store.
pub fn is_busy(err: &DbErr) -> bool {
    if matches!(err, DbErr::ConnectionAcquire(_)) {
        return true;
    }
    let msg = err.to_string();
    msg.contains("database is locked") || msg.contains("database is busy") || msg.contains("timed out")
}

pub type MigrationResult<T> = Result<T, MigrationError>;
