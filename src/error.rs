use migration::MigrationError;
use sea_orm::{DbErr, SqlErr};
use uuid::Uuid;

use crate::schema::{EntityDef, EntityKind};

/// Everything a catalog read or write can fail with.
///
/// Validation, constraint, reference and not-found errors are caller feedback and
/// carry enough detail to render a precise message. Store errors are surfaced as-is,
/// and busy or timed-out ones are retryable.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("invalid `{field}`: {reason}")]
    Validation { field: String, reason: String },

    #[error("constraint `{constraint_name}` violated")]
    ConstraintViolation { constraint_name: String },

    #[error("referenced {missing_reference} does not exist")]
    ReferentialIntegrity { missing_reference: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Store(DbErr),
}

impl CatalogError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CatalogError::Validation { field: field.into(), reason: reason.into() }
    }

    pub fn missing(kind: EntityKind, id: Uuid) -> Self {
        CatalogError::ReferentialIntegrity { missing_reference: format!("{kind} {id}") }
    }

    /// Replaces the store's description of a uniqueness failure with the name of the
    /// matching rule declared on `def`.
    pub fn for_entity(self, def: &EntityDef) -> Self {
        match self {
            CatalogError::ConstraintViolation { constraint_name } => {
                let constraint_name = def
                    .unique_violated(&constraint_name)
                    .map_or(constraint_name, |unique| unique.name.to_string());
                CatalogError::ConstraintViolation { constraint_name }
            }
            other => other,
        }
    }

    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CatalogError::Validation { .. }
                | CatalogError::ConstraintViolation { .. }
                | CatalogError::ReferentialIntegrity { .. }
                | CatalogError::NotFound { .. }
        )
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Migration(err) => err.is_retryable(),
            CatalogError::Store(err) => migration::is_busy(err),
            _ => false,
        }
    }
}

impl From<DbErr> for CatalogError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                CatalogError::ConstraintViolation { constraint_name: detail }
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                CatalogError::ReferentialIntegrity { missing_reference: detail }
            }
            _ => {
                let message = err.to_string();
                if let Some(field) = failed_check(&message) {
                    CatalogError::validation(field, "rejected by store check constraint")
                } else if message.contains("UNIQUE constraint failed") {
                    CatalogError::ConstraintViolation { constraint_name: message }
                } else if message.contains("FOREIGN KEY constraint failed") {
                    CatalogError::ReferentialIntegrity { missing_reference: message }
                } else {
                    CatalogError::Store(err)
                }
            }
        }
    }
}

/// Leading column name of a SQLite `CHECK constraint failed: <expr>` message.
fn failed_check(message: &str) -> Option<String> {
    let (_, expr) = message.split_once("CHECK constraint failed: ")?;
    let field: String = expr
        .trim_start_matches(['"', '`'])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    (!field.is_empty()).then_some(field)
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::entity;

    #[test]
    fn check_failures_name_the_column() {
        assert_eq!(
            failed_check("error returned from database: (code: 275) CHECK constraint failed: \"rating\" BETWEEN 0 AND 100"),
            Some("rating".to_string())
        );
        assert_eq!(failed_check("CHECK constraint failed: film_work_id IS NOT NULL"), Some("film_work_id".to_string()));
        assert_eq!(failed_check("no such table: content_genre"), None);
    }

    #[test]
    fn uniqueness_failures_take_the_declared_rule_name() {
        let def = entity(EntityKind::GenreFilmWork);
        let err = CatalogError::ConstraintViolation {
            constraint_name: "UNIQUE constraint failed: content_genre_film_work.film_work_id, content_genre_film_work.genre_id".into(),
        }
        .for_entity(def);
        assert!(matches!(err, CatalogError::ConstraintViolation { ref constraint_name } if constraint_name == "film_work_genre_idx"));

        let raw = "UNIQUE constraint failed: content_genre_film_work.id";
        let err = CatalogError::ConstraintViolation { constraint_name: raw.into() }.for_entity(def);
        assert!(matches!(err, CatalogError::ConstraintViolation { ref constraint_name } if constraint_name == raw));

        let err = CatalogError::validation("rating", "out of range").for_entity(def);
        assert!(matches!(err, CatalogError::Validation { .. }));
    }

    #[test]
    fn feedback_errors_are_user_facing() {
        assert!(CatalogError::validation("title", "required").is_user_facing());
        assert!(CatalogError::missing(EntityKind::Genre, Uuid::nil()).is_user_facing());
        assert!(!CatalogError::Store(DbErr::Custom("boom".into())).is_user_facing());
        assert!(CatalogError::Migration(MigrationError::Locked { waited_ms: 5 }).is_retryable());
    }
}
