pub use sea_orm_migration::prelude::*;
pub use sea_orm_migration::sea_orm;

mod engine;
mod failure;
mod m20241004_000001_create_film_work;
mod m20241004_000002_create_genre;
mod m20241004_000003_create_genre_film_work;
mod m20241004_000004_create_person;
mod m20241004_000005_create_person_film_work;
mod ops;
mod step;

use sea_orm_migration::schema::{string_null, text_null};

pub use engine::{
    AppliedStep, ApplyReport, LOCK_TABLE, MigrationEngine, RECORD_TABLE, StepStatus, plan,
};
pub use failure::{MigrationError, MigrationResult, is_busy};
pub use ops::{AddField, AddForeignKey, AddIndex, DropField};
pub use step::{MigrationStep, StepKind};

/// Closed interval enforced on `content_film_work.rating`.
pub const RATING_MIN: f64 = 0.0;
pub const RATING_MAX: f64 = 100.0;

pub const FILM_WORK_TABLE: &str = "content_film_work";
pub const GENRE_TABLE: &str = "content_genre";
pub const PERSON_TABLE: &str = "content_person";
pub const GENRE_FILM_WORK_TABLE: &str = "content_genre_film_work";
pub const PERSON_FILM_WORK_TABLE: &str = "content_person_film_work";

pub const CREATE_FILM_WORK: &str = "m20241004_000001_create_film_work";
pub const CREATE_GENRE: &str = "m20241004_000002_create_genre";
pub const CREATE_GENRE_FILM_WORK: &str = "m20241004_000003_create_genre_film_work";
pub const CREATE_PERSON: &str = "m20241004_000004_create_person";
pub const CREATE_PERSON_FILM_WORK: &str = "m20241004_000005_create_person_film_work";
pub const PERSON_FULL_NAME_IDX: &str = "m20241004_000006_person_full_name_idx";
pub const GENRE_FILM_WORK_FILM_WORK_FK: &str = "m20241004_000007_genre_film_work_film_work_fk";
pub const GENRE_FILM_WORK_GENRE_FK: &str = "m20241004_000008_genre_film_work_genre_fk";
pub const GENRE_NAME_IDX: &str = "m20241004_000009_genre_name_idx";
pub const FILM_WORK_PERSON_ROLE_UNIQUE: &str = "m20241004_000010_film_work_person_role_unique";
pub const FILM_WORK_GENRE_UNIQUE: &str = "m20241004_000011_film_work_genre_unique";
pub const FILM_WORK_TITLE_IDX: &str = "m20241004_000012_film_work_title_idx";
pub const FILM_WORK_RATING_IDX: &str = "m20241004_000013_film_work_rating_idx";
pub const FILM_WORK_TYPE_IDX: &str = "m20241004_000014_film_work_type_idx";
pub const FILM_WORK_PERSON_IDX: &str = "m20241004_000015_film_work_person_idx";
pub const ADD_PERSON_GENDER: &str = "m20241011_000001_add_person_gender";
pub const DROP_PERSON_GENDER: &str = "m20241018_000001_drop_person_gender";
pub const ADD_FILM_WORK_FILE_PATH: &str = "m20241025_000001_add_film_work_file_path";

/// Store-level constraint names, as reported back to callers.
pub const FILM_WORK_GENRE_CONSTRAINT: &str = "film_work_genre_idx";
pub const FILM_WORK_PERSON_ROLE_CONSTRAINT: &str = "film_work_person_role_idx";

pub struct Migrator;

impl Migrator {
    /// The catalog's full schema history, oldest first.
    pub fn steps() -> Vec<MigrationStep> {
        vec![
            MigrationStep::new(StepKind::CreateTable, m20241004_000001_create_film_work::Migration),
            MigrationStep::new(StepKind::CreateTable, m20241004_000002_create_genre::Migration),
            MigrationStep::new(
                StepKind::CreateTable,
                m20241004_000003_create_genre_film_work::Migration,
            ),
            MigrationStep::new(StepKind::CreateTable, m20241004_000004_create_person::Migration),
            MigrationStep::new(
                StepKind::CreateTable,
                m20241004_000005_create_person_film_work::Migration,
            )
            .after(&[CREATE_FILM_WORK, CREATE_PERSON]),
            index(PERSON_FULL_NAME_IDX, "person_full_name_idx", PERSON_TABLE, &["full_name"])
                .after(&[CREATE_PERSON]),
            MigrationStep::new(
                StepKind::AddForeignKey,
                AddForeignKey {
                    step: GENRE_FILM_WORK_FILM_WORK_FK,
                    constraint: "fk_genre_film_work_film_work",
                    table: GENRE_FILM_WORK_TABLE,
                    column: "film_work_id",
                    target: FILM_WORK_TABLE,
                },
            )
            .after(&[CREATE_FILM_WORK, CREATE_GENRE_FILM_WORK]),
            MigrationStep::new(
                StepKind::AddForeignKey,
                AddForeignKey {
                    step: GENRE_FILM_WORK_GENRE_FK,
                    constraint: "fk_genre_film_work_genre",
                    table: GENRE_FILM_WORK_TABLE,
                    column: "genre_id",
                    target: GENRE_TABLE,
                },
            )
            .after(&[CREATE_GENRE, CREATE_GENRE_FILM_WORK]),
            index(GENRE_NAME_IDX, "genre_name_idx", GENRE_TABLE, &["name"]).after(&[CREATE_GENRE]),
            unique(
                FILM_WORK_PERSON_ROLE_UNIQUE,
                FILM_WORK_PERSON_ROLE_CONSTRAINT,
                PERSON_FILM_WORK_TABLE,
                &["film_work_id", "person_id", "role"],
            )
            .after(&[CREATE_PERSON_FILM_WORK]),
            unique(
                FILM_WORK_GENRE_UNIQUE,
                FILM_WORK_GENRE_CONSTRAINT,
                GENRE_FILM_WORK_TABLE,
                &["film_work_id", "genre_id"],
            )
            .after(&[GENRE_FILM_WORK_FILM_WORK_FK, GENRE_FILM_WORK_GENRE_FK]),
            index(FILM_WORK_TITLE_IDX, "film_work_title_idx", FILM_WORK_TABLE, &["title"])
                .after(&[CREATE_FILM_WORK]),
            index(FILM_WORK_RATING_IDX, "film_work_rating_idx", FILM_WORK_TABLE, &["rating"])
                .after(&[CREATE_FILM_WORK]),
            index(FILM_WORK_TYPE_IDX, "film_work_type_idx", FILM_WORK_TABLE, &["type"])
                .after(&[CREATE_FILM_WORK]),
            index(
                FILM_WORK_PERSON_IDX,
                "film_work_person_idx",
                PERSON_FILM_WORK_TABLE,
                &["film_work_id", "person_id"],
            )
            .after(&[CREATE_PERSON_FILM_WORK]),
            MigrationStep::new(
                StepKind::AddField,
                AddField {
                    step: ADD_PERSON_GENDER,
                    table: PERSON_TABLE,
                    column: || string_null(Alias::new("gender")),
                },
            )
            .after(&[CREATE_PERSON]),
            MigrationStep::new(
                StepKind::DropField,
                DropField { step: DROP_PERSON_GENDER, table: PERSON_TABLE, column: "gender" },
            )
            .after(&[ADD_PERSON_GENDER]),
            MigrationStep::new(
                StepKind::AddField,
                AddField {
                    step: ADD_FILM_WORK_FILE_PATH,
                    table: FILM_WORK_TABLE,
                    column: || text_null(Alias::new("file_path")),
                },
            )
            .after(&[CREATE_FILM_WORK]),
        ]
    }
}

fn index(
    step: &'static str,
    index: &'static str,
    table: &'static str,
    columns: &'static [&'static str],
) -> MigrationStep {
    MigrationStep::new(
        StepKind::AddIndex,
        AddIndex { step, index, table, columns, unique: false },
    )
}

fn unique(
    step: &'static str,
    index: &'static str,
    table: &'static str,
    columns: &'static [&'static str],
) -> MigrationStep {
    MigrationStep::new(StepKind::AddUnique, AddIndex { step, index, table, columns, unique: true })
}
