//! Field-level and reference checks run before a write reaches the store.
//!
//! Uniqueness is left to the store's unique indexes so that racing writers cannot
//! both succeed; the store error is classified into a constraint violation instead.

use std::collections::HashSet;

use jiff::civil::Date;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, ColumnTrait};
use uuid::Uuid;

use crate::{
    entities::{film_work, genre, genre_film_work, person, person_film_work},
    error::{CatalogError, CatalogResult},
    schema::{self, EntityDef, EntityKind, FieldType, Validator},
};

/// Candidate value of one field in a write.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Float(f64),
    Date(Date),
    Uuid(Uuid),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<Date> for FieldValue {
    fn from(value: Date) -> Self {
        FieldValue::Date(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteMode {
    /// Every required field must be supplied.
    Insert,
    /// Only the supplied fields are checked.
    Update,
}

/// Checks `values` against the declared fields of `def`.
///
/// `applied` is the applied-step record; enumeration fields accept only the values of
/// the revision active under it.
pub fn validate(
    def: &EntityDef,
    values: &[(&str, FieldValue)],
    mode: WriteMode,
    applied: &HashSet<String>,
) -> CatalogResult<()> {
    for (name, _) in values {
        if def.field(name).is_none() {
            return Err(CatalogError::validation(*name, format!("not a field of {}", def.kind)));
        }
    }

    for field in def.fields {
        let value = values.iter().find(|(name, _)| *name == field.name).map(|(_, v)| v);
        let value = match (value, mode) {
            (Some(value), _) => value,
            (None, WriteMode::Update) => continue,
            (None, WriteMode::Insert) => &FieldValue::Null,
        };

        if *value == FieldValue::Null {
            let required = match mode {
                WriteMode::Insert => field.is_required(),
                WriteMode::Update => !field.nullable,
            };
            if required {
                return Err(CatalogError::validation(field.name, "this field is required"));
            }
            continue;
        }

        check_type(field.name, field.ty, value)?;
        for validator in field.validators {
            check(field.name, validator, value, applied)?;
        }
    }
    Ok(())
}

fn check_type(field: &str, ty: FieldType, value: &FieldValue) -> CatalogResult<()> {
    let ok = match ty {
        FieldType::Uuid | FieldType::Reference(_) => matches!(value, FieldValue::Uuid(_)),
        FieldType::Text | FieldType::Enum(_) => matches!(value, FieldValue::Text(_)),
        FieldType::Float => matches!(value, FieldValue::Float(_)),
        FieldType::Date => matches!(value, FieldValue::Date(_)),
        FieldType::Timestamp => false,
    };
    if ok {
        Ok(())
    } else {
        Err(CatalogError::validation(field, format!("expected a {ty:?} value")))
    }
}

fn check(
    field: &str,
    validator: &Validator,
    value: &FieldValue,
    applied: &HashSet<String>,
) -> CatalogResult<()> {
    match (validator, value) {
        (Validator::NotBlank, FieldValue::Text(text)) if text.trim().is_empty() => {
            Err(CatalogError::validation(field, "must not be blank"))
        }
        (Validator::MaxLength(max), FieldValue::Text(text)) if text.chars().count() > *max => {
            Err(CatalogError::validation(field, format!("must be at most {max} characters")))
        }
        (Validator::Range { min, max }, FieldValue::Float(n)) if !(*min..=*max).contains(n) => {
            Err(CatalogError::validation(field, format!("must be between {min} and {max}")))
        }
        (Validator::OneOf(name), FieldValue::Text(text)) => {
            let Some(revision) = schema::enumeration(name).and_then(|e| e.active(applied)) else {
                return Err(CatalogError::validation(
                    field,
                    format!("enumeration `{name}` is not active in the current schema"),
                ));
            };
            if revision.values.contains(&text.as_str()) {
                Ok(())
            } else {
                Err(CatalogError::validation(
                    field,
                    format!(
                        "`{text}` is not a valid {name} (revision {}: {})",
                        revision.revision,
                        revision.values.join(", ")
                    ),
                ))
            }
        }
        _ => Ok(()),
    }
}

/// Fails with a referential-integrity error unless row `id` of `kind` exists on `conn`.
pub async fn require_exists<C>(conn: &C, kind: EntityKind, id: Uuid) -> CatalogResult<()>
where
    C: ConnectionTrait,
{
    let count = match kind {
        EntityKind::Genre => {
            genre::Entity::find().filter(genre::Column::Id.eq(id)).count(conn).await?
        }
        EntityKind::Person => {
            person::Entity::find().filter(person::Column::Id.eq(id)).count(conn).await?
        }
        EntityKind::FilmWork => {
            film_work::Entity::find().filter(film_work::Column::Id.eq(id)).count(conn).await?
        }
        EntityKind::GenreFilmWork => {
            genre_film_work::Entity::find()
                .filter(genre_film_work::Column::Id.eq(id))
                .count(conn)
                .await?
        }
        EntityKind::PersonFilmWork => {
            person_film_work::Entity::find()
                .filter(person_film_work::Column::Id.eq(id))
                .count(conn)
                .await?
        }
    };
    if count == 0 {
        return Err(CatalogError::missing(kind, id));
    }
    Ok(())
}

/// Checks every reference field supplied in `values` against the store.
pub async fn require_references<C>(
    conn: &C,
    def: &EntityDef,
    values: &[(&str, FieldValue)],
) -> CatalogResult<()>
where
    C: ConnectionTrait,
{
    for (field, target) in def.references() {
        let supplied = values.iter().find(|(name, _)| *name == field.name).map(|(_, v)| v);
        if let Some(FieldValue::Uuid(id)) = supplied {
            require_exists(conn, target, *id).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use migration::{CREATE_FILM_WORK, Migrator};

    use super::*;
    use crate::schema::entity;

    fn all_applied() -> HashSet<String> {
        Migrator::steps().iter().map(|s| s.name().to_string()).collect()
    }

    fn film(rating: f64) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("title", "Example".into()),
            ("rating", rating.into()),
            ("type", "movie".into()),
        ]
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        let def = entity(EntityKind::FilmWork);
        let applied = all_applied();
        for ok in [0.0, 7.5, 100.0] {
            assert!(validate(def, &film(ok), WriteMode::Insert, &applied).is_ok(), "{ok}");
        }
        for bad in [-1.0, 100.5, 101.0, f64::NAN] {
            let err = validate(def, &film(bad), WriteMode::Insert, &applied).unwrap_err();
            assert!(
                matches!(err, CatalogError::Validation { ref field, .. } if field == "rating"),
                "{bad}"
            );
        }
    }

    #[test]
    fn insert_requires_fields_without_defaults() {
        let def = entity(EntityKind::FilmWork);
        let err = validate(def, &[("title", "Example".into())], WriteMode::Insert, &all_applied())
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "type"));
    }

    #[test]
    fn update_checks_only_supplied_fields() {
        let def = entity(EntityKind::FilmWork);
        let applied = all_applied();
        assert!(validate(def, &[("rating", 42.0.into())], WriteMode::Update, &applied).is_ok());
        assert!(validate(def, &[("description", FieldValue::Null)], WriteMode::Update, &applied).is_ok());
        let err = validate(def, &[("title", FieldValue::Null)], WriteMode::Update, &applied).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "title"));
    }

    #[test]
    fn enum_values_follow_the_active_revision() {
        let def = entity(EntityKind::FilmWork);
        let mut values = film(5.0);
        values[2] = ("type", "documentary".into());
        let err = validate(def, &values, WriteMode::Insert, &all_applied()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "type"));

        let err = validate(def, &film(5.0), WriteMode::Insert, &HashSet::new()).unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref reason, .. } if reason.contains("not active")));

        let only_table = HashSet::from([CREATE_FILM_WORK.to_string()]);
        assert!(validate(def, &film(5.0), WriteMode::Insert, &only_table).is_ok());
    }

    #[test]
    fn genre_name_is_bounded_and_not_blank() {
        let def = entity(EntityKind::Genre);
        let applied = all_applied();
        let long = "x".repeat(256);
        assert!(validate(def, &[("name", long.into())], WriteMode::Insert, &applied).is_err());
        assert!(validate(def, &[("name", "  ".into())], WriteMode::Insert, &applied).is_err());
        assert!(validate(def, &[("name", "Drama".into())], WriteMode::Insert, &applied).is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let def = entity(EntityKind::Person);
        let err = validate(
            def,
            &[("full_name", "Ann".into()), ("gender", "female".into())],
            WriteMode::Insert,
            &all_applied(),
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::Validation { ref field, .. } if field == "gender"));
    }
}
