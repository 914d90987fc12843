//! Declarative shape of every catalog entity.
//!
//! Each entity composes the shared identifier and timestamp field sets explicitly.
//! Enumerations are versioned by the migration steps that introduce and retire them,
//! so the active value set always follows the applied-step record.

use std::{collections::HashSet, fmt};

use migration::{
    ADD_PERSON_GENDER, CREATE_FILM_WORK, DROP_PERSON_GENDER, FILM_WORK_GENRE_CONSTRAINT,
    FILM_WORK_PERSON_ROLE_CONSTRAINT, FILM_WORK_TABLE, GENRE_FILM_WORK_TABLE, GENRE_TABLE,
    PERSON_FILM_WORK_TABLE, PERSON_TABLE, RATING_MAX, RATING_MIN,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntityKind {
    Genre,
    Person,
    FilmWork,
    GenreFilmWork,
    PersonFilmWork,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Genre,
        EntityKind::Person,
        EntityKind::FilmWork,
        EntityKind::GenreFilmWork,
        EntityKind::PersonFilmWork,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Genre => "genre",
            EntityKind::Person => "person",
            EntityKind::FilmWork => "film_work",
            EntityKind::GenreFilmWork => "genre_film_work",
            EntityKind::PersonFilmWork => "person_film_work",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldType {
    Uuid,
    Text,
    Float,
    Date,
    Timestamp,
    Enum(&'static str),
    Reference(EntityKind),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DefaultValue {
    NewUuid,
    Now,
}

/// Field-level rules, checked in declaration order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Validator {
    NotBlank,
    MaxLength(usize),
    Range { min: f64, max: f64 },
    OneOf(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub ty: FieldType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
    pub validators: &'static [Validator],
}

impl FieldDef {
    const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty, nullable: false, default: None, validators: &[] }
    }

    const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    const fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    const fn validators(mut self, validators: &'static [Validator]) -> Self {
        self.validators = validators;
        self
    }

    pub fn is_required(&self) -> bool {
        !self.nullable && self.default.is_none()
    }
}

/// Store-enforced uniqueness over a column tuple.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniqueDef {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityDef {
    pub kind: EntityKind,
    pub table: &'static str,
    pub fields: &'static [FieldDef],
    pub unique: &'static [UniqueDef],
}

impl EntityDef {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared uniqueness rule named by a store `UNIQUE constraint failed` message.
    pub fn unique_violated(&self, message: &str) -> Option<&'static UniqueDef> {
        let (_, columns) = message.split_once("UNIQUE constraint failed: ")?;
        let columns: Vec<&str> = columns
            .split(',')
            .filter_map(|c| c.trim().strip_prefix(self.table)?.strip_prefix('.'))
            .collect();
        let unique: &'static [UniqueDef] = self.unique;
        unique.iter().find(|u| {
            u.fields.len() == columns.len() && u.fields.iter().all(|f| columns.contains(f))
        })
    }

    pub fn references(&self) -> impl Iterator<Item = (&'static FieldDef, EntityKind)> {
        self.fields.iter().filter_map(|f| match f.ty {
            FieldType::Reference(target) => Some((f, target)),
            _ => None,
        })
    }
}

/// Value set of an enumeration as of one schema revision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnumRevision {
    pub revision: u32,
    pub introduced_by: &'static str,
    pub retired_by: Option<&'static str>,
    pub values: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnumDef {
    pub name: &'static str,
    pub revisions: &'static [EnumRevision],
}

impl EnumDef {
    /// Latest revision whose introducing step is applied and whose retiring step is not.
    pub fn active(&self, applied: &HashSet<String>) -> Option<&'static EnumRevision> {
        let revisions: &'static [EnumRevision] = self.revisions;
        revisions.iter().rev().find(|r| {
            applied.contains(r.introduced_by)
                && !r.retired_by.is_some_and(|retired| applied.contains(retired))
        })
    }
}

const ID: FieldDef = FieldDef::new("id", FieldType::Uuid).with_default(DefaultValue::NewUuid);
const CREATED: FieldDef = FieldDef::new("created", FieldType::Timestamp).with_default(DefaultValue::Now);
const MODIFIED: FieldDef = FieldDef::new("modified", FieldType::Timestamp).with_default(DefaultValue::Now);

pub const FILM_TYPE: &str = "filmtype";
pub const GENDER: &str = "gender";

static ENUMS: [EnumDef; 2] = [
    EnumDef {
        name: FILM_TYPE,
        revisions: &[EnumRevision {
            revision: 1,
            introduced_by: CREATE_FILM_WORK,
            retired_by: None,
            values: &["movie", "tv_show"],
        }],
    },
    EnumDef {
        name: GENDER,
        revisions: &[EnumRevision {
            revision: 1,
            introduced_by: ADD_PERSON_GENDER,
            retired_by: Some(DROP_PERSON_GENDER),
            values: &["male", "female"],
        }],
    },
];

static ENTITIES: [EntityDef; 5] = [
    EntityDef {
        kind: EntityKind::Genre,
        table: GENRE_TABLE,
        fields: &[
            ID,
            FieldDef::new("name", FieldType::Text)
                .validators(&[Validator::NotBlank, Validator::MaxLength(255)]),
            FieldDef::new("description", FieldType::Text).nullable(),
            CREATED,
            MODIFIED,
        ],
        unique: &[],
    },
    EntityDef {
        kind: EntityKind::Person,
        table: PERSON_TABLE,
        fields: &[
            ID,
            FieldDef::new("full_name", FieldType::Text).validators(&[Validator::NotBlank]),
            CREATED,
            MODIFIED,
        ],
        unique: &[],
    },
    EntityDef {
        kind: EntityKind::FilmWork,
        table: FILM_WORK_TABLE,
        fields: &[
            ID,
            FieldDef::new("title", FieldType::Text).validators(&[Validator::NotBlank]),
            FieldDef::new("description", FieldType::Text).nullable(),
            FieldDef::new("creation_date", FieldType::Date).nullable(),
            FieldDef::new("rating", FieldType::Float)
                .nullable()
                .validators(&[Validator::Range { min: RATING_MIN, max: RATING_MAX }]),
            FieldDef::new("type", FieldType::Enum(FILM_TYPE))
                .validators(&[Validator::OneOf(FILM_TYPE)]),
            FieldDef::new("file_path", FieldType::Text).nullable(),
            CREATED,
            MODIFIED,
        ],
        unique: &[],
    },
    EntityDef {
        kind: EntityKind::GenreFilmWork,
        table: GENRE_FILM_WORK_TABLE,
        fields: &[
            ID,
            FieldDef::new("film_work_id", FieldType::Reference(EntityKind::FilmWork)),
            FieldDef::new("genre_id", FieldType::Reference(EntityKind::Genre)),
            CREATED,
        ],
        unique: &[UniqueDef {
            name: FILM_WORK_GENRE_CONSTRAINT,
            fields: &["film_work_id", "genre_id"],
        }],
    },
    EntityDef {
        kind: EntityKind::PersonFilmWork,
        table: PERSON_FILM_WORK_TABLE,
        fields: &[
            ID,
            FieldDef::new("film_work_id", FieldType::Reference(EntityKind::FilmWork)),
            FieldDef::new("person_id", FieldType::Reference(EntityKind::Person)),
            FieldDef::new("role", FieldType::Text).validators(&[Validator::NotBlank]),
            CREATED,
        ],
        unique: &[UniqueDef {
            name: FILM_WORK_PERSON_ROLE_CONSTRAINT,
            fields: &["film_work_id", "person_id", "role"],
        }],
    },
];

pub fn entities() -> &'static [EntityDef] {
    &ENTITIES
}

pub fn entity(kind: EntityKind) -> &'static EntityDef {
    match kind {
        EntityKind::Genre => &ENTITIES[0],
        EntityKind::Person => &ENTITIES[1],
        EntityKind::FilmWork => &ENTITIES[2],
        EntityKind::GenreFilmWork => &ENTITIES[3],
        EntityKind::PersonFilmWork => &ENTITIES[4],
    }
}

pub fn enumeration(name: &str) -> Option<&'static EnumDef> {
    ENUMS.iter().find(|e| e.name == name)
}

/// Entities that store a reference to `target`, with the referencing field.
pub fn referencing(target: EntityKind) -> impl Iterator<Item = (&'static EntityDef, &'static FieldDef)> {
    ENTITIES.iter().flat_map(move |def| {
        def.references().filter(move |(_, t)| *t == target).map(move |(field, _)| (def, field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn applied(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn lookup_matches_kind() {
        for kind in EntityKind::ALL {
            assert_eq!(entity(kind).kind, kind);
        }
    }

    #[test]
    fn every_entity_carries_id_and_created() {
        for def in entities() {
            assert_eq!(def.field("id").map(|f| f.ty), Some(FieldType::Uuid));
            assert_eq!(def.field("created").map(|f| f.ty), Some(FieldType::Timestamp));
            assert!(def.table.starts_with("content_"));
        }
        assert!(entity(EntityKind::GenreFilmWork).field("modified").is_none());
        assert!(entity(EntityKind::Genre).field("modified").is_some());
    }

    #[test]
    fn unique_fields_are_declared_fields() {
        for def in entities() {
            for unique in def.unique {
                for field in unique.fields {
                    assert!(def.field(field).is_some(), "{}.{field}", def.table);
                }
            }
        }
    }

    #[test]
    fn film_type_follows_applied_steps() {
        let film_type = enumeration(FILM_TYPE).unwrap();
        assert!(film_type.active(&applied(&[])).is_none());
        let active = film_type.active(&applied(&[CREATE_FILM_WORK])).unwrap();
        assert_eq!(active.revision, 1);
        assert_eq!(active.values, ["movie", "tv_show"]);
    }

    #[test]
    fn gender_is_retired_by_its_drop_step() {
        let gender = enumeration(GENDER).unwrap();
        assert!(gender.active(&applied(&[ADD_PERSON_GENDER])).is_some());
        assert!(gender.active(&applied(&[ADD_PERSON_GENDER, DROP_PERSON_GENDER])).is_none());
    }

    #[test]
    fn film_work_is_referenced_by_both_junctions() {
        let tables: Vec<_> = referencing(EntityKind::FilmWork).map(|(def, _)| def.kind).collect();
        assert_eq!(tables, [EntityKind::GenreFilmWork, EntityKind::PersonFilmWork]);
    }
}
