use std::{collections::HashSet, sync::Arc};

use migration::MigrationEngine;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryOrder, Set, Statement, TransactionTrait, Value,
};
use uuid::Uuid;

use crate::{
    entities::{film_work, genre, genre_film_work, person, person_film_work},
    error::{CatalogError, CatalogResult},
    models::{
        FilmWorkChanges, GenreChanges, NewFilmWork, NewGenre, NewPerson, PersonChanges,
        next_modified, now_micros,
    },
    schema::{self, EntityKind},
    validate::{FieldValue, WriteMode, require_references, validate},
};

/// Entity reads and writes over a migrated store.
///
/// Every write runs in its own transaction, cascades included.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
    applied: Arc<HashSet<String>>,
}

impl Catalog {
    /// Wraps `db`, reading the applied-step record to pick active enumeration revisions.
    pub async fn open(db: DatabaseConnection) -> CatalogResult<Self> {
        let applied = MigrationEngine::new(db.clone()).applied_names().await?;
        Ok(Self::new(db, applied))
    }

    pub fn new(db: DatabaseConnection, applied: HashSet<String>) -> Self {
        Self { db, applied: Arc::new(applied) }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub(crate) fn check(
        &self,
        kind: EntityKind,
        values: &[(&str, FieldValue)],
        mode: WriteMode,
    ) -> CatalogResult<()> {
        validate(schema::entity(kind), values, mode, &self.applied)
    }

    pub async fn create_genre(&self, input: NewGenre) -> CatalogResult<genre::Model> {
        let values = [
            ("id", FieldValue::from(input.id)),
            ("name", input.name.clone().into()),
            ("description", input.description.clone().into()),
        ];
        self.check(EntityKind::Genre, &values, WriteMode::Insert)?;

        let now = now_micros();
        let model = genre::ActiveModel {
            id: Set(input.id.unwrap_or_else(Uuid::new_v4)),
            name: Set(input.name),
            description: Set(input.description),
            created: Set(now),
            modified: Set(now),
        };

        let txn = self.db.begin().await?;
        let genre = model.insert(&txn).await?;
        txn.commit().await?;

        tracing::debug!(id = %genre.id, name = %genre.name, "created genre");
        Ok(genre)
    }

    pub async fn update_genre(&self, id: Uuid, changes: GenreChanges) -> CatalogResult<genre::Model> {
        let mut values = Vec::new();
        if let Some(name) = &changes.name {
            values.push(("name", FieldValue::from(name.as_str())));
        }
        if let Some(description) = &changes.description {
            values.push(("description", description.clone().into()));
        }
        self.check(EntityKind::Genre, &values, WriteMode::Update)?;

        let txn = self.db.begin().await?;
        let existing = genre::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(CatalogError::NotFound { entity: EntityKind::Genre, id })?;

        let modified = next_modified(existing.modified);
        let mut model: genre::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            model.name = Set(name);
        }
        if let Some(description) = changes.description {
            model.description = Set(description);
        }
        model.modified = Set(modified);
        let genre = model.update(&txn).await?;
        txn.commit().await?;
        Ok(genre)
    }

    pub async fn get_genre(&self, id: Uuid) -> CatalogResult<Option<genre::Model>> {
        Ok(genre::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn list_genres(&self) -> CatalogResult<Vec<genre::Model>> {
        Ok(genre::Entity::find().order_by_asc(genre::Column::Name).all(&self.db).await?)
    }

    /// Deletes a genre and every junction row pointing at it.
    pub async fn delete_genre(&self, id: Uuid) -> CatalogResult<bool> {
        let txn = self.db.begin().await?;
        let links = delete_dependents(&txn, EntityKind::Genre, id).await?;
        let deleted = genre::Entity::delete_by_id(id).exec(&txn).await?.rows_affected > 0;
        txn.commit().await?;

        if deleted {
            tracing::debug!(%id, links, "deleted genre");
        }
        Ok(deleted)
    }

    pub async fn create_person(&self, input: NewPerson) -> CatalogResult<person::Model> {
        let values = [("id", FieldValue::from(input.id)), ("full_name", input.full_name.clone().into())];
        self.check(EntityKind::Person, &values, WriteMode::Insert)?;

        let now = now_micros();
        let model = person::ActiveModel {
            id: Set(input.id.unwrap_or_else(Uuid::new_v4)),
            full_name: Set(input.full_name),
            created: Set(now),
            modified: Set(now),
        };

        let txn = self.db.begin().await?;
        let person = model.insert(&txn).await?;
        txn.commit().await?;

        tracing::debug!(id = %person.id, "created person");
        Ok(person)
    }

    pub async fn update_person(&self, id: Uuid, changes: PersonChanges) -> CatalogResult<person::Model> {
        let mut values = Vec::new();
        if let Some(full_name) = &changes.full_name {
            values.push(("full_name", FieldValue::from(full_name.as_str())));
        }
        self.check(EntityKind::Person, &values, WriteMode::Update)?;

        let txn = self.db.begin().await?;
        let existing = person::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(CatalogError::NotFound { entity: EntityKind::Person, id })?;

        let modified = next_modified(existing.modified);
        let mut model: person::ActiveModel = existing.into();
        if let Some(full_name) = changes.full_name {
            model.full_name = Set(full_name);
        }
        model.modified = Set(modified);
        let person = model.update(&txn).await?;
        txn.commit().await?;
        Ok(person)
    }

    pub async fn get_person(&self, id: Uuid) -> CatalogResult<Option<person::Model>> {
        Ok(person::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn list_persons(&self) -> CatalogResult<Vec<person::Model>> {
        Ok(person::Entity::find().order_by_asc(person::Column::FullName).all(&self.db).await?)
    }

    /// Deletes a person and every credit naming them.
    pub async fn delete_person(&self, id: Uuid) -> CatalogResult<bool> {
        let txn = self.db.begin().await?;
        let links = delete_dependents(&txn, EntityKind::Person, id).await?;
        let deleted = person::Entity::delete_by_id(id).exec(&txn).await?.rows_affected > 0;
        txn.commit().await?;

        if deleted {
            tracing::debug!(%id, links, "deleted person");
        }
        Ok(deleted)
    }

    pub async fn create_film_work(&self, input: NewFilmWork) -> CatalogResult<film_work::Model> {
        let values = [
            ("id", FieldValue::from(input.id)),
            ("title", input.title.clone().into()),
            ("description", input.description.clone().into()),
            ("creation_date", input.creation_date.into()),
            ("rating", input.rating.into()),
            ("type", input.film_type.as_str().into()),
            ("file_path", input.file_path.clone().into()),
        ];
        self.check(EntityKind::FilmWork, &values, WriteMode::Insert)?;

        let now = now_micros();
        let model = film_work::ActiveModel {
            id: Set(input.id.unwrap_or_else(Uuid::new_v4)),
            title: Set(input.title),
            description: Set(input.description),
            creation_date: Set(input.creation_date.map(|d| d.to_string())),
            rating: Set(input.rating),
            kind: Set(input.film_type.as_str().to_string()),
            file_path: Set(input.file_path),
            created: Set(now),
            modified: Set(now),
        };

        let txn = self.db.begin().await?;
        let film = model.insert(&txn).await?;
        txn.commit().await?;

        tracing::debug!(id = %film.id, title = %film.title, "created film work");
        Ok(film)
    }

    pub async fn update_film_work(
        &self,
        id: Uuid,
        changes: FilmWorkChanges,
    ) -> CatalogResult<film_work::Model> {
        let mut values = Vec::new();
        if let Some(title) = &changes.title {
            values.push(("title", FieldValue::from(title.as_str())));
        }
        if let Some(description) = &changes.description {
            values.push(("description", description.clone().into()));
        }
        if let Some(creation_date) = changes.creation_date {
            values.push(("creation_date", creation_date.into()));
        }
        if let Some(rating) = changes.rating {
            values.push(("rating", rating.into()));
        }
        if let Some(film_type) = changes.film_type {
            values.push(("type", film_type.as_str().into()));
        }
        if let Some(file_path) = &changes.file_path {
            values.push(("file_path", file_path.clone().into()));
        }
        self.check(EntityKind::FilmWork, &values, WriteMode::Update)?;

        let txn = self.db.begin().await?;
        let existing = film_work::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(CatalogError::NotFound { entity: EntityKind::FilmWork, id })?;

        let modified = next_modified(existing.modified);
        let mut model: film_work::ActiveModel = existing.into();
        if let Some(title) = changes.title {
            model.title = Set(title);
        }
        if let Some(description) = changes.description {
            model.description = Set(description);
        }
        if let Some(creation_date) = changes.creation_date {
            model.creation_date = Set(creation_date.map(|d| d.to_string()));
        }
        if let Some(rating) = changes.rating {
            model.rating = Set(rating);
        }
        if let Some(film_type) = changes.film_type {
            model.kind = Set(film_type.as_str().to_string());
        }
        if let Some(file_path) = changes.file_path {
            model.file_path = Set(file_path);
        }
        model.modified = Set(modified);
        let film = model.update(&txn).await?;
        txn.commit().await?;
        Ok(film)
    }

    pub async fn get_film_work(&self, id: Uuid) -> CatalogResult<Option<film_work::Model>> {
        Ok(film_work::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Most recently modified first.
    pub async fn list_film_works(&self) -> CatalogResult<Vec<film_work::Model>> {
        Ok(film_work::Entity::find()
            .order_by_desc(film_work::Column::Modified)
            .all(&self.db)
            .await?)
    }

    /// Deletes a film work together with all of its genre and person links.
    pub async fn delete_film_work(&self, id: Uuid) -> CatalogResult<bool> {
        let txn = self.db.begin().await?;
        let links = delete_dependents(&txn, EntityKind::FilmWork, id).await?;
        let deleted = film_work::Entity::delete_by_id(id).exec(&txn).await?.rows_affected > 0;
        txn.commit().await?;

        if deleted {
            tracing::debug!(%id, links, "deleted film work");
        }
        Ok(deleted)
    }

    pub async fn count(&self, kind: EntityKind) -> CatalogResult<u64> {
        let count = match kind {
            EntityKind::Genre => genre::Entity::find().count(&self.db).await?,
            EntityKind::Person => person::Entity::find().count(&self.db).await?,
            EntityKind::FilmWork => film_work::Entity::find().count(&self.db).await?,
            EntityKind::GenreFilmWork => genre_film_work::Entity::find().count(&self.db).await?,
            EntityKind::PersonFilmWork => person_film_work::Entity::find().count(&self.db).await?,
        };
        Ok(count)
    }

    pub(crate) async fn check_references(
        &self,
        txn: &DatabaseTransaction,
        kind: EntityKind,
        values: &[(&str, FieldValue)],
    ) -> CatalogResult<()> {
        require_references(txn, schema::entity(kind), values).await
    }
}

/// Removes every row whose reference field points at `id` of `kind`.
async fn delete_dependents(txn: &DatabaseTransaction, kind: EntityKind, id: Uuid) -> CatalogResult<u64> {
    let mut removed = 0;
    for (def, field) in schema::referencing(kind) {
        let result = txn
            .execute(Statement::from_sql_and_values(
                txn.get_database_backend(),
                format!(r#"DELETE FROM "{}" WHERE "{}" = ?"#, def.table, field.name),
                [Value::from(id)],
            ))
            .await?;
        removed += result.rows_affected();
    }
    Ok(removed)
}
