//! Explicit many-to-many links between film works and genres or persons.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    catalog::Catalog,
    entities::{film_work, genre, genre_film_work, person, person_film_work},
    error::{CatalogError, CatalogResult},
    models::{Credit, now_micros},
    schema::{self, EntityKind},
    validate::{FieldValue, WriteMode},
};

impl Catalog {
    /// Links a genre to a film work.
    ///
    /// Fails with a constraint violation when the pair is already linked, and with a
    /// referential-integrity error when either end does not exist. No read precedes the
    /// insert: racing writers queue on the store's write lock and the loser meets the
    /// unique index.
    pub async fn link_genre(
        &self,
        film_work_id: Uuid,
        genre_id: Uuid,
    ) -> CatalogResult<genre_film_work::Model> {
        let values = [
            ("film_work_id", FieldValue::from(film_work_id)),
            ("genre_id", genre_id.into()),
        ];
        self.check(EntityKind::GenreFilmWork, &values, WriteMode::Insert)?;

        let txn = self.db().begin().await?;
        let inserted = genre_film_work::ActiveModel {
            id: Set(Uuid::new_v4()),
            created: Set(now_micros()),
            film_work_id: Set(film_work_id),
            genre_id: Set(genre_id),
        }
        .insert(&txn)
        .await;
        let link = match inserted {
            Ok(link) => link,
            Err(err) => {
                let failure = self.link_failure(&txn, EntityKind::GenreFilmWork, &values, err).await;
                txn.rollback().await?;
                return Err(failure);
            }
        };
        txn.commit().await?;

        tracing::debug!(%film_work_id, %genre_id, "linked genre");
        Ok(link)
    }

    /// Removes the link if present. Returns the number of rows removed.
    pub async fn unlink_genre(&self, film_work_id: Uuid, genre_id: Uuid) -> CatalogResult<u64> {
        let txn = self.db().begin().await?;
        let result = genre_film_work::Entity::delete_many()
            .filter(genre_film_work::Column::FilmWorkId.eq(film_work_id))
            .filter(genre_film_work::Column::GenreId.eq(genre_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(result.rows_affected)
    }

    /// Credits a person on a film work in `role`. The same person may hold several roles.
    pub async fn link_person(
        &self,
        film_work_id: Uuid,
        person_id: Uuid,
        role: &str,
    ) -> CatalogResult<person_film_work::Model> {
        let values = [
            ("film_work_id", FieldValue::from(film_work_id)),
            ("person_id", person_id.into()),
            ("role", role.into()),
        ];
        self.check(EntityKind::PersonFilmWork, &values, WriteMode::Insert)?;

        let txn = self.db().begin().await?;
        let inserted = person_film_work::ActiveModel {
            id: Set(Uuid::new_v4()),
            role: Set(role.to_string()),
            created: Set(now_micros()),
            film_work_id: Set(film_work_id),
            person_id: Set(person_id),
        }
        .insert(&txn)
        .await;
        let link = match inserted {
            Ok(link) => link,
            Err(err) => {
                let failure = self.link_failure(&txn, EntityKind::PersonFilmWork, &values, err).await;
                txn.rollback().await?;
                return Err(failure);
            }
        };
        txn.commit().await?;

        tracing::debug!(%film_work_id, %person_id, role, "linked person");
        Ok(link)
    }

    /// Removes credits of `person_id` on `film_work_id`; with no `role`, every role goes.
    pub async fn unlink_person(
        &self,
        film_work_id: Uuid,
        person_id: Uuid,
        role: Option<&str>,
    ) -> CatalogResult<u64> {
        let mut delete = person_film_work::Entity::delete_many()
            .filter(person_film_work::Column::FilmWorkId.eq(film_work_id))
            .filter(person_film_work::Column::PersonId.eq(person_id));
        if let Some(role) = role {
            delete = delete.filter(person_film_work::Column::Role.eq(role));
        }

        let txn = self.db().begin().await?;
        let result = delete.exec(&txn).await?;
        txn.commit().await?;
        Ok(result.rows_affected)
    }

    /// Genres linked to a film work, by name.
    pub async fn genres_of(&self, film_work_id: Uuid) -> CatalogResult<Vec<genre::Model>> {
        let Some(film) = self.get_film_work(film_work_id).await? else {
            return Err(CatalogError::NotFound { entity: EntityKind::FilmWork, id: film_work_id });
        };
        Ok(film
            .find_related(genre::Entity)
            .order_by_asc(genre::Column::Name)
            .all(self.db())
            .await?)
    }

    /// People credited on a film work with their roles, by name then role.
    pub async fn persons_of(&self, film_work_id: Uuid) -> CatalogResult<Vec<Credit>> {
        if self.get_film_work(film_work_id).await?.is_none() {
            return Err(CatalogError::NotFound { entity: EntityKind::FilmWork, id: film_work_id });
        }
        let rows = person_film_work::Entity::find()
            .filter(person_film_work::Column::FilmWorkId.eq(film_work_id))
            .find_also_related(person::Entity)
            .order_by_asc(person::Column::FullName)
            .order_by_asc(person_film_work::Column::Role)
            .all(self.db())
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|(link, person)| person.map(|person| Credit { person, role: link.role }))
            .collect())
    }

    pub async fn film_works_of_genre(&self, genre_id: Uuid) -> CatalogResult<Vec<film_work::Model>> {
        Ok(film_work::Entity::find()
            .inner_join(genre_film_work::Entity)
            .filter(genre_film_work::Column::GenreId.eq(genre_id))
            .order_by_desc(film_work::Column::Modified)
            .all(self.db())
            .await?)
    }

    /// Distinct film works a person is credited on, whatever the role.
    pub async fn film_works_of_person(&self, person_id: Uuid) -> CatalogResult<Vec<film_work::Model>> {
        Ok(film_work::Entity::find()
            .inner_join(person_film_work::Entity)
            .filter(person_film_work::Column::PersonId.eq(person_id))
            .distinct()
            .order_by_desc(film_work::Column::Modified)
            .all(self.db())
            .await?)
    }

    /// Classifies a failed junction insert. A dangling reference is reported by the end
    /// that is missing; uniqueness failures by the declared rule name.
    async fn link_failure(
        &self,
        txn: &DatabaseTransaction,
        kind: EntityKind,
        values: &[(&str, FieldValue)],
        err: DbErr,
    ) -> CatalogError {
        match CatalogError::from(err).for_entity(schema::entity(kind)) {
            CatalogError::ReferentialIntegrity { missing_reference } => {
                match self.check_references(txn, kind, values).await {
                    Err(named) => named,
                    Ok(()) => CatalogError::ReferentialIntegrity { missing_reference },
                }
            }
            other => other,
        }
    }
}
