//! Registrations consumed by an administrative front end.
//!
//! Nothing here renders UI. The presentation layer reads these declarations to decide
//! which columns to list, which to search and which junctions to edit inline.

use uuid::Uuid;

use crate::{catalog::Catalog, error::CatalogResult, schema::EntityKind};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InlineView {
    pub junction: EntityKind,
    pub fields: &'static [&'static str],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdminView {
    pub entity: EntityKind,
    pub list_display: &'static [&'static str],
    pub search_fields: &'static [&'static str],
    pub list_filter: &'static [&'static str],
    pub inlines: &'static [InlineView],
}

static VIEWS: [AdminView; 3] = [
    AdminView {
        entity: EntityKind::Genre,
        list_display: &["name", "description"],
        search_fields: &["name", "description"],
        list_filter: &[],
        inlines: &[],
    },
    AdminView {
        entity: EntityKind::Person,
        list_display: &["full_name"],
        search_fields: &["full_name"],
        list_filter: &[],
        inlines: &[],
    },
    AdminView {
        entity: EntityKind::FilmWork,
        list_display: &["title", "type", "creation_date", "rating"],
        search_fields: &["title", "description", "id"],
        list_filter: &["type"],
        inlines: &[
            InlineView { junction: EntityKind::GenreFilmWork, fields: &["genre_id"] },
            InlineView { junction: EntityKind::PersonFilmWork, fields: &["person_id", "role"] },
        ],
    },
];

pub fn views() -> &'static [AdminView] {
    &VIEWS
}

pub fn view(entity: EntityKind) -> Option<&'static AdminView> {
    VIEWS.iter().find(|v| v.entity == entity)
}

impl Catalog {
    /// Genre names of a film work joined for a list column, e.g. `"Comedy, Drama"`.
    pub async fn genre_display(&self, film_work_id: Uuid) -> CatalogResult<String> {
        let genres = self.genres_of(film_work_id).await?;
        Ok(genres.iter().map(|g| g.name.as_str()).collect::<Vec<_>>().join(", "))
    }

    /// Credits of a film work as `"Name (role)"`, joined for a list column.
    pub async fn credit_display(&self, film_work_id: Uuid) -> CatalogResult<String> {
        let credits = self.persons_of(film_work_id).await?;
        Ok(credits
            .iter()
            .map(|c| format!("{} ({})", c.person.full_name, c.role))
            .collect::<Vec<_>>()
            .join(", "))
    }
}
