use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{film_work, genre, genre_film_work, person, person_film_work};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilmType {
    Movie,
    TvShow,
}

impl FilmType {
    pub fn as_str(self) -> &'static str {
        match self {
            FilmType::Movie => "movie",
            FilmType::TvShow => "tv_show",
        }
    }

    pub fn from_name(value: &str) -> Option<Self> {
        match value {
            "movie" => Some(FilmType::Movie),
            "tv_show" => Some(FilmType::TvShow),
            _ => None,
        }
    }
}

/// Every catalog row carries an immutable, randomly generated identifier.
pub trait Identified {
    fn id(&self) -> Uuid;
}

/// Insert time, fixed once the row exists.
pub trait Created: Identified {
    fn created(&self) -> i64;

    fn created_at(&self) -> Timestamp {
        from_micros(self.created())
    }
}

/// Rows that also track their last successful write.
pub trait TimeStamped: Created {
    fn modified(&self) -> i64;

    fn modified_at(&self) -> Timestamp {
        from_micros(self.modified())
    }
}

impl Identified for genre::Model {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Created for genre::Model {
    fn created(&self) -> i64 {
        self.created
    }
}

impl TimeStamped for genre::Model {
    fn modified(&self) -> i64 {
        self.modified
    }
}

impl Identified for person::Model {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Created for person::Model {
    fn created(&self) -> i64 {
        self.created
    }
}

impl TimeStamped for person::Model {
    fn modified(&self) -> i64 {
        self.modified
    }
}

impl Identified for film_work::Model {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Created for film_work::Model {
    fn created(&self) -> i64 {
        self.created
    }
}

impl TimeStamped for film_work::Model {
    fn modified(&self) -> i64 {
        self.modified
    }
}

impl Identified for genre_film_work::Model {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Created for genre_film_work::Model {
    fn created(&self) -> i64 {
        self.created
    }
}

impl Identified for person_film_work::Model {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Created for person_film_work::Model {
    fn created(&self) -> i64 {
        self.created
    }
}

impl film_work::Model {
    pub fn film_type(&self) -> Option<FilmType> {
        FilmType::from_name(&self.kind)
    }

    pub fn parsed_creation_date(&self) -> Option<Date> {
        self.creation_date.as_deref().and_then(|d| d.parse().ok())
    }
}

pub fn now_micros() -> i64 {
    Timestamp::now().as_microsecond()
}

/// Next `modified` value for a row last written at `previous`; always strictly greater.
pub fn next_modified(previous: i64) -> i64 {
    now_micros().max(previous.saturating_add(1))
}

fn from_micros(micros: i64) -> Timestamp {
    Timestamp::from_microsecond(micros).unwrap_or(Timestamp::UNIX_EPOCH)
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewGenre {
    pub id: Option<Uuid>,
    pub name: String,
    pub description: Option<String>,
}

/// Field-level changes; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GenreChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewPerson {
    pub id: Option<Uuid>,
    pub full_name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct PersonChanges {
    pub full_name: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewFilmWork {
    pub id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub creation_date: Option<Date>,
    pub rating: Option<f64>,
    pub film_type: FilmType,
    pub file_path: Option<String>,
}

impl NewFilmWork {
    pub fn new(title: impl Into<String>, film_type: FilmType) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            creation_date: None,
            rating: None,
            film_type,
            file_path: None,
        }
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct FilmWorkChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub creation_date: Option<Option<Date>>,
    pub rating: Option<Option<f64>>,
    pub film_type: Option<FilmType>,
    pub file_path: Option<Option<String>>,
}

/// A person credited on a film work, with the role of that credit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Credit {
    pub person: person::Model,
    pub role: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn film_type_codes_round_trip() {
        for kind in [FilmType::Movie, FilmType::TvShow] {
            assert_eq!(FilmType::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(FilmType::from_name("documentary"), None);
    }

    #[test]
    fn next_modified_is_strictly_greater() {
        let far_future = now_micros() + 60_000_000;
        assert_eq!(next_modified(far_future), far_future + 1);
        let past = now_micros() - 60_000_000;
        assert!(next_modified(past) > past);
    }
}
