pub mod admin;
pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
mod junction;
pub mod models;
pub mod schema;
pub mod validate;

pub use catalog::Catalog;
pub use error::{CatalogError, CatalogResult};
