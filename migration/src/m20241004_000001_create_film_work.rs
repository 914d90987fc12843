use sea_orm_migration::{prelude::*, schema::*};

use crate::{RATING_MAX, RATING_MIN};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FilmWork::Table)
                    .col(uuid(FilmWork::Id).primary_key())
                    .col(text(FilmWork::Title))
                    .col(text_null(FilmWork::Description))
                    .col(string_null(FilmWork::CreationDate))
                    .col(
                        double_null(FilmWork::Rating)
                            .check(Expr::col(FilmWork::Rating).between(RATING_MIN, RATING_MAX)),
                    )
                    .col(string(FilmWork::Type))
                    .col(big_integer(FilmWork::Created))
                    .col(big_integer(FilmWork::Modified))
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum FilmWork {
    #[sea_orm(iden = "content_film_work")]
    Table,
    Id,
    Title,
    Description,
    CreationDate,
    Rating,
    Type,
    Created,
    Modified,
}
