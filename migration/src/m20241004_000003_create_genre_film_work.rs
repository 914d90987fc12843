use sea_orm_migration::{prelude::*, schema::*};

/// Bare junction table. Its two references arrive in later add-foreign-key steps.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GenreFilmWork::Table)
                    .col(uuid(GenreFilmWork::Id).primary_key())
                    .col(big_integer(GenreFilmWork::Created))
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum GenreFilmWork {
    #[sea_orm(iden = "content_genre_film_work")]
    Table,
    Id,
    Created,
}
