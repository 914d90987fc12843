use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Genre::Table)
                    .col(uuid(Genre::Id).primary_key())
                    .col(string_len(Genre::Name, 255))
                    .col(text_null(Genre::Description))
                    .col(big_integer(Genre::Created))
                    .col(big_integer(Genre::Modified))
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Genre {
    #[sea_orm(iden = "content_genre")]
    Table,
    Id,
    Name,
    Description,
    Created,
    Modified,
}
