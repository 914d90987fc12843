use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Person::Table)
                    .col(uuid(Person::Id).primary_key())
                    .col(text(Person::FullName))
                    .col(big_integer(Person::Created))
                    .col(big_integer(Person::Modified))
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Person {
    #[sea_orm(iden = "content_person")]
    Table,
    Id,
    FullName,
    Created,
    Modified,
}
