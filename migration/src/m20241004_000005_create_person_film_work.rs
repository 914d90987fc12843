use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PersonFilmWork::Table)
                    .col(uuid(PersonFilmWork::Id).primary_key())
                    .col(text(PersonFilmWork::Role))
                    .col(big_integer(PersonFilmWork::Created))
                    .col(uuid(PersonFilmWork::FilmWorkId))
                    .col(uuid(PersonFilmWork::PersonId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_person_film_work_film_work")
                            .from(PersonFilmWork::Table, PersonFilmWork::FilmWorkId)
                            .to(FilmWork::Table, FilmWork::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_person_film_work_person")
                            .from(PersonFilmWork::Table, PersonFilmWork::PersonId)
                            .to(Person::Table, Person::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum PersonFilmWork {
    #[sea_orm(iden = "content_person_film_work")]
    Table,
    Id,
    Role,
    Created,
    FilmWorkId,
    PersonId,
}

#[derive(DeriveIden)]
enum FilmWork {
    #[sea_orm(iden = "content_film_work")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Person {
    #[sea_orm(iden = "content_person")]
    Table,
    Id,
}
