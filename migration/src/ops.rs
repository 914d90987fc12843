//! Reusable steps for changes that only touch one table.

use sea_orm_migration::prelude::*;

/// Plain or unique index over columns of one table.
pub struct AddIndex {
    pub step: &'static str,
    pub index: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub unique: bool,
}

impl MigrationName for AddIndex {
    fn name(&self) -> &str {
        self.step
    }
}

#[async_trait::async_trait]
impl MigrationTrait for AddIndex {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut index = Index::create();
        index.name(self.index).table(Alias::new(self.table));
        for column in self.columns {
            index.col(Alias::new(*column));
        }
        if self.unique {
            index.unique();
        }
        manager.create_index(index).await
    }
}

/// New column on an existing table.
pub struct AddField {
    pub step: &'static str,
    pub table: &'static str,
    pub column: fn() -> ColumnDef,
}

impl MigrationName for AddField {
    fn name(&self) -> &str {
        self.step
    }
}

#[async_trait::async_trait]
impl MigrationTrait for AddField {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Alias::new(self.table))
                    .add_column((self.column)())
                    .to_owned(),
            )
            .await
    }
}

/// Retires a column. Steps are forward-only, so this is how a field leaves the schema.
pub struct DropField {
    pub step: &'static str,
    pub table: &'static str,
    pub column: &'static str,
}

impl MigrationName for DropField {
    fn name(&self) -> &str {
        self.step
    }
}

#[async_trait::async_trait]
impl MigrationTrait for DropField {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(Alias::new(self.table))
                    .drop_column(Alias::new(self.column))
                    .to_owned(),
            )
            .await
    }
}

/// Adds a required reference column pointing at `target.id`, cascading deletes.
///
/// SQLite cannot attach a foreign key to an existing column, so the reference is
/// declared on a new column. The column must default to NULL for `ADD COLUMN`, so
/// presence is enforced with a CHECK instead of NOT NULL.
pub struct AddForeignKey {
    pub step: &'static str,
    pub constraint: &'static str,
    pub table: &'static str,
    pub column: &'static str,
    pub target: &'static str,
}

impl MigrationName for AddForeignKey {
    fn name(&self) -> &str {
        self.step
    }
}

#[async_trait::async_trait]
impl MigrationTrait for AddForeignKey {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let sql = format!(
            r#"ALTER TABLE "{table}" ADD COLUMN "{column}" uuid_text NULL CONSTRAINT "{constraint}" REFERENCES "{target}" ("id") ON DELETE CASCADE CHECK ("{column}" IS NOT NULL)"#,
            table = self.table,
            column = self.column,
            constraint = self.constraint,
            target = self.target,
        );
        manager.get_connection().execute_unprepared(&sql).await?;
        Ok(())
    }
}
