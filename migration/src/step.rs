use std::fmt;

use sea_orm_migration::prelude::*;

/// The structural change a step makes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StepKind {
    CreateTable,
    AddField,
    DropField,
    AddIndex,
    AddUnique,
    AddForeignKey,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::CreateTable => "create_table",
            StepKind::AddField => "add_field",
            StepKind::DropField => "drop_field",
            StepKind::AddIndex => "add_index",
            StepKind::AddUnique => "add_unique",
            StepKind::AddForeignKey => "add_foreign_key",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named, immutable schema change plus the names of the steps it must follow.
pub struct MigrationStep {
    kind: StepKind,
    depends_on: Vec<String>,
    migration: Box<dyn MigrationTrait>,
}

impl MigrationStep {
    pub fn new<M>(kind: StepKind, migration: M) -> Self
    where
        M: MigrationTrait + 'static,
    {
        Self { kind, depends_on: Vec::new(), migration: Box::new(migration) }
    }

    pub fn after(mut self, predecessors: &[&str]) -> Self {
        self.depends_on.extend(predecessors.iter().map(|p| ToString::to_string(p)));
        self
    }

    pub fn name(&self) -> &str {
        self.migration.name()
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub(crate) async fn up(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        self.migration.up(manager).await
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("name", &self.name())
            .field("kind", &self.kind)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}
