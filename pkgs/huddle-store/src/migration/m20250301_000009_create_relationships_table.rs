use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Relationships {
    Table,
    UserId,
    OtherUserId,
    Status,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000009_create_relationships_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Relationships::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Relationships::UserId).string().not_null())
                    .col(ColumnDef::new(Relationships::OtherUserId).string().not_null())
                    .col(ColumnDef::new(Relationships::Status).string().not_null())
                    .primary_key(
                        Index::create()
                            .col(Relationships::UserId)
                            .col(Relationships::OtherUserId),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Relationships::Table).to_owned())
            .await
    }
}
