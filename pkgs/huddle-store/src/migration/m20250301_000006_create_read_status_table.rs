use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum ReadStatus {
    Table,
    MessageId,
    UserId,
    SessionId,
    ReadAt,
}

#[derive(DeriveIden)]
enum Messages {
    Table,
    Id,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000006_create_read_status_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReadStatus::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ReadStatus::MessageId).string().not_null())
                    .col(ColumnDef::new(ReadStatus::UserId).string().not_null())
                    .col(ColumnDef::new(ReadStatus::SessionId).string().not_null())
                    .col(ColumnDef::new(ReadStatus::ReadAt).big_integer())
                    .primary_key(
                        Index::create()
                            .col(ReadStatus::MessageId)
                            .col(ReadStatus::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_read_status_message")
                            .from(ReadStatus::Table, ReadStatus::MessageId)
                            .to(Messages::Table, Messages::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_read_status_user_session")
                    .table(ReadStatus::Table)
                    .col(ReadStatus::UserId)
                    .col(ReadStatus::SessionId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReadStatus::Table).to_owned())
            .await
    }
}
