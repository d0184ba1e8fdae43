use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum AiMessages {
    Table,
    Id,
    SessionId,
    UserId,
    ConversationId,
    Role,
    Content,
    Timestamp,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Id,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20250301_000007_create_ai_messages_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AiMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AiMessages::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AiMessages::SessionId).string())
                    .col(ColumnDef::new(AiMessages::UserId).string().not_null())
                    .col(ColumnDef::new(AiMessages::ConversationId).string().not_null())
                    .col(ColumnDef::new(AiMessages::Role).string().not_null())
                    .col(ColumnDef::new(AiMessages::Content).text().not_null())
                    .col(ColumnDef::new(AiMessages::Timestamp).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_messages_session")
                            .from(AiMessages::Table, AiMessages::SessionId)
                            .to(Sessions::Table, Sessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_ai_messages_session_timestamp")
                    .table(AiMessages::Table)
                    .col(AiMessages::SessionId)
                    .col(AiMessages::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AiMessages::Table).to_owned())
            .await
    }
}
