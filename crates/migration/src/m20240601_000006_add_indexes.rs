use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ApiKey: index on user_id
        manager
            .create_index(
                Index::create()
                    .name("idx_api_key_user")
                    .table(ApiKey::Table)
                    .col(ApiKey::UserId)
                    .to_owned(),
            )
            .await?;

        // Task: listing is filtered by status and owner
        manager
            .create_index(
                Index::create()
                    .name("idx_task_status")
                    .table(Task::Table)
                    .col(Task::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_task_user")
                    .table(Task::Table)
                    .col(Task::UserId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_task_created_at")
                    .table(Task::Table)
                    .col(Task::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_api_key_user").table(ApiKey::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_task_status").table(Task::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_task_user").table(Task::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_task_created_at").table(Task::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ApiKey { Table, UserId }

#[derive(DeriveIden)]
enum Task { Table, Status, UserId, CreatedAt }
