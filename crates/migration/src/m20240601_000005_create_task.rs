//! Create `task` table with FKs to `user` and `model_config`.
//!
//! One row per generation request. `user_id` is nullable: anonymous
//! submissions own no user. Status is constrained by the service layer to
//! pending/processing/completed/failed.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(uuid(Task::Id).primary_key())
                    .col(ColumnDef::new(Task::UserId).uuid().null())
                    .col(ColumnDef::new(Task::ModelConfigId).uuid().null())
                    .col(string_len(Task::Prompt, 1000).not_null())
                    .col(string_len(Task::Status, 32).not_null())
                    .col(integer(Task::Width).not_null())
                    .col(integer(Task::Height).not_null())
                    .col(ColumnDef::new(Task::Style).string_len(64).null())
                    .col(ColumnDef::new(Task::ImageUrl).string_len(1024).null())
                    .col(ColumnDef::new(Task::ErrorMessage).text().null())
                    .col(timestamp_with_time_zone(Task::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Task::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_user")
                            .from(Task::Table, Task::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_model_config")
                            .from(Task::Table, Task::ModelConfigId)
                            .to(ModelConfig::Table, ModelConfig::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Task::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Task {
    Table,
    Id,
    UserId,
    ModelConfigId,
    Prompt,
    Status,
    Width,
    Height,
    Style,
    ImageUrl,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }

#[derive(DeriveIden)]
enum ModelConfig { Table, Id }
