//! Create `model_config` table.
//!
//! Upstream image-generation model endpoints selectable per task.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ModelConfig::Table)
                    .if_not_exists()
                    .col(uuid(ModelConfig::Id).primary_key())
                    .col(string_len(ModelConfig::Name, 100).unique_key().not_null())
                    .col(string_len(ModelConfig::ApiBaseUrl, 512).not_null())
                    .col(string_len(ModelConfig::ApiKey, 255).not_null())
                    .col(string_len(ModelConfig::Model, 128).not_null())
                    .col(integer(ModelConfig::DefaultWidth).not_null())
                    .col(integer(ModelConfig::DefaultHeight).not_null())
                    .col(boolean(ModelConfig::IsActive).not_null())
                    .col(timestamp_with_time_zone(ModelConfig::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(ModelConfig::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModelConfig::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ModelConfig {
    Table,
    Id,
    Name,
    ApiBaseUrl,
    ApiKey,
    Model,
    DefaultWidth,
    DefaultHeight,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
