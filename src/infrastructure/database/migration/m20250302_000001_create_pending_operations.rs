//! Create the pending_operations queue table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PendingOperations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PendingOperations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PendingOperations::OperationType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PendingOperations::EntityType).string())
                    .col(ColumnDef::new(PendingOperations::EntityId).uuid())
                    .col(ColumnDef::new(PendingOperations::Payload).json().not_null())
                    .col(ColumnDef::new(PendingOperations::BatchKey).text())
                    .col(ColumnDef::new(PendingOperations::Status).string().not_null())
                    .col(
                        ColumnDef::new(PendingOperations::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PendingOperations::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PendingOperations::AttemptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(PendingOperations::LastError).text())
                    .to_owned(),
            )
            .await?;

        // Indexes matching the store's query patterns
        manager
            .create_index(
                Index::create()
                    .name("idx_pending_operations_status")
                    .table(PendingOperations::Table)
                    .col(PendingOperations::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pending_operations_type_entity")
                    .table(PendingOperations::Table)
                    .col(PendingOperations::OperationType)
                    .col(PendingOperations::EntityId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pending_operations_batch_key")
                    .table(PendingOperations::Table)
                    .col(PendingOperations::BatchKey)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PendingOperations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PendingOperations {
    Table,
    Id,
    OperationType,
    EntityType,
    EntityId,
    Payload,
    BatchKey,
    Status,
    CreatedAt,
    UpdatedAt,
    AttemptCount,
    LastError,
}
