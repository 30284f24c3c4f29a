//! Create the cached library tables: books, contributors, series

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Books::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Books::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Books::Title).text().not_null())
                    .col(ColumnDef::new(Books::Subtitle).text())
                    .col(ColumnDef::new(Books::Description).text())
                    .col(ColumnDef::new(Books::Publisher).text())
                    .col(ColumnDef::new(Books::PublishedYear).integer())
                    .col(ColumnDef::new(Books::Language).text())
                    .col(ColumnDef::new(Books::Isbn).text())
                    .col(ColumnDef::new(Books::Explicit).boolean().not_null())
                    .col(ColumnDef::new(Books::Abridged).boolean().not_null())
                    .col(ColumnDef::new(Books::DurationSeconds).double().not_null())
                    .col(ColumnDef::new(Books::SyncState).string().not_null())
                    .col(ColumnDef::new(Books::LastModified).timestamp().not_null())
                    .col(
                        ColumnDef::new(Books::ServerUpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_books_sync_state")
                    .table(Books::Table)
                    .col(Books::SyncState)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Contributors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contributors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contributors::Name).text().not_null())
                    .col(ColumnDef::new(Contributors::Description).text())
                    .col(ColumnDef::new(Contributors::Website).text())
                    .col(ColumnDef::new(Contributors::SyncState).string().not_null())
                    .col(
                        ColumnDef::new(Contributors::LastModified)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Contributors::ServerUpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contributors_sync_state")
                    .table(Contributors::Table)
                    .col(Contributors::SyncState)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Series::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Series::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Series::Name).text().not_null())
                    .col(ColumnDef::new(Series::Description).text())
                    .col(ColumnDef::new(Series::SyncState).string().not_null())
                    .col(ColumnDef::new(Series::LastModified).timestamp().not_null())
                    .col(
                        ColumnDef::new(Series::ServerUpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_series_sync_state")
                    .table(Series::Table)
                    .col(Series::SyncState)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Series::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contributors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Books::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Books {
    Table,
    Id,
    Title,
    Subtitle,
    Description,
    Publisher,
    PublishedYear,
    Language,
    Isbn,
    Explicit,
    Abridged,
    DurationSeconds,
    SyncState,
    LastModified,
    ServerUpdatedAt,
}

#[derive(DeriveIden)]
enum Contributors {
    Table,
    Id,
    Name,
    Description,
    Website,
    SyncState,
    LastModified,
    ServerUpdatedAt,
}

#[derive(DeriveIden)]
enum Series {
    Table,
    Id,
    Name,
    Description,
    SyncState,
    LastModified,
    ServerUpdatedAt,
}
