use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Releases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Releases::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Releases::Title)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Releases::Image).text().not_null())
                    // No foreign key: the artist link is maintained by the
                    // application and cleared explicitly when an artist goes away.
                    .col(ColumnDef::new(Releases::ArtistId).uuid())
                    .col(ColumnDef::new(Releases::Year).integer().not_null())
                    .col(
                        ColumnDef::new(Releases::Genre)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Releases::TrackList).json().not_null())
                    .col(
                        ColumnDef::new(Releases::ReleaseType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Releases::Reviews).json().not_null())
                    .col(ColumnDef::new(Releases::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Releases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Releases::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_releases_artist_id")
                    .table(Releases::Table)
                    .col(Releases::ArtistId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_releases_user_id")
                    .table(Releases::Table)
                    .col(Releases::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Releases::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Releases {
    Table,
    Id,
    Title,
    Image,
    ArtistId,
    Year,
    Genre,
    TrackList,
    ReleaseType,
    Reviews,
    UserId,
    CreatedAt,
    UpdatedAt,
}
