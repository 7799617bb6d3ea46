use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Artists::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Artists::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Artists::Name)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Artists::Genre)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Artists::Image).text().not_null())
                    .col(
                        ColumnDef::new(Artists::Country)
                            .string_len(200)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Artists::FormedYear)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Artists::Biography).text().not_null())
                    .col(ColumnDef::new(Artists::Releases).json().not_null())
                    // Weak reference: deleting a user leaves their artists in place.
                    .col(ColumnDef::new(Artists::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Artists::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Artists::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_artists_user_id")
                    .table(Artists::Table)
                    .col(Artists::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Artists::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Artists {
    Table,
    Id,
    Name,
    Genre,
    Image,
    Country,
    FormedYear,
    Biography,
    Releases,
    UserId,
    CreatedAt,
    UpdatedAt,
}
