use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Wallpapers::Table)
                    .if_not_exists()
                    .col(pk_auto(Wallpapers::Id))
                    .col(string(Wallpapers::Title))
                    .col(text(Wallpapers::Description).default(""))
                    .col(string(Wallpapers::ImageUrl))
                    .col(string(Wallpapers::ThumbnailUrl).default(""))
                    .col(string_null(Wallpapers::MediumUrl))
                    .col(integer(Wallpapers::CategoryId))
                    // 0 means no vector is stored for this wallpaper
                    .col(big_integer(Wallpapers::FeatureId).default(0))
                    .col(integer(Wallpapers::Downloads).default(0))
                    .col(
                        timestamp_with_time_zone(Wallpapers::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Wallpapers::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallpapers_category")
                            .from(Wallpapers::Table, Wallpapers::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallpapers_category_id")
                    .table(Wallpapers::Table)
                    .col(Wallpapers::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallpapers_feature_id")
                    .table(Wallpapers::Table)
                    .col(Wallpapers::FeatureId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Wallpapers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Wallpapers {
    Table,
    Id,
    Title,
    Description,
    ImageUrl,
    ThumbnailUrl,
    MediumUrl,
    CategoryId,
    FeatureId,
    Downloads,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
}
