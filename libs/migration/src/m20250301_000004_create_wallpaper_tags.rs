use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Join rows go away with their wallpaper or tag, enforced here rather than in code.
        manager
            .create_table(
                Table::create()
                    .table(WallpaperTags::Table)
                    .if_not_exists()
                    .col(pk_auto(WallpaperTags::Id))
                    .col(integer(WallpaperTags::WallpaperId))
                    .col(integer(WallpaperTags::TagId))
                    .col(
                        timestamp_with_time_zone(WallpaperTags::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(WallpaperTags::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallpaper_tags_wallpaper")
                            .from(WallpaperTags::Table, WallpaperTags::WallpaperId)
                            .to(Wallpapers::Table, Wallpapers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallpaper_tags_tag")
                            .from(WallpaperTags::Table, WallpaperTags::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallpaper_tags_pair")
                    .table(WallpaperTags::Table)
                    .col(WallpaperTags::WallpaperId)
                    .col(WallpaperTags::TagId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallpaper_tags_tag_id")
                    .table(WallpaperTags::Table)
                    .col(WallpaperTags::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WallpaperTags::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WallpaperTags {
    Table,
    Id,
    WallpaperId,
    TagId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Wallpapers {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Id,
}
