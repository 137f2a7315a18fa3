pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_categories;
mod m20250301_000002_create_tags;
mod m20250301_000003_create_wallpapers;
mod m20250301_000004_create_wallpaper_tags;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_categories::Migration),
            Box::new(m20250301_000002_create_tags::Migration),
            Box::new(m20250301_000003_create_wallpapers::Migration),
            Box::new(m20250301_000004_create_wallpaper_tags::Migration),
        ]
    }
}
