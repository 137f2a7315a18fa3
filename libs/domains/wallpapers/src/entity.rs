use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;

// ===== Wallpapers Entity =====

pub mod wallpapers {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "wallpapers")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub title: String,
        #[sea_orm(column_type = "Text")]
        pub description: String,
        pub image_url: String,
        pub thumbnail_url: String,
        pub medium_url: Option<String>,
        pub category_id: i32,
        /// 0 when no vector is stored
        pub feature_id: i64,
        pub downloads: i32,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    impl From<Model> for crate::models::Wallpaper {
        fn from(model: Model) -> Self {
            Self {
                id: model.id,
                title: model.title,
                description: model.description,
                image_url: model.image_url,
                thumbnail_url: model.thumbnail_url,
                medium_url: model.medium_url,
                category_id: model.category_id,
                feature_id: model.feature_id,
                downloads: model.downloads,
                created_at: model.created_at.into(),
                updated_at: model.updated_at.into(),
                category: None,
                tags: Vec::new(),
            }
        }
    }

    impl From<crate::models::NewWallpaper> for ActiveModel {
        fn from(input: crate::models::NewWallpaper) -> Self {
            let now = chrono::Utc::now();
            ActiveModel {
                title: Set(input.title),
                description: Set(input.description),
                image_url: Set(input.image_url),
                thumbnail_url: Set(input.thumbnail_url),
                medium_url: Set(input.medium_url),
                category_id: Set(input.category_id),
                feature_id: Set(input.feature_id),
                downloads: Set(0),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
                ..Default::default()
            }
        }
    }
}

// ===== Categories Entity =====

pub mod categories {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "categories")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        #[sea_orm(unique)]
        pub name: String,
        pub image_url: Option<String>,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    /// Insertable row for a new category name
    pub fn named(name: &str) -> ActiveModel {
        let now = chrono::Utc::now();
        ActiveModel {
            name: Set(name.to_string()),
            image_url: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
    }

    impl From<Model> for crate::models::Category {
        fn from(model: Model) -> Self {
            Self {
                id: model.id,
                name: model.name,
                image_url: model.image_url,
                created_at: model.created_at.into(),
                updated_at: model.updated_at.into(),
            }
        }
    }
}

// ===== Tags Entity =====

pub mod tags {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "tags")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        #[sea_orm(unique)]
        pub name: String,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    pub fn named(name: &str) -> ActiveModel {
        let now = chrono::Utc::now();
        ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
    }

    impl From<Model> for crate::models::Tag {
        fn from(model: Model) -> Self {
            Self {
                id: model.id,
                name: model.name,
                created_at: model.created_at.into(),
                updated_at: model.updated_at.into(),
            }
        }
    }
}

// ===== Wallpaper Tags Entity =====

pub mod wallpaper_tags {
    use super::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "wallpaper_tags")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub wallpaper_id: i32,
        pub tag_id: i32,
        pub created_at: DateTimeWithTimeZone,
        pub updated_at: DateTimeWithTimeZone,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}

    /// Join row linking a wallpaper to one tag
    pub fn link(wallpaper_id: i32, tag_id: i32) -> ActiveModel {
        let now = chrono::Utc::now();
        ActiveModel {
            wallpaper_id: Set(wallpaper_id),
            tag_id: Set(tag_id),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
    }
}

pub use categories::Entity as CategoriesEntity;
pub use tags::Entity as TagsEntity;
pub use wallpaper_tags::Entity as WallpaperTagsEntity;
pub use wallpapers::Entity as WallpapersEntity;
