use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: u64 = 20;
pub const DEFAULT_SIMILAR_LIMIT: usize = 150;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A catalog entry. `feature_id == 0` means no vector is stored for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Wallpaper {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub thumbnail_url: String,
    pub medium_url: Option<String>,
    pub category_id: i32,
    pub feature_id: i64,
    pub downloads: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Relational filter for listing wallpapers
#[derive(Debug, Clone, PartialEq)]
pub struct WallpaperFilter {
    /// Every listed tag must be attached (AND)
    pub tags: Vec<String>,
    pub category: Option<String>,
    /// Case-insensitive substring of the category name or any tag name
    pub search: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

impl Default for WallpaperFilter {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            category: None,
            search: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl WallpaperFilter {
    /// Tag names trimmed and de-duplicated, blanks dropped.
    pub fn tag_names(&self) -> Vec<String> {
        normalize_names(&self.tags)
    }

    pub fn category_name(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }

    pub fn search_term(&self) -> Option<&str> {
        non_blank(self.search.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WallpaperPage {
    pub wallpapers: Vec<Wallpaper>,
    /// Distinct matches before pagination
    pub total: u64,
}

/// `GET /wallpapers` query string. `tags` may repeat.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListWallpapersQuery {
    #[serde(default)]
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    /// Page size; non-positive values fall back to 20
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl From<ListWallpapersQuery> for WallpaperFilter {
    fn from(query: ListWallpapersQuery) -> Self {
        let limit = match query.limit {
            Some(limit) if limit > 0 => limit as u64,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self {
            tags: query.tags,
            category: query.category,
            search: query.search,
            limit,
            offset: query.offset.unwrap_or(0).max(0) as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WallpaperListResponse {
    pub wallpapers: Vec<Wallpaper>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Largest id below the current one
    Next,
    /// Smallest id above the current one
    Previous,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdjacentFilter {
    pub current_id: i32,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl AdjacentFilter {
    pub fn as_wallpaper_filter(&self) -> WallpaperFilter {
        WallpaperFilter {
            category: self.category.clone(),
            search: self.search.clone(),
            ..WallpaperFilter::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdjacentQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SimilarQuery {
    /// Maximum number of results (default 150)
    pub limit: Option<i64>,
}

impl SimilarQuery {
    pub fn limit(&self) -> usize {
        match self.limit {
            Some(limit) if limit > 0 => limit as usize,
            _ => DEFAULT_SIMILAR_LIMIT,
        }
    }
}

fn validate_tag_names(tags: &[String]) -> Result<(), validator::ValidationError> {
    if tags.iter().any(|t| t.trim().is_empty()) {
        return Err(validator::ValidationError::new("blank_tag"));
    }
    Ok(())
}

/// DTO for creating a wallpaper
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateWallpaper {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1))]
    pub image_url: String,
    #[serde(default, alias = "image_thumb_url")]
    pub thumbnail_url: String,
    #[serde(default)]
    pub medium_url: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub category: String,
    #[serde(default)]
    #[validate(custom(function = "validate_tag_names"))]
    pub tags: Vec<String>,
}

impl CreateWallpaper {
    /// Checks the fields the lifecycle manager relies on, independent of
    /// how the value was constructed.
    pub fn check(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.image_url.trim().is_empty() {
            return Err("image_url must not be empty".to_string());
        }
        if self.category.trim().is_empty() {
            return Err("category must not be empty".to_string());
        }
        if validate_tag_names(&self.tags).is_err() {
            return Err("tags must not contain blank names".to_string());
        }
        Ok(())
    }
}

/// Row to insert once category, tags and the feature vector are resolved
#[derive(Debug, Clone, PartialEq)]
pub struct NewWallpaper {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub thumbnail_url: String,
    pub medium_url: Option<String>,
    pub category_id: i32,
    pub feature_id: i64,
    pub tag_ids: Vec<i32>,
}

/// Trims, drops blanks and removes duplicates, keeping first-seen order.
pub fn normalize_names(names: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.to_string()))
        .map(str::to_string)
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
