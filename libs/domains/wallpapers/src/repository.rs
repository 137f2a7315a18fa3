use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::error::{WallpaperError, WallpaperResult};
use crate::models::{
    AdjacentFilter, Category, Direction, NewWallpaper, Tag, Wallpaper, WallpaperFilter,
    WallpaperPage, normalize_names,
};

/// Relational access to wallpapers and their tag links
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WallpaperRepository: Send + Sync {
    /// Filtered page ordered by id descending, with the unpaginated total
    async fn list(&self, filter: &WallpaperFilter) -> WallpaperResult<WallpaperPage>;

    async fn get_by_id(&self, id: i32) -> WallpaperResult<Option<Wallpaper>>;

    /// Neighbour of `filter.current_id` under the same filters.
    /// Fails with `NotFound` when the current wallpaper does not exist.
    async fn find_adjacent(
        &self,
        filter: &AdjacentFilter,
        direction: Direction,
    ) -> WallpaperResult<Option<Wallpaper>>;

    /// Wallpapers owning any of the given feature ids, in no particular order
    async fn find_by_feature_ids(&self, feature_ids: &[i64]) -> WallpaperResult<Vec<Wallpaper>>;

    /// Inserts the row and its tag links in one transaction
    async fn insert(&self, input: NewWallpaper) -> WallpaperResult<Wallpaper>;

    /// Locks and deletes the row inside an open transaction.
    /// Nothing is visible to other readers until the returned handle commits.
    async fn begin_delete(&self, id: i32) -> WallpaperResult<Box<dyn PendingDeletion>>;
}

/// A deletion that has been executed but not yet committed
#[async_trait]
pub trait PendingDeletion: Send {
    fn wallpaper(&self) -> &Wallpaper;

    async fn commit(self: Box<Self>) -> WallpaperResult<()>;

    async fn rollback(self: Box<Self>) -> WallpaperResult<()>;
}

/// Categories and tags, created on first use
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Returns the category with this name, creating it if needed
    async fn get_or_create_category(&self, name: &str) -> WallpaperResult<Category>;

    /// Returns one tag per distinct name, in first-seen order.
    /// Concurrent callers converge on the same rows.
    async fn get_or_create_tags(&self, names: &[String]) -> WallpaperResult<Vec<Tag>>;

    async fn find_category(&self, name: &str) -> WallpaperResult<Option<Category>>;

    /// All categories ordered by name
    async fn list_categories(&self) -> WallpaperResult<Vec<Category>>;
}

#[derive(Debug, Default)]
struct CatalogState {
    wallpapers: BTreeMap<i32, Wallpaper>,
    categories: BTreeMap<i32, Category>,
    tags: BTreeMap<i32, Tag>,
    links: BTreeMap<i32, Vec<i32>>,
    next_wallpaper_id: i32,
    next_category_id: i32,
    next_tag_id: i32,
}

impl CatalogState {
    fn hydrate(&self, wallpaper: &Wallpaper) -> Wallpaper {
        let mut tags: Vec<Tag> = self
            .links
            .get(&wallpaper.id)
            .into_iter()
            .flatten()
            .filter_map(|tag_id| self.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Wallpaper {
            category: self.categories.get(&wallpaper.category_id).cloned(),
            tags,
            ..wallpaper.clone()
        }
    }

    fn tag_names_of(&self, wallpaper_id: i32) -> Vec<&str> {
        self.links
            .get(&wallpaper_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tags.get(id))
            .map(|t| t.name.as_str())
            .collect()
    }

    fn matches(&self, wallpaper: &Wallpaper, filter: &WallpaperFilter) -> bool {
        let category_name = self
            .categories
            .get(&wallpaper.category_id)
            .map(|c| c.name.as_str())
            .unwrap_or_default();
        let tag_names = self.tag_names_of(wallpaper.id);

        if let Some(category) = filter.category_name() {
            if category_name != category {
                return false;
            }
        }

        let required = filter.tag_names();
        if !required.iter().all(|t| tag_names.contains(&t.as_str())) {
            return false;
        }

        if let Some(term) = filter.search_term() {
            let term = term.to_lowercase();
            let hit = category_name.to_lowercase().contains(&term)
                || tag_names.iter().any(|t| t.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }

        true
    }

    fn category_by_name(&self, name: &str) -> Option<&Category> {
        self.categories.values().find(|c| c.name == name)
    }

    fn tag_by_name(&self, name: &str) -> Option<&Tag> {
        self.tags.values().find(|t| t.name == name)
    }
}

/// In-memory implementation of both repositories (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryWallpaperRepository {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryWallpaperRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WallpaperRepository for InMemoryWallpaperRepository {
    async fn list(&self, filter: &WallpaperFilter) -> WallpaperResult<WallpaperPage> {
        let state = self.state.read().await;

        // BTreeMap iterates ascending; the page is newest (highest id) first
        let matching: Vec<&Wallpaper> = state
            .wallpapers
            .values()
            .rev()
            .filter(|w| state.matches(w, filter))
            .collect();

        let total = matching.len() as u64;
        let wallpapers = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .map(|w| state.hydrate(w))
            .collect();

        Ok(WallpaperPage { wallpapers, total })
    }

    async fn get_by_id(&self, id: i32) -> WallpaperResult<Option<Wallpaper>> {
        let state = self.state.read().await;
        Ok(state.wallpapers.get(&id).map(|w| state.hydrate(w)))
    }

    async fn find_adjacent(
        &self,
        filter: &AdjacentFilter,
        direction: Direction,
    ) -> WallpaperResult<Option<Wallpaper>> {
        let state = self.state.read().await;

        if !state.wallpapers.contains_key(&filter.current_id) {
            return Err(WallpaperError::wallpaper_not_found(filter.current_id));
        }

        let list_filter = filter.as_wallpaper_filter();
        let found = match direction {
            Direction::Next => state
                .wallpapers
                .range(..filter.current_id)
                .rev()
                .map(|(_, w)| w)
                .find(|w| state.matches(w, &list_filter)),
            Direction::Previous => state
                .wallpapers
                .range((Bound::Excluded(filter.current_id), Bound::Unbounded))
                .map(|(_, w)| w)
                .find(|w| state.matches(w, &list_filter)),
        };

        Ok(found.map(|w| state.hydrate(w)))
    }

    async fn find_by_feature_ids(&self, feature_ids: &[i64]) -> WallpaperResult<Vec<Wallpaper>> {
        let state = self.state.read().await;
        Ok(state
            .wallpapers
            .values()
            .filter(|w| w.feature_id != 0 && feature_ids.contains(&w.feature_id))
            .map(|w| state.hydrate(w))
            .collect())
    }

    async fn insert(&self, input: NewWallpaper) -> WallpaperResult<Wallpaper> {
        let mut state = self.state.write().await;

        if !state.categories.contains_key(&input.category_id) {
            return Err(WallpaperError::Database(format!(
                "category {} does not exist",
                input.category_id
            )));
        }
        if let Some(missing) = input.tag_ids.iter().find(|id| !state.tags.contains_key(id)) {
            return Err(WallpaperError::Database(format!(
                "tag {} does not exist",
                missing
            )));
        }

        state.next_wallpaper_id += 1;
        let now = Utc::now();
        let wallpaper = Wallpaper {
            id: state.next_wallpaper_id,
            title: input.title,
            description: input.description,
            image_url: input.image_url,
            thumbnail_url: input.thumbnail_url,
            medium_url: input.medium_url,
            category_id: input.category_id,
            feature_id: input.feature_id,
            downloads: 0,
            created_at: now,
            updated_at: now,
            category: None,
            tags: Vec::new(),
        };

        let mut seen = HashSet::new();
        let tag_ids: Vec<i32> = input
            .tag_ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .collect();
        state.links.insert(wallpaper.id, tag_ids);
        state.wallpapers.insert(wallpaper.id, wallpaper.clone());

        tracing::info!(wallpaper_id = wallpaper.id, "Created wallpaper");
        Ok(state.hydrate(&wallpaper))
    }

    async fn begin_delete(&self, id: i32) -> WallpaperResult<Box<dyn PendingDeletion>> {
        let guard = self.state.clone().write_owned().await;

        let wallpaper = guard
            .wallpapers
            .get(&id)
            .map(|w| guard.hydrate(w))
            .ok_or_else(|| WallpaperError::wallpaper_not_found(id))?;

        Ok(Box::new(InMemoryPendingDeletion { guard, wallpaper }))
    }
}

/// Holds the write lock for the lifetime of the deletion, like a row lock
struct InMemoryPendingDeletion {
    guard: OwnedRwLockWriteGuard<CatalogState>,
    wallpaper: Wallpaper,
}

#[async_trait]
impl PendingDeletion for InMemoryPendingDeletion {
    fn wallpaper(&self) -> &Wallpaper {
        &self.wallpaper
    }

    async fn commit(self: Box<Self>) -> WallpaperResult<()> {
        let InMemoryPendingDeletion { mut guard, wallpaper } = *self;
        guard.wallpapers.remove(&wallpaper.id);
        guard.links.remove(&wallpaper.id);
        tracing::info!(wallpaper_id = wallpaper.id, "Deleted wallpaper");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> WallpaperResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryWallpaperRepository {
    async fn get_or_create_category(&self, name: &str) -> WallpaperResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WallpaperError::Validation(
                "category name must not be empty".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if let Some(existing) = state.category_by_name(name) {
            return Ok(existing.clone());
        }

        state.next_category_id += 1;
        let now = Utc::now();
        let category = Category {
            id: state.next_category_id,
            name: name.to_string(),
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get_or_create_tags(&self, names: &[String]) -> WallpaperResult<Vec<Tag>> {
        let names = normalize_names(names);
        let mut state = self.state.write().await;
        let mut tags = Vec::with_capacity(names.len());

        for name in names {
            if let Some(existing) = state.tag_by_name(&name) {
                tags.push(existing.clone());
                continue;
            }

            state.next_tag_id += 1;
            let now = Utc::now();
            let tag = Tag {
                id: state.next_tag_id,
                name,
                created_at: now,
                updated_at: now,
            };
            state.tags.insert(tag.id, tag.clone());
            tags.push(tag);
        }

        Ok(tags)
    }

    async fn find_category(&self, name: &str) -> WallpaperResult<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.category_by_name(name.trim()).cloned())
    }

    async fn list_categories(&self) -> WallpaperResult<Vec<Category>> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }
}

/// Reorders `wallpapers` to follow `feature_ids`, dropping ids without an owner.
pub fn order_by_feature_ids(feature_ids: &[i64], wallpapers: Vec<Wallpaper>) -> Vec<Wallpaper> {
    let mut by_feature: HashMap<i64, Wallpaper> =
        wallpapers.into_iter().map(|w| (w.feature_id, w)).collect();
    feature_ids
        .iter()
        .filter_map(|id| by_feature.remove(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seed(repo: &InMemoryWallpaperRepository, category: &str, tags: &[&str]) -> Wallpaper {
        let category = repo.get_or_create_category(category).await.unwrap();
        let names: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        let tags = repo.get_or_create_tags(&names).await.unwrap();
        repo.insert(NewWallpaper {
            title: "wallpaper".into(),
            description: String::new(),
            image_url: "/images/w.jpg".into(),
            thumbnail_url: String::new(),
            medium_url: None,
            category_id: category.id,
            feature_id: 0,
            tag_ids: tags.iter().map(|t| t.id).collect(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_tag_filter_requires_all_tags() {
        let repo = InMemoryWallpaperRepository::new();
        let abc = seed(&repo, "nature", &["A", "B", "C"]).await;
        seed(&repo, "nature", &["A", "D"]).await;

        let filter = WallpaperFilter {
            tags: vec!["A".into(), "B".into()],
            ..Default::default()
        };
        let page = repo.list(&filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.wallpapers[0].id, abc.id);

        let page = repo.list(&WallpaperFilter::default()).await.unwrap();
        assert_eq!(page.total, 2);
    }

    #[tokio::test]
    async fn test_search_matches_category_or_tag_case_insensitively() {
        let repo = InMemoryWallpaperRepository::new();
        let by_category = seed(&repo, "Mountains", &["snow"]).await;
        let by_tag = seed(&repo, "city", &["Night-Mountain"]).await;
        seed(&repo, "abstract", &["blue"]).await;

        let filter = WallpaperFilter {
            search: Some("MOUNTAIN".into()),
            ..Default::default()
        };
        let page = repo.list(&filter).await.unwrap();
        let ids: Vec<i32> = page.wallpapers.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![by_tag.id, by_category.id]);
    }

    #[tokio::test]
    async fn test_pagination_keeps_total() {
        let repo = InMemoryWallpaperRepository::new();
        for _ in 0..5 {
            seed(&repo, "nature", &[]).await;
        }

        let first = repo
            .list(&WallpaperFilter {
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        let last = repo
            .list(&WallpaperFilter {
                limit: 2,
                offset: 4,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(first.total, 5);
        assert_eq!(last.total, 5);
        assert_eq!(
            first.wallpapers.iter().map(|w| w.id).collect::<Vec<_>>(),
            vec![5, 4]
        );
        assert_eq!(last.wallpapers.len(), 1);
        assert_eq!(last.wallpapers[0].id, 1);
    }

    #[tokio::test]
    async fn test_get_or_create_tags_is_idempotent() {
        let repo = InMemoryWallpaperRepository::new();
        let names = vec!["sky".to_string(), "sea".to_string(), "sky".to_string()];

        let first = repo.get_or_create_tags(&names).await.unwrap();
        let second = repo.get_or_create_tags(&names).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(
            first.iter().map(|t| t.id).collect::<Vec<_>>(),
            second.iter().map(|t| t.id).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_rolled_back_deletion_keeps_row() {
        let repo = InMemoryWallpaperRepository::new();
        let wallpaper = seed(&repo, "nature", &["sky"]).await;

        let pending = repo.begin_delete(wallpaper.id).await.unwrap();
        assert_eq!(pending.wallpaper().id, wallpaper.id);
        pending.rollback().await.unwrap();
        assert!(repo.get_by_id(wallpaper.id).await.unwrap().is_some());

        let pending = repo.begin_delete(wallpaper.id).await.unwrap();
        pending.commit().await.unwrap();
        assert!(repo.get_by_id(wallpaper.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_drops_repeated_tag_ids() {
        let repo = InMemoryWallpaperRepository::new();
        let category = repo.get_or_create_category("nature").await.unwrap();
        let tags = repo
            .get_or_create_tags(&["sky".to_string(), "sea".to_string()])
            .await
            .unwrap();
        let (sky, sea) = (tags[0].id, tags[1].id);

        let wallpaper = repo
            .insert(NewWallpaper {
                title: "wallpaper".into(),
                description: String::new(),
                image_url: "/images/w.jpg".into(),
                thumbnail_url: String::new(),
                medium_url: None,
                category_id: category.id,
                feature_id: 0,
                tag_ids: vec![sky, sea, sky],
            })
            .await
            .unwrap();

        assert_eq!(wallpaper.tags.len(), 2);
        let stored = repo.get_by_id(wallpaper.id).await.unwrap().unwrap();
        assert_eq!(stored.tags.len(), 2);
    }

    #[tokio::test]
    async fn test_adjacent_at_max_id() {
        let repo = InMemoryWallpaperRepository::new();
        let older = seed(&repo, "nature", &[]).await;
        repo.state.write().await.next_wallpaper_id = i32::MAX - 1;
        let newest = seed(&repo, "nature", &[]).await;
        assert_eq!(newest.id, i32::MAX);

        let filter = AdjacentFilter {
            current_id: i32::MAX,
            category: None,
            search: None,
        };
        let previous = repo
            .find_adjacent(&filter, Direction::Previous)
            .await
            .unwrap();
        assert!(previous.is_none());

        let next = repo.find_adjacent(&filter, Direction::Next).await.unwrap();
        assert_eq!(next.map(|w| w.id), Some(older.id));
    }

    #[test]
    fn test_order_by_feature_ids_skips_orphans() {
        let now = Utc::now();
        let make = |id: i32, feature_id: i64| Wallpaper {
            id,
            title: String::new(),
            description: String::new(),
            image_url: String::new(),
            thumbnail_url: String::new(),
            medium_url: None,
            category_id: 1,
            feature_id,
            downloads: 0,
            created_at: now,
            updated_at: now,
            category: None,
            tags: vec![],
        };

        let ordered = order_by_feature_ids(&[30, 99, 10], vec![make(1, 10), make(3, 30)]);
        assert_eq!(ordered.iter().map(|w| w.id).collect::<Vec<_>>(), vec![3, 1]);
    }
}
