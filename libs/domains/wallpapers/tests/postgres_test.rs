//! Postgres repository tests
//!
//! These run against a real PostgreSQL container (testcontainers) with the
//! workspace migrations applied, and cover the SQL behind filtering,
//! adjacency, tag resolution and the two-store create/delete.

use std::sync::Arc;

use async_trait::async_trait;
use domain_wallpapers::models::NewWallpaper;
use domain_wallpapers::vector::FEATURE_DIMENSION;
use domain_wallpapers::*;
use test_utils::vectors::tilted;
use test_utils::{TestDataBuilder, TestDatabase};

struct FixedExtractor(Vec<f32>);

#[async_trait]
impl FeatureExtractor for FixedExtractor {
    async fn extract(&self, _image_path: &str) -> WallpaperResult<Vec<f32>> {
        Ok(self.0.clone())
    }
}

async fn seed(
    repo: &PgWallpaperRepository,
    builder: &TestDataBuilder,
    title: &str,
    category: &str,
    tags: &[&str],
) -> Wallpaper {
    let category = repo.get_or_create_category(category).await.unwrap();
    let names: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    let tags = repo.get_or_create_tags(&names).await.unwrap();
    repo.insert(NewWallpaper {
        title: title.to_string(),
        description: String::new(),
        image_url: builder.image_url(title),
        thumbnail_url: String::new(),
        medium_url: None,
        category_id: category.id,
        feature_id: 0,
        tag_ids: tags.iter().map(|t| t.id).collect(),
    })
    .await
    .unwrap()
}

fn titles(wallpapers: &[Wallpaper]) -> Vec<&str> {
    wallpapers.iter().map(|w| w.title.as_str()).collect()
}

#[tokio::test]
async fn test_tag_filter_is_and() {
    let db = TestDatabase::new().await;
    let repo = PgWallpaperRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("tag_filter_is_and");

    seed(&repo, &builder, "abc", "nature", &["A", "B", "C"]).await;
    seed(&repo, &builder, "ab", "nature", &["A", "B"]).await;
    seed(&repo, &builder, "ad", "nature", &["A", "D"]).await;

    let page = repo
        .list(&WallpaperFilter {
            tags: vec!["A".into(), "B".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(titles(&page.wallpapers), vec!["ab", "abc"]);

    let page = repo
        .list(&WallpaperFilter {
            tags: vec!["A".into(), "D".into(), "A".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&page.wallpapers), vec!["ad"]);

    let page = repo.list(&WallpaperFilter::default()).await.unwrap();
    assert_eq!(page.total, 3);
}

#[tokio::test]
async fn test_search_and_category_filters() {
    let db = TestDatabase::new().await;
    let repo = PgWallpaperRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("search_and_category");

    seed(&repo, &builder, "nebula", "Space", &["stars"]).await;
    seed(&repo, &builder, "forest", "nature", &["green_trees"]).await;
    seed(&repo, &builder, "galaxy", "space-art", &["100%"]).await;

    let search = |term: &str| WallpaperFilter {
        search: Some(term.to_string()),
        ..Default::default()
    };

    let page = repo.list(&search("SPACE")).await.unwrap();
    assert_eq!(titles(&page.wallpapers), vec!["galaxy", "nebula"]);

    let page = repo.list(&search("star")).await.unwrap();
    assert_eq!(titles(&page.wallpapers), vec!["nebula"]);

    // wildcard characters are matched literally
    let page = repo.list(&search("_")).await.unwrap();
    assert_eq!(titles(&page.wallpapers), vec!["forest"]);
    let page = repo.list(&search("%")).await.unwrap();
    assert_eq!(titles(&page.wallpapers), vec!["galaxy"]);

    let page = repo
        .list(&WallpaperFilter {
            category: Some("Space".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&page.wallpapers), vec!["nebula"]);
}

#[tokio::test]
async fn test_pagination_union_is_complete() {
    let db = TestDatabase::new().await;
    let repo = PgWallpaperRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("pagination");

    for i in 0..5 {
        seed(&repo, &builder, &format!("w{}", i), "nature", &[]).await;
    }

    let mut seen = Vec::new();
    for offset in [0, 2, 4] {
        let page = repo
            .list(&WallpaperFilter {
                limit: 2,
                offset,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        seen.extend(page.wallpapers.into_iter().map(|w| w.id));
    }

    let mut expected = seen.clone();
    expected.sort_by(|a, b| b.cmp(a));
    assert_eq!(seen, expected);
    assert_eq!(seen.len(), 5);
}

#[tokio::test]
async fn test_adjacent_by_id_with_gaps() {
    let db = TestDatabase::new().await;
    let repo = PgWallpaperRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("adjacent");

    let mut ids = Vec::new();
    for i in 0..4 {
        ids.push(seed(&repo, &builder, &format!("w{}", i), "nature", &[]).await.id);
    }
    let (first, second, third, last) = (ids[0], ids[1], ids[2], ids[3]);

    // remove the third so ids have a gap, like [1, 2, 3, 5]
    repo.begin_delete(third).await.unwrap().commit().await.unwrap();

    let adjacent = |current_id| AdjacentFilter {
        current_id,
        category: None,
        search: None,
    };

    let next = repo
        .find_adjacent(&adjacent(last), Direction::Next)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(next.id, second);

    let previous = repo
        .find_adjacent(&adjacent(second), Direction::Previous)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(previous.id, last);

    assert!(repo
        .find_adjacent(&adjacent(first), Direction::Next)
        .await
        .unwrap()
        .is_none());
    assert!(repo
        .find_adjacent(&adjacent(last), Direction::Previous)
        .await
        .unwrap()
        .is_none());
    assert!(matches!(
        repo.find_adjacent(&adjacent(third), Direction::Next).await,
        Err(WallpaperError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_get_or_create_tags_is_idempotent() {
    let db = TestDatabase::new().await;
    let repo = PgWallpaperRepository::new(db.connection());

    let names = vec!["sky".to_string(), "night".to_string(), " sky ".to_string()];
    let first = repo.get_or_create_tags(&names).await.unwrap();
    let second = repo.get_or_create_tags(&names).await.unwrap();

    assert_eq!(
        first.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
        vec!["sky", "night"]
    );
    assert_eq!(
        first.iter().map(|t| t.id).collect::<Vec<_>>(),
        second.iter().map(|t| t.id).collect::<Vec<_>>()
    );
    assert_eq!(db.count_rows("tags").await, 2);

    let a = repo.get_or_create_category("nature").await.unwrap();
    let b = repo.get_or_create_category("nature").await.unwrap();
    assert_eq!(a.id, b.id);
}

#[tokio::test]
async fn test_insert_links_repeated_tag_once() {
    let db = TestDatabase::new().await;
    let repo = PgWallpaperRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("repeated_tag_ids");

    let category = repo.get_or_create_category("nature").await.unwrap();
    let tags = repo
        .get_or_create_tags(&["sky".to_string(), "sea".to_string()])
        .await
        .unwrap();

    let wallpaper = repo
        .insert(NewWallpaper {
            title: "coast".to_string(),
            description: String::new(),
            image_url: builder.image_url("coast"),
            thumbnail_url: String::new(),
            medium_url: None,
            category_id: category.id,
            feature_id: 0,
            tag_ids: vec![tags[0].id, tags[1].id, tags[0].id],
        })
        .await
        .unwrap();

    let names: Vec<&str> = wallpaper.tags.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["sea", "sky"]);
}

#[tokio::test]
async fn test_concurrent_tag_creation_converges() {
    let db = TestDatabase::new().await;
    let repo = Arc::new(PgWallpaperRepository::new(db.connection()));
    let names = vec!["shared".to_string(), "other".to_string()];

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            let names = names.clone();
            tokio::spawn(async move { repo.get_or_create_tags(&names).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        let tags = handle.await.unwrap().unwrap();
        ids.push(tags.iter().map(|t| t.id).collect::<Vec<_>>());
    }

    assert!(ids.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(db.count_rows("tags").await, 2);
}

#[tokio::test]
async fn test_delete_cascades_tag_links() {
    let db = TestDatabase::new().await;
    let repo = PgWallpaperRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("delete_cascade");

    let wallpaper = seed(&repo, &builder, "aurora", "nature", &["sky", "night"]).await;
    assert_eq!(db.count_rows("wallpaper_tags").await, 2);

    let pending = repo.begin_delete(wallpaper.id).await.unwrap();
    assert_eq!(pending.wallpaper().id, wallpaper.id);
    pending.commit().await.unwrap();

    assert_eq!(db.count_rows("wallpaper_tags").await, 0);
    assert_eq!(db.count_rows("tags").await, 2);
    assert!(repo.get_by_id(wallpaper.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_rolled_back_delete_restores_row() {
    let db = TestDatabase::new().await;
    let repo = PgWallpaperRepository::new(db.connection());
    let builder = TestDataBuilder::from_test_name("delete_rollback");

    let wallpaper = seed(&repo, &builder, "aurora", "nature", &["sky"]).await;

    repo.begin_delete(wallpaper.id)
        .await
        .unwrap()
        .rollback()
        .await
        .unwrap();

    let restored = repo.get_by_id(wallpaper.id).await.unwrap().unwrap();
    assert_eq!(restored.tags.len(), 1);
    assert_eq!(restored.category.unwrap().name, "nature");
}

#[tokio::test]
async fn test_lifecycle_and_similarity_over_postgres() {
    let db = TestDatabase::new().await;
    let repo = Arc::new(PgWallpaperRepository::new(db.connection()));
    let features = Arc::new(InMemoryFeatureStore::new());

    let service = WallpaperService::new(repo.clone(), repo.clone(), features.clone());
    let create = |tilt: f32| {
        WallpaperLifecycle::new(
            repo.clone(),
            repo.clone(),
            features.clone(),
            Arc::new(FixedExtractor(tilted(FEATURE_DIMENSION, 0, tilt))),
        )
    };
    let input = |title: &str| CreateWallpaper {
        title: title.to_string(),
        description: String::new(),
        image_url: format!("/images/{}.jpg", title),
        thumbnail_url: String::new(),
        medium_url: None,
        category: "nature".into(),
        tags: vec!["sky".into()],
    };

    let query = create(0.0).create(input("query")).await.unwrap();
    let far = create(0.8).create(input("far")).await.unwrap();
    let near = create(0.1).create(input("near")).await.unwrap();

    let similar = service.similar(query.id, 10).await.unwrap();
    assert_eq!(
        similar.iter().map(|w| w.id).collect::<Vec<_>>(),
        vec![near.id, far.id]
    );

    create(0.0).delete(near.id).await.unwrap();
    assert!(!features.contains(near.feature_id).await);

    let similar = service.similar(query.id, 10).await.unwrap();
    assert_eq!(similar.iter().map(|w| w.id).collect::<Vec<_>>(), vec![far.id]);
}
