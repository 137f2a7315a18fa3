use async_trait::async_trait;
use sea_orm::sea_query::{Expr, ExprTrait, Func, LikeExpr, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use std::collections::{HashMap, HashSet};

use crate::entity::{
    CategoriesEntity, TagsEntity, WallpaperTagsEntity, WallpapersEntity, categories, tags,
    wallpaper_tags, wallpapers,
};
use crate::error::{WallpaperError, WallpaperResult};
use crate::models::{
    AdjacentFilter, Category, Direction, NewWallpaper, Tag, Wallpaper, WallpaperFilter,
    WallpaperPage, normalize_names,
};
use crate::repository::{CatalogRepository, PendingDeletion, WallpaperRepository};

/// PostgreSQL implementation of the wallpaper and catalog repositories
#[derive(Clone)]
pub struct PgWallpaperRepository {
    db: DatabaseConnection,
}

impl PgWallpaperRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// Escapes LIKE wildcards so the term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Wallpaper ids linked to a tag, joined so the tag columns can be filtered on
fn tagged_wallpaper_ids() -> SelectStatement {
    Query::select()
        .column((WallpaperTagsEntity, wallpaper_tags::Column::WallpaperId))
        .from(WallpaperTagsEntity)
        .inner_join(
            TagsEntity,
            Expr::col((TagsEntity, tags::Column::Id))
                .equals((WallpaperTagsEntity, wallpaper_tags::Column::TagId)),
        )
        .to_owned()
}

/// Filter conditions shared by listing and neighbour lookup
fn wallpaper_condition(filter: &WallpaperFilter) -> Condition {
    let mut condition = Condition::all();

    let names = filter.tag_names();
    if !names.is_empty() {
        let required = names.len() as i64;
        condition = condition.add(
            wallpapers::Column::Id.in_subquery(
                tagged_wallpaper_ids()
                    .and_where(Expr::col((TagsEntity, tags::Column::Name)).is_in(names))
                    .group_by_col((WallpaperTagsEntity, wallpaper_tags::Column::WallpaperId))
                    .and_having(
                        Expr::expr(Func::count_distinct(Expr::col((
                            TagsEntity,
                            tags::Column::Id,
                        ))))
                        .eq(required),
                    )
                    .to_owned(),
            ),
        );
    }

    if let Some(category) = filter.category_name() {
        condition = condition.add(
            wallpapers::Column::CategoryId.in_subquery(
                Query::select()
                    .column(categories::Column::Id)
                    .from(CategoriesEntity)
                    .and_where(categories::Column::Name.eq(category))
                    .to_owned(),
            ),
        );
    }

    if let Some(term) = filter.search_term() {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        let matches = |column: Expr| {
            Expr::expr(Func::lower(column)).like(LikeExpr::new(pattern.clone()).escape('\\'))
        };

        condition = condition.add(
            Condition::any()
                .add(
                    wallpapers::Column::CategoryId.in_subquery(
                        Query::select()
                            .column(categories::Column::Id)
                            .from(CategoriesEntity)
                            .and_where(matches(Expr::col((
                                CategoriesEntity,
                                categories::Column::Name,
                            ))))
                            .to_owned(),
                    ),
                )
                .add(
                    wallpapers::Column::Id.in_subquery(
                        tagged_wallpaper_ids()
                            .and_where(matches(Expr::col((TagsEntity, tags::Column::Name))))
                            .to_owned(),
                    ),
                ),
        );
    }

    condition
}

/// Fills in category and tags for a batch of rows, keeping their order.
async fn hydrate<C: sea_orm::ConnectionTrait>(
    db: &C,
    rows: Vec<wallpapers::Model>,
) -> WallpaperResult<Vec<Wallpaper>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
    let category_ids: HashSet<i32> = rows.iter().map(|r| r.category_id).collect();

    let category_by_id: HashMap<i32, Category> = CategoriesEntity::find()
        .filter(categories::Column::Id.is_in(category_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|model| (model.id, model.into()))
        .collect();

    let links = WallpaperTagsEntity::find()
        .filter(wallpaper_tags::Column::WallpaperId.is_in(ids))
        .all(db)
        .await?;

    let tag_ids: HashSet<i32> = links.iter().map(|l| l.tag_id).collect();
    let by_id: HashMap<i32, Tag> = if tag_ids.is_empty() {
        HashMap::new()
    } else {
        TagsEntity::find()
            .filter(tags::Column::Id.is_in(tag_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|model| (model.id, model.into()))
            .collect()
    };

    let mut tags_by_wallpaper: HashMap<i32, Vec<Tag>> = HashMap::new();
    for link in links {
        if let Some(tag) = by_id.get(&link.tag_id) {
            tags_by_wallpaper
                .entry(link.wallpaper_id)
                .or_default()
                .push(tag.clone());
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let category = category_by_id.get(&row.category_id).cloned();
            let mut row_tags = tags_by_wallpaper.remove(&row.id).unwrap_or_default();
            row_tags.sort_by(|a, b| a.name.cmp(&b.name));
            Wallpaper {
                category,
                tags: row_tags,
                ..Wallpaper::from(row)
            }
        })
        .collect())
}

async fn hydrate_one<C: sea_orm::ConnectionTrait>(
    db: &C,
    row: wallpapers::Model,
) -> WallpaperResult<Option<Wallpaper>> {
    Ok(hydrate(db, vec![row]).await?.into_iter().next())
}

#[async_trait]
impl WallpaperRepository for PgWallpaperRepository {
    async fn list(&self, filter: &WallpaperFilter) -> WallpaperResult<WallpaperPage> {
        let query = WallpapersEntity::find().filter(wallpaper_condition(filter));

        let total = query.clone().count(&self.db).await?;
        let rows = query
            .order_by_desc(wallpapers::Column::Id)
            .limit(filter.limit as u64)
            .offset(filter.offset as u64)
            .all(&self.db)
            .await?;

        Ok(WallpaperPage {
            wallpapers: hydrate(&self.db, rows).await?,
            total,
        })
    }

    async fn get_by_id(&self, id: i32) -> WallpaperResult<Option<Wallpaper>> {
        match WallpapersEntity::find_by_id(id).one(&self.db).await? {
            Some(row) => hydrate_one(&self.db, row).await,
            None => Ok(None),
        }
    }

    async fn find_adjacent(
        &self,
        filter: &AdjacentFilter,
        direction: Direction,
    ) -> WallpaperResult<Option<Wallpaper>> {
        if WallpapersEntity::find_by_id(filter.current_id)
            .one(&self.db)
            .await?
            .is_none()
        {
            return Err(WallpaperError::wallpaper_not_found(filter.current_id));
        }

        let query =
            WallpapersEntity::find().filter(wallpaper_condition(&filter.as_wallpaper_filter()));
        let query = match direction {
            Direction::Next => query
                .filter(wallpapers::Column::Id.lt(filter.current_id))
                .order_by_desc(wallpapers::Column::Id),
            Direction::Previous => query
                .filter(wallpapers::Column::Id.gt(filter.current_id))
                .order_by_asc(wallpapers::Column::Id),
        };

        match query.one(&self.db).await? {
            Some(row) => hydrate_one(&self.db, row).await,
            None => Ok(None),
        }
    }

    async fn find_by_feature_ids(&self, feature_ids: &[i64]) -> WallpaperResult<Vec<Wallpaper>> {
        let ids: Vec<i64> = feature_ids.iter().copied().filter(|id| *id != 0).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = WallpapersEntity::find()
            .filter(wallpapers::Column::FeatureId.is_in(ids))
            .all(&self.db)
            .await?;

        hydrate(&self.db, rows).await
    }

    async fn insert(&self, input: NewWallpaper) -> WallpaperResult<Wallpaper> {
        let txn = self.db.begin().await?;

        let mut seen = HashSet::new();
        let tag_ids: Vec<i32> = input
            .tag_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let active_model: wallpapers::ActiveModel = input.into();
        let row = active_model.insert(&txn).await?;

        if !tag_ids.is_empty() {
            let links = tag_ids
                .into_iter()
                .map(|tag_id| wallpaper_tags::link(row.id, tag_id));
            WallpaperTagsEntity::insert_many(links)
                .on_conflict_do_nothing_on([
                    wallpaper_tags::Column::WallpaperId,
                    wallpaper_tags::Column::TagId,
                ])
                .exec_without_returning(&txn)
                .await?;
        }

        let wallpaper = hydrate_one(&txn, row)
            .await?
            .ok_or_else(|| WallpaperError::Internal("Failed to load wallpaper".to_string()))?;

        txn.commit().await?;

        tracing::info!(
            wallpaper_id = wallpaper.id,
            feature_id = wallpaper.feature_id,
            "Created wallpaper"
        );
        Ok(wallpaper)
    }

    async fn begin_delete(&self, id: i32) -> WallpaperResult<Box<dyn PendingDeletion>> {
        let txn = self.db.begin().await?;

        let row = WallpapersEntity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await?;

        let Some(row) = row else {
            txn.rollback().await?;
            return Err(WallpaperError::wallpaper_not_found(id));
        };

        // wallpaper_tags rows go with it (ON DELETE CASCADE)
        WallpapersEntity::delete_by_id(id).exec(&txn).await?;

        Ok(Box::new(PgPendingDeletion {
            txn,
            wallpaper: row.into(),
        }))
    }
}

struct PgPendingDeletion {
    txn: DatabaseTransaction,
    wallpaper: Wallpaper,
}

#[async_trait]
impl PendingDeletion for PgPendingDeletion {
    fn wallpaper(&self) -> &Wallpaper {
        &self.wallpaper
    }

    async fn commit(self: Box<Self>) -> WallpaperResult<()> {
        let PgPendingDeletion { txn, wallpaper } = *self;
        txn.commit().await?;
        tracing::info!(wallpaper_id = wallpaper.id, "Deleted wallpaper");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> WallpaperResult<()> {
        let PgPendingDeletion { txn, .. } = *self;
        Ok(txn.rollback().await?)
    }
}

#[async_trait]
impl CatalogRepository for PgWallpaperRepository {
    async fn get_or_create_category(&self, name: &str) -> WallpaperResult<Category> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WallpaperError::Validation(
                "category name must not be empty".to_string(),
            ));
        }

        CategoriesEntity::insert(categories::named(name))
            .on_conflict_do_nothing_on([categories::Column::Name])
            .exec_without_returning(&self.db)
            .await?;

        self.find_category(name)
            .await?
            .ok_or_else(|| WallpaperError::Internal(format!("Category '{}' vanished", name)))
    }

    async fn get_or_create_tags(&self, names: &[String]) -> WallpaperResult<Vec<Tag>> {
        let names = normalize_names(names);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        TagsEntity::insert_many(names.iter().map(|name| tags::named(name)))
            .on_conflict_do_nothing_on([tags::Column::Name])
            .exec_without_returning(&self.db)
            .await?;

        let mut by_name: HashMap<String, Tag> = TagsEntity::find()
            .filter(tags::Column::Name.is_in(names.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|model| (model.name.clone(), model.into()))
            .collect();

        names
            .into_iter()
            .map(|name| {
                by_name
                    .remove(&name)
                    .ok_or_else(|| WallpaperError::Internal(format!("Tag '{}' vanished", name)))
            })
            .collect()
    }

    async fn find_category(&self, name: &str) -> WallpaperResult<Option<Category>> {
        let model = CategoriesEntity::find()
            .filter(categories::Column::Name.eq(name.trim()))
            .one(&self.db)
            .await?;

        Ok(model.map(Into::into))
    }

    async fn list_categories(&self) -> WallpaperResult<Vec<Category>> {
        let models = CategoriesEntity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.db)
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}
