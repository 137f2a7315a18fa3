use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use axum_extra::extract::Query;
use axum_helpers::{
    ApiKey, IdPath, ValidatedJson,
    errors::responses::{
        BadRequestResponse, BadRequestValidationResponse, InternalServerErrorResponse,
        NotFoundResponse, ServiceUnavailableResponse, UnauthorizedResponse,
    },
    require_api_key,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::WallpaperResult;
use crate::lifecycle::WallpaperLifecycle;
use crate::models::{
    AdjacentFilter, AdjacentQuery, Category, CreateWallpaper, Direction, ListWallpapersQuery,
    SimilarQuery, Tag, Wallpaper, WallpaperFilter, WallpaperListResponse,
};
use crate::service::WallpaperService;

pub const WALLPAPERS_TAG: &str = "wallpapers";
pub const CATEGORIES_TAG: &str = "categories";

/// OpenAPI documentation for the wallpapers API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_wallpapers,
        get_wallpaper,
        next_wallpaper,
        previous_wallpaper,
        similar_wallpapers,
        create_wallpaper,
        delete_wallpaper,
    ),
    components(
        schemas(Wallpaper, Category, Tag, CreateWallpaper, WallpaperListResponse),
        responses(
            BadRequestResponse,
            BadRequestValidationResponse,
            NotFoundResponse,
            UnauthorizedResponse,
            ServiceUnavailableResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = WALLPAPERS_TAG, description = "Wallpaper browsing, similarity search and administration")
    )
)]
pub struct ApiDoc;

/// OpenAPI documentation for the categories API
#[derive(OpenApi)]
#[openapi(
    paths(list_categories),
    components(schemas(Category), responses(InternalServerErrorResponse)),
    tags((name = CATEGORIES_TAG, description = "Wallpaper categories"))
)]
pub struct CategoriesApiDoc;

struct WallpapersState {
    service: WallpaperService,
    lifecycle: WallpaperLifecycle,
}

/// Create the wallpapers router. Create and delete require `X-API-Key`.
pub fn router(service: WallpaperService, lifecycle: WallpaperLifecycle, api_key: ApiKey) -> Router {
    let state = Arc::new(WallpapersState { service, lifecycle });
    let admin = middleware::from_fn_with_state(api_key, require_api_key);

    Router::new()
        .route(
            "/",
            get(list_wallpapers).merge(post(create_wallpaper).route_layer(admin.clone())),
        )
        .route(
            "/{id}",
            get(get_wallpaper).merge(delete(delete_wallpaper).route_layer(admin)),
        )
        .route("/{id}/next", get(next_wallpaper))
        .route("/{id}/previous", get(previous_wallpaper))
        .route("/{id}/similar", get(similar_wallpapers))
        .with_state(state)
}

/// Create the categories router
pub fn categories_router(service: WallpaperService) -> Router {
    Router::new()
        .route("/", get(list_categories))
        .with_state(Arc::new(service))
}

/// List wallpapers matching tags, category and search
#[utoipa::path(
    get,
    path = "",
    tag = WALLPAPERS_TAG,
    params(ListWallpapersQuery),
    responses(
        (status = 200, description = "Page of wallpapers", body = WallpaperListResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_wallpapers(
    State(state): State<Arc<WallpapersState>>,
    Query(query): Query<ListWallpapersQuery>,
) -> WallpaperResult<Json<WallpaperListResponse>> {
    let filter = WallpaperFilter::from(query);
    let (limit, offset) = (filter.limit, filter.offset);
    let page = state.service.list(filter).await?;

    Ok(Json(WallpaperListResponse {
        wallpapers: page.wallpapers,
        total: page.total,
        limit,
        offset,
    }))
}

/// Get a wallpaper by id
#[utoipa::path(
    get,
    path = "/{id}",
    tag = WALLPAPERS_TAG,
    params(("id" = i32, Path, description = "Wallpaper ID")),
    responses(
        (status = 200, description = "Wallpaper found", body = Wallpaper),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_wallpaper(
    State(state): State<Arc<WallpapersState>>,
    IdPath(id): IdPath,
) -> WallpaperResult<Json<Wallpaper>> {
    Ok(Json(state.service.get(id).await?))
}

async fn adjacent(
    state: &WallpapersState,
    id: i32,
    query: AdjacentQuery,
    direction: Direction,
) -> WallpaperResult<Json<Wallpaper>> {
    let filter = AdjacentFilter {
        current_id: id,
        category: query.category,
        search: query.search,
    };
    Ok(Json(state.service.adjacent(filter, direction).await?))
}

/// Next wallpaper (next lower id) under the same filters
#[utoipa::path(
    get,
    path = "/{id}/next",
    tag = WALLPAPERS_TAG,
    params(("id" = i32, Path, description = "Current wallpaper ID"), AdjacentQuery),
    responses(
        (status = 200, description = "Next wallpaper", body = Wallpaper),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn next_wallpaper(
    State(state): State<Arc<WallpapersState>>,
    IdPath(id): IdPath,
    Query(query): Query<AdjacentQuery>,
) -> WallpaperResult<Json<Wallpaper>> {
    adjacent(&state, id, query, Direction::Next).await
}

/// Previous wallpaper (next higher id) under the same filters
#[utoipa::path(
    get,
    path = "/{id}/previous",
    tag = WALLPAPERS_TAG,
    params(("id" = i32, Path, description = "Current wallpaper ID"), AdjacentQuery),
    responses(
        (status = 200, description = "Previous wallpaper", body = Wallpaper),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn previous_wallpaper(
    State(state): State<Arc<WallpapersState>>,
    IdPath(id): IdPath,
    Query(query): Query<AdjacentQuery>,
) -> WallpaperResult<Json<Wallpaper>> {
    adjacent(&state, id, query, Direction::Previous).await
}

/// Visually similar wallpapers, most similar first
#[utoipa::path(
    get,
    path = "/{id}/similar",
    tag = WALLPAPERS_TAG,
    params(("id" = i32, Path, description = "Wallpaper ID"), SimilarQuery),
    responses(
        (status = 200, description = "Similar wallpapers", body = Vec<Wallpaper>),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn similar_wallpapers(
    State(state): State<Arc<WallpapersState>>,
    IdPath(id): IdPath,
    Query(query): Query<SimilarQuery>,
) -> WallpaperResult<Json<Vec<Wallpaper>>> {
    Ok(Json(state.service.similar(id, query.limit()).await?))
}

/// Create a wallpaper and index its image features
#[utoipa::path(
    post,
    path = "",
    tag = WALLPAPERS_TAG,
    request_body = CreateWallpaper,
    responses(
        (status = 201, description = "Wallpaper created", body = Wallpaper),
        (status = 400, response = BadRequestValidationResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_wallpaper(
    State(state): State<Arc<WallpapersState>>,
    ValidatedJson(input): ValidatedJson<CreateWallpaper>,
) -> WallpaperResult<impl IntoResponse> {
    let wallpaper = state.lifecycle.create(input).await?;
    Ok((StatusCode::CREATED, Json(wallpaper)))
}

/// Delete a wallpaper and its feature vector
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = WALLPAPERS_TAG,
    params(("id" = i32, Path, description = "Wallpaper ID")),
    responses(
        (status = 204, description = "Wallpaper deleted"),
        (status = 400, response = BadRequestResponse),
        (status = 401, response = UnauthorizedResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_wallpaper(
    State(state): State<Arc<WallpapersState>>,
    IdPath(id): IdPath,
) -> WallpaperResult<impl IntoResponse> {
    state.lifecycle.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List all categories
#[utoipa::path(
    get,
    path = "",
    tag = CATEGORIES_TAG,
    responses(
        (status = 200, description = "Categories ordered by name", body = Vec<Category>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_categories(
    State(service): State<Arc<WallpaperService>>,
) -> WallpaperResult<Json<Vec<Category>>> {
    Ok(Json(service.list_categories().await?))
}
