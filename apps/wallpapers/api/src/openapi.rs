use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    components(
        schemas(axum_helpers::ErrorResponse)
    ),
    info(
        title = "Wallpapers API",
        version = "0.1.0",
        description = "Wallpaper catalog with filtered browsing, visual similarity search and image generation"
    ),
    servers(
        (url = "/api", description = "API base path")
    ),
    nest(
        (path = "/wallpapers", api = domain_wallpapers::handlers::ApiDoc),
        (path = "/categories", api = domain_wallpapers::handlers::CategoriesApiDoc),
        (path = "/images", api = domain_wallpapers::generation::handlers::ApiDoc)
    )
)]
pub struct ApiDoc;
