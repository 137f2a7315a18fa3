use axum::Router;
use domain_wallpapers::handlers;

pub fn router(state: &crate::state::AppState) -> Router {
    handlers::categories_router(super::wallpapers::service(state))
}
