use axum::Router;
use domain_wallpapers::generation::handlers;

pub fn router(state: &crate::state::AppState) -> Router {
    handlers::router(state.generator.clone(), super::wallpapers::service(state))
}
