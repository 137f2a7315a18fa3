use axum::Router;

pub mod categories;
pub mod health;
pub mod images;
pub mod wallpapers;

/// Creates the API routes without the `/api` prefix.
/// The `/api` prefix will be added by the `create_router` helper.
pub fn routes(state: &crate::state::AppState) -> Router {
    Router::new()
        .nest("/wallpapers", wallpapers::router(state))
        .nest("/categories", categories::router(state))
        .nest("/images", images::router(state))
}

/// Router with the /ready endpoint, checking PostgreSQL and the vector store.
pub fn ready_router(state: crate::state::AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}
