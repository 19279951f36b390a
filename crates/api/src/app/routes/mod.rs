use axum::Router;

pub mod auth;
pub mod products;
pub mod reviews;
pub mod system;
pub mod users;

/// Router for everything under `/api/v1`.
pub fn router(photo_body_limit: usize) -> Router {
    Router::new()
        .nest("/products", products::router(photo_body_limit))
        .nest("/reviews", reviews::router())
        .nest("/users", users::router())
        .nest("/auth", auth::router())
}
