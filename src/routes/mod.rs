use crate::models::AppState;
use axum::Router;

pub mod appointment_routes;
pub mod auth_routes;
pub mod home_routes;
pub mod photo_routes;
pub mod staff_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/auth", auth_routes::router())
        .nest("/api/v1/staff", staff_routes::router())
        .nest("/api/v1", appointment_routes::router())
        .nest("/api/v1", photo_routes::router())
        .merge(home_routes::router())
        .with_state(state)
}
