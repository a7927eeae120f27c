use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extract;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod services;
pub mod token;
pub mod validate;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::profile_routes())
}
