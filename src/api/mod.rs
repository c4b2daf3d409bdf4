//! Router for glassfeed.
//!
//! - `/` index page and form operations
//! - `/auth`, `/oauth2callback`, `/signout` timeline sign-in
//! - `/feeds` manual refresh cycle
//! - `/subscriptions` action notifications
//! - `/status` health check

pub mod operations;
pub mod page;
pub mod routes;
pub mod session;

use crate::SharedState;
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn router(state: SharedState) -> Router {
    routes::app_router(state).layer(TraceLayer::new_for_http())
}
