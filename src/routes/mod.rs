pub(crate) mod callbacks;
pub(crate) mod mpesa;

use axum::Router;

use crate::state::AppState;

/// Every route the relay serves, without the HTTP middleware stack.
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api", mpesa::mpesa_routes())
        .nest("/callback", callbacks::callback_routes())
        .with_state(state)
}
