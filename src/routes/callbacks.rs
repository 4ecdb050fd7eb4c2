use axum::{body::Bytes, routing::post, Router};

use crate::handlers::callback_handlers::{self, CallbackKind};
use crate::state::AppState;

pub fn callback_routes() -> Router<AppState> {
    CallbackKind::ALL
        .into_iter()
        .fold(Router::new(), |router, kind| {
            router.route(
                &format!("/{}", kind.route()),
                post(move |body: Bytes| callback_handlers::acknowledge(kind, body)),
            )
        })
}
