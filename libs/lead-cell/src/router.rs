// libs/lead-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn lead_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::create_lead).get(handlers::list_leads))
        .route("/score-preview", post(handlers::preview_score))
        .route(
            "/{lead_id}",
            get(handlers::get_lead)
                .patch(handlers::update_lead)
                .delete(handlers::delete_lead),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
