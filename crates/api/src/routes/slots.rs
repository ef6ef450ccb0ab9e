use axum::{
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, ApiState};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/api/slots", post(handlers::slots::create_slot))
        .route("/api/slots/:id", delete(handlers::slots::delete_slot))
        .route(
            "/api/providers/:id/open-slots",
            get(handlers::slots::open_slots),
        )
}
