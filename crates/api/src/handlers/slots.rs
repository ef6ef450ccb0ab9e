//! # Slot Handlers
//!
//! Handlers for provider-facing slot management: publishing new slots,
//! removing unbooked ones, and listing a provider's open availability.
//! Open-slot listings exclude expired slots — a slot whose start instant has
//! passed while still unbooked is computed as unavailable at read time, not
//! flagged by any background job.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use bookline_core::models::principal::Principal;
use bookline_core::models::slot::{CreateSlotRequest, OpenSlotsResponse, SlotResponse};

use crate::{middleware::error_handling::AppError, ApiState};

#[axum::debug_handler]
pub async fn create_slot(
    State(state): State<Arc<ApiState>>,
    Json(payload): Json<CreateSlotRequest>,
) -> Result<Json<SlotResponse>, AppError> {
    let provider = Principal::provider(payload.provider_id);

    let slot = state
        .engine
        .create_slot(
            &provider,
            payload.date,
            payload.start_time,
            payload.end_time,
            payload.category,
        )
        .await?;

    Ok(Json(slot.into()))
}

/// Query parameters for slot deletion: the caller asserts the owning
/// provider's identity.
#[derive(Debug, Deserialize)]
pub struct DeleteSlotQuery {
    pub provider_id: Uuid,
}

#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<DeleteSlotQuery>,
) -> Result<StatusCode, AppError> {
    let provider = Principal::provider(query.provider_id);

    state.engine.delete_slot(id, &provider).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn open_slots(
    State(state): State<Arc<ApiState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<OpenSlotsResponse>, AppError> {
    let slots = state.engine.open_slots(provider_id).await?;

    let response = OpenSlotsResponse {
        provider_id,
        slots: slots.into_iter().map(SlotResponse::from).collect(),
    };

    Ok(Json(response))
}
