//! Claims handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use core_kernel::{AppError, ClaimId, ClaimItemId, ItemId};
use domain_claims::{submitted_at, Actor, ClaimTransition};

use crate::auth::{permissions, require_role};
use crate::dto::claims::*;
use crate::{error::ApiError, AppState};

/// Opens a Draft claim
pub async fn create_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateClaimRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    request.validate()?;
    let claim = state.service.create_claim(&actor, request.into()).await?;
    Ok((StatusCode::CREATED, Json(claim.into())))
}

/// Lists the claims the caller may see, newest first
pub async fn list_claims(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListClaimsQuery>,
) -> Result<Json<Vec<ClaimResponse>>, ApiError> {
    let claims = state.service.list_claims(&actor, query.into()).await?;
    Ok(Json(claims.into_iter().map(ClaimResponse::from).collect()))
}

/// Gets a claim by ID
pub async fn get_claim(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state.service.get_claim(&actor, ClaimId::from_uuid(id)).await?;
    Ok(Json(claim.into()))
}

/// Audit trail of a claim, oldest first
pub async fn get_history(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimHistoryResponse>, ApiError> {
    let (claim, rows) = state.service.history(&actor, ClaimId::from_uuid(id)).await?;

    Ok(Json(ClaimHistoryResponse {
        submitted_at: submitted_at(&claim, &rows),
        entries: rows.into_iter().map(HistoryEntryResponse::from).collect(),
    }))
}

/// Status changes of all claims during the past week
pub async fn recent_status_changes(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<StatusChangeResponse>>, ApiError> {
    require_role(&actor, permissions::CLAIM_REVIEW)?;
    let rows = state.service.recent_status_changes(&actor, Utc::now()).await?;
    Ok(Json(rows.into_iter().map(StatusChangeResponse::from).collect()))
}

/// Adds a claim item for a covered item
pub async fn add_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<ClaimResponse>), ApiError> {
    request.validate()?;
    let item_id = ItemId::from_uuid(request.item_id);
    let params = request.details.into_params().map_err(AppError::from)?;

    let claim = state
        .service
        .add_item(&actor, ClaimId::from_uuid(id), item_id, params)
        .await?;
    Ok((StatusCode::CREATED, Json(claim.into())))
}

/// Updates fields of a claim item
pub async fn update_item(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path((id, claim_item_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<ClaimItemRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    request.validate()?;
    let params = request.into_params().map_err(AppError::from)?;

    let claim = state
        .service
        .update_item(
            &actor,
            ClaimId::from_uuid(id),
            ClaimItemId::from_uuid(claim_item_id),
            params,
        )
        .await?;
    Ok(Json(claim.into()))
}

/// Links an uploaded file to a claim
pub async fn attach_file(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<AttachFileRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state
        .service
        .attach_file(&actor, ClaimId::from_uuid(id), request.file_id(), request.purpose)
        .await?;
    Ok(Json(claim.into()))
}

pub async fn submit(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    transition(&state, &actor, id, ClaimTransition::SubmitForApproval).await
}

pub async fn request_revision(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    require_role(&actor, permissions::CLAIM_REVIEW)?;
    request.validate()?;
    let message = request.message;
    transition(&state, &actor, id, ClaimTransition::RequestRevision { message }).await
}

pub async fn request_receipt(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    require_role(&actor, permissions::CLAIM_REVIEW)?;
    request.validate()?;
    let message = request.message;
    transition(&state, &actor, id, ClaimTransition::RequestReceipt { message }).await
}

pub async fn submit_receipt(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    transition(&state, &actor, id, ClaimTransition::SubmitReceipt).await
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    require_role(&actor, permissions::CLAIM_REVIEW)?;
    transition(&state, &actor, id, ClaimTransition::Approve).await
}

pub async fn deny(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    require_role(&actor, permissions::CLAIM_REVIEW)?;
    request.validate()?;
    let message = request.message;
    transition(&state, &actor, id, ClaimTransition::Deny { message }).await
}

/// Records the payout of an approved claim
pub async fn mark_paid(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClaimResponse>, ApiError> {
    require_role(&actor, permissions::CLAIM_PAY)?;
    transition(&state, &actor, id, ClaimTransition::MarkPaid).await
}

async fn transition(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    transition: ClaimTransition,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim = state
        .service
        .transition(actor, ClaimId::from_uuid(id), transition)
        .await?;
    Ok(Json(claim.into()))
}
