use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::allocation::{AllocationError, AllocationInput};
use super::domain::{AssetDraft, Beneficiary, BeneficiaryDraft, OwnerId, RuleDraft, RuleId};
use super::repository::{EstateRepository, RepositoryError};
use super::service::{EstatePlanningService, PlanningServiceError};

/// Router builder exposing the estate planning endpoints.
pub fn estate_router<R>(service: Arc<EstatePlanningService<R>>) -> Router
where
    R: EstateRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/estates/:owner_id/assets",
            post(register_asset_handler::<R>).get(list_assets_handler::<R>),
        )
        .route(
            "/api/v1/estates/:owner_id/beneficiaries",
            post(register_beneficiary_handler::<R>).get(list_beneficiaries_handler::<R>),
        )
        .route(
            "/api/v1/estates/:owner_id/rules",
            post(create_rule_handler::<R>).get(list_rules_handler::<R>),
        )
        .route(
            "/api/v1/estates/:owner_id/rules/:rule_id",
            get(get_rule_handler::<R>)
                .put(update_rule_handler::<R>)
                .delete(delete_rule_handler::<R>),
        )
        .route(
            "/api/v1/estates/:owner_id/allocations/review",
            post(review_allocations_handler::<R>),
        )
        .with_state(service)
}

/// Body for the standalone allocation review endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct AllocationReviewRequest {
    pub(crate) proposed: Vec<AllocationInput>,
    #[serde(default)]
    pub(crate) exclude_rule_id: Option<RuleId>,
}

pub(crate) async fn register_asset_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path(owner_id): Path<Uuid>,
    axum::Json(draft): axum::Json<AssetDraft>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.register_asset(OwnerId(owner_id), draft) {
        Ok(asset) => (StatusCode::CREATED, axum::Json(asset)).into_response(),
        Err(error) => planning_error_response(error),
    }
}

pub(crate) async fn list_assets_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path(owner_id): Path<Uuid>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.assets(OwnerId(owner_id)) {
        Ok(assets) => (StatusCode::OK, axum::Json(assets)).into_response(),
        Err(error) => planning_error_response(error),
    }
}

pub(crate) async fn register_beneficiary_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path(owner_id): Path<Uuid>,
    axum::Json(draft): axum::Json<BeneficiaryDraft>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.register_beneficiary(OwnerId(owner_id), draft) {
        Ok(beneficiary) => (StatusCode::CREATED, axum::Json(beneficiary.view())).into_response(),
        Err(error) => planning_error_response(error),
    }
}

pub(crate) async fn list_beneficiaries_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path(owner_id): Path<Uuid>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.beneficiaries(OwnerId(owner_id)) {
        Ok(beneficiaries) => {
            let views: Vec<_> = beneficiaries.iter().map(Beneficiary::view).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => planning_error_response(error),
    }
}

pub(crate) async fn create_rule_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path(owner_id): Path<Uuid>,
    axum::Json(draft): axum::Json<RuleDraft>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.create_rule(OwnerId(owner_id), draft) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => planning_error_response(error),
    }
}

pub(crate) async fn list_rules_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path(owner_id): Path<Uuid>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.rules(OwnerId(owner_id)) {
        Ok(overviews) => (StatusCode::OK, axum::Json(overviews)).into_response(),
        Err(error) => planning_error_response(error),
    }
}

pub(crate) async fn get_rule_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path((owner_id, rule_id)): Path<(Uuid, Uuid)>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.rule(OwnerId(owner_id), RuleId(rule_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => planning_error_response(error),
    }
}

pub(crate) async fn update_rule_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path((owner_id, rule_id)): Path<(Uuid, Uuid)>,
    axum::Json(draft): axum::Json<RuleDraft>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.update_rule(OwnerId(owner_id), RuleId(rule_id), draft) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(error) => planning_error_response(error),
    }
}

pub(crate) async fn delete_rule_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path((owner_id, rule_id)): Path<(Uuid, Uuid)>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.delete_rule(OwnerId(owner_id), RuleId(rule_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => planning_error_response(error),
    }
}

pub(crate) async fn review_allocations_handler<R>(
    State(service): State<Arc<EstatePlanningService<R>>>,
    Path(owner_id): Path<Uuid>,
    axum::Json(request): axum::Json<AllocationReviewRequest>,
) -> Response
where
    R: EstateRepository + 'static,
{
    match service.review_allocations(
        OwnerId(owner_id),
        &request.proposed,
        request.exclude_rule_id,
    ) {
        Ok(review) => (StatusCode::OK, axum::Json(review)).into_response(),
        Err(error) => planning_error_response(error),
    }
}

/// Maps the service error taxonomy onto status codes: malformed input to
/// 400, missing or foreign resources to 404, concurrent-edit conflicts to
/// 409, and repository outages to 500.
pub(crate) fn planning_error_response(error: PlanningServiceError) -> Response {
    let status = match &error {
        PlanningServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        PlanningServiceError::Repository(RepositoryError::Conflict)
        | PlanningServiceError::Repository(RepositoryError::StaleAllocations) => {
            StatusCode::CONFLICT
        }
        PlanningServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        PlanningServiceError::UnknownBeneficiary { .. } => StatusCode::NOT_FOUND,
        PlanningServiceError::Allocation(AllocationError::UnknownAsset { .. }) => {
            StatusCode::NOT_FOUND
        }
        _ => StatusCode::BAD_REQUEST,
    };

    let payload = match &error {
        PlanningServiceError::OverAllocated(review) => json!({
            "error": error.to_string(),
            "review": review,
        }),
        _ => json!({ "error": error.to_string() }),
    };

    (status, axum::Json(payload)).into_response()
}
