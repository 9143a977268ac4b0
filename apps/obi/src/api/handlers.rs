//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ApiError, AsOfQuery, BeltsQuery, CancelResponse, CreateGraduationRequest, HealthResponse,
        HistoryQuery, IngestResponse, ResetRulesResponse, RuleRequest, ScanResponse,
    },
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use obi_core::{
    AcademyId, Belt, BeltSlug, EligibilityResult, GraduationId, GraduationRecord,
    GraduationStatus, MemberId, RuleView, Snapshot, today,
};

type ApiResult<T> = Result<Json<T>, ApiError>;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// BELTS
// =============================================================================

/// The belt ladder in order.
pub async fn belts_handler(
    State(state): State<AppState>,
    Query(query): Query<BeltsQuery>,
) -> Json<Vec<Belt>> {
    let engine = state.engine.read().await;
    let belts = if query.regular {
        engine.regular_belts()
    } else {
        engine.belts()
    };
    Json(belts.into_iter().cloned().collect())
}

// =============================================================================
// RULES
// =============================================================================

/// Effective rule per belt for an academy.
pub async fn list_rules_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
) -> ApiResult<Vec<RuleView>> {
    let engine = state.engine.read().await;
    Ok(Json(engine.list_rules(AcademyId(academy))?))
}

/// Create or replace an academy rule.
pub async fn upsert_rule_handler(
    State(state): State<AppState>,
    Path((academy, belt)): Path<(u64, String)>,
    Json(request): Json<RuleRequest>,
) -> ApiResult<Vec<RuleView>> {
    let academy = AcademyId(academy);
    let mut engine = state.engine.write().await;
    engine.upsert_rule(academy, &BeltSlug::new(belt), request.to_rule())?;
    Ok(Json(engine.list_rules(academy)?))
}

/// Replace the academy's rules with the default templates.
pub async fn reset_rules_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
) -> ApiResult<ResetRulesResponse> {
    let academy = AcademyId(academy);
    let mut engine = state.engine.write().await;
    let copied = engine.reset_rules(academy)?;
    Ok(Json(ResetRulesResponse {
        success: true,
        academy,
        copied,
    }))
}

// =============================================================================
// ELIGIBILITY
// =============================================================================

/// Evaluate one member.
pub async fn evaluate_handler(
    State(state): State<AppState>,
    Path((academy, member)): Path<(u64, u64)>,
    Query(query): Query<AsOfQuery>,
) -> ApiResult<EligibilityResult> {
    let as_of = query.as_of.unwrap_or_else(today);
    let engine = state.engine.read().await;
    Ok(Json(engine.evaluate_member_at(
        MemberId(member),
        AcademyId(academy),
        as_of,
    )?))
}

/// READY and APPROACHING members of an academy.
pub async fn scan_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
    Query(query): Query<AsOfQuery>,
) -> ApiResult<ScanResponse> {
    let academy = AcademyId(academy);
    let as_of = query.as_of.unwrap_or_else(today);
    let engine = state.engine.read().await;
    let results = engine.scan_roster_at(academy, as_of)?;
    Ok(Json(ScanResponse::new(academy, as_of, results)))
}

// =============================================================================
// GRADUATIONS
// =============================================================================

/// Filtered graduation history of an academy.
pub async fn list_graduations_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<GraduationRecord>> {
    let filter = query.to_filter()?;
    let engine = state.engine.read().await;
    Ok(Json(engine.list_graduations(AcademyId(academy), &filter)?))
}

/// Record a graduation.
pub async fn create_graduation_handler(
    State(state): State<AppState>,
    Path(academy): Path<u64>,
    Json(request): Json<CreateGraduationRequest>,
) -> Result<(StatusCode, Json<GraduationRecord>), ApiError> {
    let input = request.to_new_graduation(AcademyId(academy), today())?;
    let mut engine = state.engine.write().await;
    let record = engine.create_graduation(input)?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Fetch one record.
pub async fn get_graduation_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<GraduationRecord> {
    let engine = state.engine.read().await;
    Ok(Json(engine.graduation(GraduationId(id))?))
}

/// PENDING to CONFIRMED.
pub async fn confirm_graduation_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<GraduationRecord> {
    let mut engine = state.engine.write().await;
    Ok(Json(engine.confirm_graduation(GraduationId(id))?))
}

/// PENDING or CONFIRMED to CANCELLED.
pub async fn cancel_graduation_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<CancelResponse> {
    let mut engine = state.engine.write().await;
    engine.cancel_graduation(GraduationId(id))?;
    Ok(Json(CancelResponse {
        success: true,
        id,
        status: GraduationStatus::Cancelled,
    }))
}

// =============================================================================
// INGEST HANDLER
// =============================================================================

/// Mirror a collaborator snapshot.
pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(snapshot): Json<Snapshot>,
) -> ApiResult<IngestResponse> {
    let mut engine = state.engine.write().await;
    let summary = engine.ingest(&snapshot)?;
    Ok(Json(IngestResponse {
        success: true,
        summary,
    }))
}
