//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use obi_core::{
    AcademyId, ClassId, EligibilityResult, ErrorKind, GraduationFilter, GraduationRule,
    GraduationStatus, IngestSummary, MemberId, NewGraduation, ObiError, Rank,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error envelope returned by every failing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// HTTP status for an error kind.
#[must_use]
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An engine error on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub ObiError);

impl From<ObiError> for ApiError {
    fn from(err: ObiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(ErrorResponse::new(self.0.to_string()))).into_response()
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Optional evaluation date (`?as_of=YYYY-MM-DD`). Defaults to today (UTC).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AsOfQuery {
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Roster scan response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub academy: AcademyId,
    pub as_of: NaiveDate,
    pub count: usize,
    pub results: Vec<EligibilityResult>,
}

impl ScanResponse {
    pub fn new(academy: AcademyId, as_of: NaiveDate, results: Vec<EligibilityResult>) -> Self {
        Self {
            academy,
            as_of,
            count: results.len(),
            results,
        }
    }
}

// =============================================================================
// RULES
// =============================================================================

/// Body of `PUT /academies/{academy}/rules/{belt}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRequest {
    pub min_classes: u32,
    pub min_months: u32,
    pub classes_per_degree: u32,
    #[serde(default)]
    pub min_weekly_frequency_tenths: Option<u32>,
}

impl RuleRequest {
    pub fn to_rule(&self) -> GraduationRule {
        GraduationRule {
            min_weekly_frequency_tenths: self.min_weekly_frequency_tenths,
            ..GraduationRule::new(self.min_classes, self.min_months, self.classes_per_degree)
        }
    }
}

/// Result of resetting an academy's rules to the templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetRulesResponse {
    pub success: bool,
    pub academy: AcademyId,
    pub copied: usize,
}

/// `?regular=true` restricts the belt listing to regular belts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeltsQuery {
    #[serde(default)]
    pub regular: bool,
}

// =============================================================================
// GRADUATIONS
// =============================================================================

/// Body of `POST /academies/{academy}/graduations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGraduationRequest {
    pub member: u64,
    /// Prior belt; defaults to the member's current rank when omitted.
    #[serde(default)]
    pub previous_belt: Option<String>,
    #[serde(default)]
    pub previous_degree: Option<u8>,
    pub belt: String,
    pub degree: u8,
    /// Decision date; defaults to today (UTC).
    #[serde(default)]
    pub decided_on: Option<NaiveDate>,
    pub granted_by: u64,
    #[serde(default)]
    pub class: Option<u64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub pending: bool,
    #[serde(default)]
    pub manual: bool,
    #[serde(default)]
    pub justification: Option<String>,
}

impl CreateGraduationRequest {
    /// Convert to engine input. The prior rank needs both belt and degree.
    pub fn to_new_graduation(
        &self,
        academy: AcademyId,
        today: NaiveDate,
    ) -> Result<NewGraduation, ObiError> {
        let previous = match (&self.previous_belt, self.previous_degree) {
            (Some(belt), Some(degree)) => Some(Rank::new(belt.as_str(), degree)),
            (None, None) => None,
            _ => {
                return Err(ObiError::InvalidInput(
                    "previous_belt and previous_degree must be given together".to_string(),
                ));
            }
        };

        Ok(NewGraduation {
            member: MemberId(self.member),
            academy,
            previous,
            target: Rank::new(self.belt.as_str(), self.degree),
            decided_on: self.decided_on.unwrap_or(today),
            granted_by: MemberId(self.granted_by),
            class: self.class.map(ClassId),
            notes: self.notes.clone(),
            pending: self.pending,
            manual: self.manual,
            justification: self.justification.clone(),
        })
    }
}

/// Query string of `GET /academies/{academy}/graduations`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub member: Option<u64>,
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
}

impl HistoryQuery {
    pub fn to_filter(&self) -> Result<GraduationFilter, ObiError> {
        Ok(GraduationFilter {
            member: self.member.map(MemberId),
            from: self.from,
            to: self.to,
            status: self
                .status
                .as_deref()
                .map(GraduationStatus::parse)
                .transpose()?,
        })
    }
}

/// Acknowledgement of a cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    pub id: u64,
    pub status: GraduationStatus,
}

// =============================================================================
// INGEST
// =============================================================================

/// Result of a snapshot ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    pub summary: IngestSummary,
}
