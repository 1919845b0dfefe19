//! Ticket API handlers.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use ticketdesk_core::ticket::{parse_bulk_csv, RejectedRow};
use ticketdesk_core::{ImportSummary, Ticket, TicketError};

use crate::metrics::{
    IMPORT_BATCHES_TOTAL, IMPORT_ROWS_REJECTED_TOTAL, TICKETS_CREATED_TOTAL,
    TICKETS_IMPORTED_TOTAL, TICKET_ERRORS_TOTAL, TICKET_STATUS_UPDATES,
};
use crate::state::AppState;

/// Multipart field carrying the CSV upload.
const UPLOAD_FIELD: &str = "file";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for creating a ticket
#[derive(Debug, Deserialize)]
pub struct CreateTicketBody {
    pub description: String,
    #[serde(rename = "createdBy", default)]
    pub created_by: String,
}

#[derive(Debug, Serialize)]
pub struct CreateTicketResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct TicketResponse {
    pub ticket: Ticket,
}

#[derive(Debug, Serialize)]
pub struct TicketListResponse {
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Deserialize)]
pub struct AssignedTicketsParams {
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssigneeBody {
    pub assignee: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub imported: ImportSummary,
    pub entries: Vec<Ticket>,
    pub rejected: Vec<RejectedRow>,
}

/// Half-open index range of the chunk that failed an import.
#[derive(Debug, Serialize)]
pub struct FailedRange {
    pub start: usize,
    pub end: usize,
    pub committed_batches: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TicketErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_range: Option<FailedRange>,
}

// ============================================================================
// Error mapping
// ============================================================================

/// Everything a ticket handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request before the repository was reached.
    BadRequest(String),
    Ticket(TicketError),
}

impl From<TicketError> for ApiError {
    fn from(err: TicketError) -> Self {
        ApiError::Ticket(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn status_for(err: &TicketError) -> StatusCode {
    match err {
        TicketError::NotFound(_) => StatusCode::NOT_FOUND,
        TicketError::Validation(_) | TicketError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                TicketErrorResponse {
                    error: message,
                    failed_range: None,
                },
            ),
            ApiError::Ticket(err) => {
                TICKET_ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();

                let status = status_for(&err);
                if status.is_server_error() {
                    error!(kind = err.kind(), error = %err, "Ticket operation failed");
                }

                let failed_range = match &err {
                    TicketError::PartialBatchFailure {
                        start,
                        end,
                        committed_batches,
                        ..
                    } => Some(FailedRange {
                        start: *start,
                        end: *end,
                        committed_batches: *committed_batches,
                    }),
                    _ => None,
                };

                (
                    status,
                    TicketErrorResponse {
                        error: err.to_string(),
                        failed_range,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new ticket
pub async fn create_ticket(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTicketBody>, JsonRejection>,
) -> Result<Json<CreateTicketResponse>, ApiError> {
    let Json(body) = body?;

    if body.description.trim().is_empty() {
        return Err(TicketError::Validation("description is required".to_string()).into());
    }

    let id = state
        .repository()
        .create_ticket(Ticket::new(body.description, body.created_by))
        .await?;

    TICKETS_CREATED_TOTAL.inc();
    Ok(Json(CreateTicketResponse { id }))
}

/// Get a ticket by ID
pub async fn get_ticket(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, ApiError> {
    let ticket = state.repository().get_ticket(&id).await?;
    Ok(Json(TicketResponse { ticket }))
}

/// List tickets assigned to `?username=`
pub async fn get_assigned_tickets(
    State(state): State<Arc<AppState>>,
    params: Result<Query<AssignedTicketsParams>, QueryRejection>,
) -> Result<Json<TicketListResponse>, ApiError> {
    let Query(params) = params?;
    let tickets = state
        .repository()
        .get_tickets_assigned_to(&params.username)
        .await?;
    Ok(Json(TicketListResponse { tickets }))
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(body) = body?;

    let result = state.repository().update_status(&id, &body.status).await;
    let label = match &result {
        Ok(()) => "ok",
        Err(e) => e.kind(),
    };
    TICKET_STATUS_UPDATES.with_label_values(&[label]).inc();

    result?;
    Ok(MessageResponse::new("status updated"))
}

pub async fn update_assign_to(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateAssigneeBody>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(body) = body?;
    state
        .repository()
        .update_assign_to(&id, &body.assignee)
        .await?;
    Ok(MessageResponse::new("assignee updated"))
}

/// Bulk import tickets from a multipart CSV upload in the `file` field.
pub async fn import_tickets(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImportResponse>, ApiError> {
    let mut multipart = multipart?;
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            upload = Some(bytes);
            break;
        }
    }

    let Some(upload) = upload else {
        warn!("Import request without a file field");
        return Err(ApiError::BadRequest(format!(
            "missing multipart field '{}'",
            UPLOAD_FIELD
        )));
    };

    let decoded = parse_bulk_csv(upload.as_ref())?;
    IMPORT_ROWS_REJECTED_TOTAL.inc_by(decoded.rejected.len() as u64);

    let summary = state
        .repository()
        .bulk_import(decoded.tickets.clone())
        .await?;

    TICKETS_IMPORTED_TOTAL.inc_by(summary.tickets_written as u64);
    IMPORT_BATCHES_TOTAL.inc_by(summary.batches_written as u64);

    info!(
        imported = summary.tickets_written,
        rejected = decoded.rejected.len(),
        "Processed ticket import"
    );

    Ok(Json(ImportResponse {
        message: "OK".to_string(),
        imported: summary,
        entries: decoded.tickets,
        rejected: decoded.rejected,
    }))
}
