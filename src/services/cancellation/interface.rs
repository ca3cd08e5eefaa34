use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::booking::Booking;
use crate::models::cancellation_request::{CancellationRequest, RequestStatus};

pub const EVENT_REQUEST_CREATED: &str = "new_cancellation_request";
pub const EVENT_REQUEST_PROCESSED: &str = "cancellation_request_processed";

#[derive(Debug)]
pub enum WorkflowError {
    Validation(String),
    NotFound(&'static str),
    Conflict(String),
    InvalidState(RequestStatus),
    Database(String),
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowError::Validation(msg) => write!(f, "{}", msg),
            WorkflowError::NotFound(entity) => write!(f, "{} not found", entity),
            WorkflowError::Conflict(msg) => write!(f, "{}", msg),
            WorkflowError::InvalidState(status) => {
                write!(f, "Request has already been {}", status.as_str())
            }
            WorkflowError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for WorkflowError {}

/// An admin's ruling on a pending request, ready to be persisted. When
/// `cancel_booking` is set the store must flip the booking to cancelled in
/// the same atomic unit as the request update.
#[derive(Debug, Clone)]
pub struct Decision {
    pub request_id: ObjectId,
    pub booking_id: ObjectId,
    pub status: RequestStatus,
    pub admin_note: Option<String>,
    pub processed_by: ObjectId,
    pub processed_at: DateTime<Utc>,
    pub cancel_booking: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowEvent {
    pub name: &'static str,
    pub request_id: ObjectId,
    pub booking_id: ObjectId,
    pub status: RequestStatus,
}

impl WorkflowEvent {
    pub fn created(request: &CancellationRequest) -> Self {
        Self::from_request(EVENT_REQUEST_CREATED, request)
    }

    pub fn processed(request: &CancellationRequest) -> Self {
        Self::from_request(EVENT_REQUEST_PROCESSED, request)
    }

    fn from_request(name: &'static str, request: &CancellationRequest) -> Self {
        WorkflowEvent {
            name,
            request_id: request.id.unwrap_or_default(),
            booking_id: request.booking_id,
            status: request.status,
        }
    }
}

/// Persistence seam for the cancellation workflow. The Mongo implementation
/// backs the real API; tests drive the same service against an in-memory one.
pub trait WorkflowStore {
    async fn find_booking(&self, booking_id: ObjectId) -> Result<Option<Booking>, WorkflowError>;

    async fn find_request(
        &self,
        request_id: ObjectId,
    ) -> Result<Option<CancellationRequest>, WorkflowError>;

    /// The at-most-one pending request for a booking, if any.
    async fn find_pending_by_booking(
        &self,
        booking_id: ObjectId,
    ) -> Result<Option<CancellationRequest>, WorkflowError>;

    /// Insert a new pending request. Must fail with `Conflict` when another
    /// pending request for the same booking already exists, even under
    /// concurrent inserts.
    async fn insert_request(
        &self,
        request: CancellationRequest,
    ) -> Result<CancellationRequest, WorkflowError>;

    /// Persist an admin decision. Only a request still in pending state may
    /// be updated; both the request update and the booking cancellation (when
    /// asked for) commit together or not at all.
    async fn apply_decision(&self, decision: &Decision)
        -> Result<CancellationRequest, WorkflowError>;

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CancellationRequest>, WorkflowError>;
}

/// Called synchronously after a workflow transition has committed. Transport
/// is whatever the implementation decides; failures must not affect the
/// already-committed transition.
pub trait NotificationSink {
    fn notify(&self, event: &WorkflowEvent);
}
