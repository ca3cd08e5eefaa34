use bson::oid::ObjectId;
use chrono::Utc;

use crate::models::cancellation_request::{CancellationRequest, RequestStatus};
use crate::services::cancellation::interface::{
    Decision, NotificationSink, WorkflowError, WorkflowEvent, WorkflowStore,
};

pub const MIN_REASON_CHARS: usize = 10;
pub const MAX_REASON_CHARS: usize = 500;

/// The cancellation lifecycle: a customer files a request against their own
/// booking, an admin approves or rejects it, and approval cancels the booking.
/// pending is the only non-terminal state.
pub struct CancellationService<S, N> {
    store: S,
    notifier: N,
}

impl<S: WorkflowStore, N: NotificationSink> CancellationService<S, N> {
    pub fn new(store: S, notifier: N) -> Self {
        CancellationService { store, notifier }
    }

    pub async fn create(
        &self,
        booking_id: ObjectId,
        user_id: ObjectId,
        reason: &str,
    ) -> Result<CancellationRequest, WorkflowError> {
        let reason = reason.trim();
        let length = reason.chars().count();
        if length < MIN_REASON_CHARS {
            return Err(WorkflowError::Validation(format!(
                "Reason must be at least {} characters",
                MIN_REASON_CHARS
            )));
        }
        if length > MAX_REASON_CHARS {
            return Err(WorkflowError::Validation(format!(
                "Reason must be at most {} characters",
                MAX_REASON_CHARS
            )));
        }

        let booking = self
            .store
            .find_booking(booking_id)
            .await?
            .ok_or(WorkflowError::NotFound("Booking"))?;
        // A booking someone else owns looks like no booking at all.
        if booking.user_id != user_id {
            return Err(WorkflowError::NotFound("Booking"));
        }

        if self.store.find_pending_by_booking(booking_id).await?.is_some() {
            return Err(WorkflowError::Conflict(
                "A cancellation request is already pending for this booking".to_string(),
            ));
        }

        let now = Utc::now();
        let request = CancellationRequest {
            id: None,
            booking_id,
            user_id,
            booking_type: booking.booking_type,
            reason: reason.to_string(),
            status: RequestStatus::Pending,
            admin_note: None,
            processed_by: None,
            processed_at: None,
            created_at: Some(now),
            updated_at: Some(now),
        };

        let created = self.store.insert_request(request).await?;
        self.notifier.notify(&WorkflowEvent::created(&created));
        Ok(created)
    }

    pub async fn approve(
        &self,
        request_id: ObjectId,
        admin_id: ObjectId,
        admin_note: Option<String>,
    ) -> Result<CancellationRequest, WorkflowError> {
        self.process(request_id, admin_id, RequestStatus::Approved, admin_note)
            .await
    }

    pub async fn reject(
        &self,
        request_id: ObjectId,
        admin_id: ObjectId,
        admin_note: Option<String>,
    ) -> Result<CancellationRequest, WorkflowError> {
        let note = admin_note.as_deref().map(str::trim).unwrap_or("");
        if note.is_empty() {
            return Err(WorkflowError::Validation(
                "An admin note is required when rejecting a request".to_string(),
            ));
        }
        self.process(
            request_id,
            admin_id,
            RequestStatus::Rejected,
            Some(note.to_string()),
        )
        .await
    }

    async fn process(
        &self,
        request_id: ObjectId,
        admin_id: ObjectId,
        status: RequestStatus,
        admin_note: Option<String>,
    ) -> Result<CancellationRequest, WorkflowError> {
        let request = self
            .store
            .find_request(request_id)
            .await?
            .ok_or(WorkflowError::NotFound("Cancellation request"))?;
        if request.status.is_terminal() {
            return Err(WorkflowError::InvalidState(request.status));
        }

        let decision = Decision {
            request_id,
            booking_id: request.booking_id,
            status,
            admin_note,
            processed_by: admin_id,
            processed_at: Utc::now(),
            cancel_booking: status == RequestStatus::Approved,
        };

        let processed = self.store.apply_decision(&decision).await?;
        self.notifier.notify(&WorkflowEvent::processed(&processed));
        Ok(processed)
    }

    /// The pending request for a booking. None is the everyday answer for a
    /// booking nobody is trying to cancel, not a failure.
    pub async fn get_by_booking(
        &self,
        booking_id: ObjectId,
    ) -> Result<Option<CancellationRequest>, WorkflowError> {
        self.store.find_pending_by_booking(booking_id).await
    }

    pub async fn list(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CancellationRequest>, WorkflowError> {
        self.store.list_requests(status).await
    }
}
