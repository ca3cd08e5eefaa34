use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::{Client, Collection};
use std::sync::Arc;

use crate::models::booking::{Booking, BookingStatus};
use crate::models::cancellation_request::{CancellationRequest, RequestStatus};
use crate::services::cancellation::interface::{Decision, WorkflowError, WorkflowStore};

impl From<mongodb::error::Error> for WorkflowError {
    fn from(err: mongodb::error::Error) -> Self {
        WorkflowError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for WorkflowError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        WorkflowError::Database(err.to_string())
    }
}

pub struct MongoWorkflowStore {
    client: Arc<Client>,
}

impl MongoWorkflowStore {
    pub fn new(client: Arc<Client>) -> Self {
        MongoWorkflowStore { client }
    }

    fn bookings(&self) -> Collection<Booking> {
        self.client.database("Bookings").collection("Bookings")
    }

    fn requests(&self) -> Collection<CancellationRequest> {
        self.client
            .database("Bookings")
            .collection("CancellationRequests")
    }

    /// Approve path: the request update and the booking cancellation ride one
    /// session transaction. Returns the matched count for the request update;
    /// 0 means the request was no longer pending and nothing was committed.
    async fn approve_in_transaction(
        &self,
        request_filter: Document,
        request_update: Document,
        booking_filter: Document,
        booking_update: Document,
    ) -> Result<u64, WorkflowError> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        let matched = match self
            .requests()
            .update_one(request_filter, request_update)
            .session(&mut session)
            .await
        {
            Ok(result) => result.matched_count,
            Err(err) => {
                let _ = session.abort_transaction().await;
                return Err(err.into());
            }
        };

        if matched == 0 {
            let _ = session.abort_transaction().await;
            return Ok(0);
        }

        match self
            .bookings()
            .update_one(booking_filter, booking_update)
            .session(&mut session)
            .await
        {
            Ok(result) if result.matched_count > 0 => {
                session.commit_transaction().await?;
                Ok(matched)
            }
            Ok(_) => {
                let _ = session.abort_transaction().await;
                Err(WorkflowError::NotFound("Booking"))
            }
            Err(err) => {
                let _ = session.abort_transaction().await;
                Err(err.into())
            }
        }
    }
}

impl WorkflowStore for MongoWorkflowStore {
    async fn find_booking(&self, booking_id: ObjectId) -> Result<Option<Booking>, WorkflowError> {
        Ok(self.bookings().find_one(doc! { "_id": booking_id }).await?)
    }

    async fn find_request(
        &self,
        request_id: ObjectId,
    ) -> Result<Option<CancellationRequest>, WorkflowError> {
        Ok(self.requests().find_one(doc! { "_id": request_id }).await?)
    }

    async fn find_pending_by_booking(
        &self,
        booking_id: ObjectId,
    ) -> Result<Option<CancellationRequest>, WorkflowError> {
        let filter = doc! {
            "booking_id": booking_id,
            "status": RequestStatus::Pending.as_str(),
        };
        Ok(self.requests().find_one(filter).await?)
    }

    async fn insert_request(
        &self,
        mut request: CancellationRequest,
    ) -> Result<CancellationRequest, WorkflowError> {
        match self.requests().insert_one(&request).await {
            Ok(result) => {
                request.id = result.inserted_id.as_object_id();
                Ok(request)
            }
            Err(err) => {
                // The partial unique index on {booking_id, status: pending}
                // catches the race two concurrent creates can win past the
                // pre-check.
                let message = err.to_string();
                match *err.kind {
                    ErrorKind::Write(WriteFailure::WriteError(WriteError {
                        code: 11000, ..
                    })) => Err(WorkflowError::Conflict(
                        "A cancellation request is already pending for this booking".to_string(),
                    )),
                    _ => Err(WorkflowError::Database(message)),
                }
            }
        }
    }

    async fn apply_decision(
        &self,
        decision: &Decision,
    ) -> Result<CancellationRequest, WorkflowError> {
        let processed_at = mongodb::bson::to_bson(&decision.processed_at)?;
        let admin_note = match &decision.admin_note {
            Some(note) => Bson::String(note.clone()),
            None => Bson::Null,
        };

        // Guarding on pending in the filter makes a concurrent double-process
        // lose with matched_count 0 instead of overwriting a terminal state.
        let request_filter = doc! {
            "_id": decision.request_id,
            "status": RequestStatus::Pending.as_str(),
        };
        let request_update = doc! {
            "$set": {
                "status": decision.status.as_str(),
                "admin_note": admin_note,
                "processed_by": decision.processed_by,
                "processed_at": processed_at.clone(),
                "updated_at": processed_at.clone(),
            }
        };

        let matched = if decision.cancel_booking {
            let booking_filter = doc! { "_id": decision.booking_id };
            let booking_update = doc! {
                "$set": {
                    "status": BookingStatus::Cancelled.as_str(),
                    "updated_at": processed_at,
                }
            };
            self.approve_in_transaction(
                request_filter,
                request_update,
                booking_filter,
                booking_update,
            )
            .await?
        } else {
            self.requests()
                .update_one(request_filter, request_update)
                .await?
                .matched_count
        };

        if matched == 0 {
            return match self.find_request(decision.request_id).await? {
                Some(request) => Err(WorkflowError::InvalidState(request.status)),
                None => Err(WorkflowError::NotFound("Cancellation request")),
            };
        }

        self.find_request(decision.request_id)
            .await?
            .ok_or(WorkflowError::NotFound("Cancellation request"))
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CancellationRequest>, WorkflowError> {
        let filter = match status {
            Some(status) => doc! { "status": status.as_str() },
            None => doc! {},
        };
        let cursor = self
            .requests()
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
