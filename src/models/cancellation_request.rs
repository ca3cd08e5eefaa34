use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::booking::BookingType;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    /// Approved and rejected are terminal states; nothing moves out of them.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CancellationRequest {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub booking_id: ObjectId,
    pub user_id: ObjectId,
    pub booking_type: BookingType,
    pub reason: String,
    pub status: RequestStatus,
    pub admin_note: Option<String>,
    // Only set when the request leaves the pending state.
    pub processed_by: Option<ObjectId>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CancellationRequestInput {
    pub booking_id: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessInput {
    pub admin_note: Option<String>,
}
