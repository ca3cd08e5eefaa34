use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

/// A promotion code. Owned by the admin screens; the booking flow only ever
/// reads these.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Discount {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    // Stored uppercase, matched case-insensitively.
    pub code: String,
    pub discount_type: DiscountType,
    // Percent of the subtotal for percentage codes, a flat VND amount for
    // fixed codes.
    pub value: f64,
    pub active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Discount {
    /// Whether the code can be applied at `now`.
    pub fn is_applicable(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Deserialize)]
pub struct DiscountInput {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: f64,
    pub active: Option<bool>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub description: Option<String>,
}
