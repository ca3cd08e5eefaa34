use chrono::Utc;
use mongodb::bson::doc;
use mongodb::Client;

use crate::models::discount::Discount;

pub struct DiscountService;

impl DiscountService {
    /// Look up a discount code and return it only if it is active and inside
    /// its validity window right now. Codes are stored uppercase.
    pub async fn find_applicable(
        client: &Client,
        code: &str,
    ) -> Result<Option<Discount>, mongodb::error::Error> {
        let collection = client.database("Bookings").collection::<Discount>("Discounts");

        let normalized = code.trim().to_uppercase();
        if normalized.is_empty() {
            return Ok(None);
        }

        let found = collection.find_one(doc! { "code": &normalized }).await?;
        // The validity window is checked here rather than in the query so the
        // comparison uses real datetimes, not their string encodings.
        Ok(found.filter(|discount| discount.is_applicable(Utc::now())))
    }
}
