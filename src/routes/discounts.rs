use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson};
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use mongodb::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::models::discount::{Discount, DiscountInput, DiscountType};
use crate::services::discount_service::DiscountService;

fn discounts_collection(client: &Client) -> mongodb::Collection<Discount> {
    client.database("Bookings").collection("Discounts")
}

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub code: String,
}

/// Booking-flow check for a code. An unknown or expired code is a normal
/// answer, not an error status.
pub async fn validate_discount(
    data: web::Data<Arc<Client>>,
    query: web::Query<ValidateQuery>,
) -> impl Responder {
    let client = data.into_inner();

    match DiscountService::find_applicable(&client, &query.code).await {
        Ok(Some(discount)) => HttpResponse::Ok().json(json!({
            "valid": true,
            "discount": discount,
        })),
        Ok(None) => HttpResponse::Ok().json(json!({ "valid": false })),
        Err(err) => {
            log::error!("Failed to validate discount code: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to validate discount code")
        }
    }
}

pub async fn create_discount(
    data: web::Data<Arc<Client>>,
    input: web::Json<DiscountInput>,
) -> impl Responder {
    let client = data.into_inner();
    let input = input.into_inner();

    if let Err(message) = validate_discount_input(&input) {
        return HttpResponse::BadRequest().body(message);
    }

    let now = Utc::now();
    let discount = Discount {
        id: None,
        code: input.code.trim().to_uppercase(),
        discount_type: input.discount_type,
        value: input.value,
        active: input.active.unwrap_or(true),
        valid_from: input.valid_from,
        valid_until: input.valid_until,
        description: input.description,
        created_at: Some(now),
        updated_at: Some(now),
    };

    match discounts_collection(&client).insert_one(&discount).await {
        Ok(result) => {
            let mut created = discount;
            created.id = result.inserted_id.as_object_id();
            HttpResponse::Ok().json(created)
        }
        Err(err) => match *err.kind {
            ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. })) => {
                HttpResponse::Conflict().body("Discount code already exists")
            }
            _ => {
                log::error!("Failed to create discount: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to create discount")
            }
        },
    }
}

pub async fn list_discounts(data: web::Data<Arc<Client>>) -> impl Responder {
    let client = data.into_inner();

    let cursor = discounts_collection(&client)
        .find(doc! {})
        .sort(doc! { "created_at": -1 })
        .await;

    match cursor {
        Ok(cursor) => match cursor.try_collect::<Vec<Discount>>().await {
            Ok(discounts) => HttpResponse::Ok().json(discounts),
            Err(err) => {
                log::error!("Error retrieving discounts: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve discounts")
            }
        },
        Err(err) => {
            log::error!("Error fetching discounts: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch discounts")
        }
    }
}

pub async fn update_discount(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String,)>,
    input: web::Json<DiscountInput>,
) -> impl Responder {
    let client = data.into_inner();
    let (discount_id,) = path.into_inner();

    let discount_object_id = match ObjectId::parse_str(&discount_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid discount ID format"),
    };

    let input = input.into_inner();
    if let Err(message) = validate_discount_input(&input) {
        return HttpResponse::BadRequest().body(message);
    }

    let update = doc! {
        "$set": {
            "code": input.code.trim().to_uppercase(),
            "discount_type": input.discount_type.as_str(),
            "value": input.value,
            "active": input.active.unwrap_or(true),
            "valid_from": to_bson_or_null(&input.valid_from),
            "valid_until": to_bson_or_null(&input.valid_until),
            "description": to_bson_or_null(&input.description),
            "updated_at": Utc::now().to_rfc3339(),
        }
    };

    match discounts_collection(&client)
        .update_one(doc! { "_id": discount_object_id }, update)
        .await
    {
        Ok(result) => {
            if result.matched_count == 0 {
                return HttpResponse::NotFound().body("Discount not found");
            }
            HttpResponse::Ok().body("Discount updated")
        }
        Err(err) => match *err.kind {
            ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. })) => {
                HttpResponse::Conflict().body("Discount code already exists")
            }
            _ => {
                log::error!("Failed to update discount: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to update discount")
            }
        },
    }
}

/// Delete is a soft deactivate; historical bookings keep referencing the code.
pub async fn deactivate_discount(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let client = data.into_inner();
    let (discount_id,) = path.into_inner();

    let discount_object_id = match ObjectId::parse_str(&discount_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid discount ID format"),
    };

    let update = doc! {
        "$set": {
            "active": false,
            "updated_at": Utc::now().to_rfc3339(),
        }
    };

    match discounts_collection(&client)
        .update_one(doc! { "_id": discount_object_id }, update)
        .await
    {
        Ok(result) => {
            if result.matched_count == 0 {
                return HttpResponse::NotFound().body("Discount not found");
            }
            HttpResponse::Ok().body("Discount deactivated")
        }
        Err(err) => {
            log::error!("Failed to deactivate discount: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to deactivate discount")
        }
    }
}

fn to_bson_or_null<T: serde::Serialize>(value: &Option<T>) -> Bson {
    value
        .as_ref()
        .and_then(|inner| mongodb::bson::to_bson(inner).ok())
        .unwrap_or(Bson::Null)
}

fn validate_discount_input(input: &DiscountInput) -> Result<(), String> {
    if input.code.trim().is_empty() {
        return Err("Discount code must not be empty".to_string());
    }
    match input.discount_type {
        DiscountType::Percentage => {
            if input.value <= 0.0 || input.value > 100.0 {
                return Err("Percentage value must be between 0 and 100".to_string());
            }
        }
        DiscountType::Fixed => {
            if input.value <= 0.0 {
                return Err("Fixed discount value must be positive".to_string());
            }
        }
    }
    if let (Some(from), Some(until)) = (input.valid_from, input.valid_until) {
        if until < from {
            return Err("valid_until must not be before valid_from".to_string());
        }
    }
    Ok(())
}
