use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Client;
use std::sync::Arc;

use crate::middleware::auth::Claims;
use crate::models::booking::{Booking, BookingInput, BookingStatus, BookingStatusInput};
use crate::services::discount_service::DiscountService;
use crate::services::pricing_service::PricingService;

fn bookings_collection(client: &Client) -> mongodb::Collection<Booking> {
    client.database("Bookings").collection("Bookings")
}

pub async fn add_booking(
    data: web::Data<Arc<Client>>,
    input: web::Json<BookingInput>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();
    let input = input.into_inner();

    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    // The total is always recomputed here. A client-submitted figure is never
    // persisted.
    let discount = match &input.discount_code {
        Some(code) if !code.trim().is_empty() => {
            match DiscountService::find_applicable(&client, code).await {
                Ok(found) => found,
                Err(err) => {
                    log::warn!("Discount lookup failed, booking without discount: {}", err);
                    None
                }
            }
        }
        _ => None,
    };

    let breakdown = match PricingService::quote(&input.config, discount.as_ref()) {
        Ok(breakdown) => breakdown,
        Err(err) => return HttpResponse::BadRequest().body(err.to_string()),
    };

    let now = Utc::now();
    let booking = Booking {
        id: None,
        user_id,
        booking_type: input.booking_type,
        status: BookingStatus::Pending,
        total_price: breakdown.total,
        breakdown,
        contact_name: input.contact_name,
        contact_email: input.contact_email,
        contact_phone: input.contact_phone,
        created_at: Some(now),
        updated_at: Some(now),
    };

    match bookings_collection(&client).insert_one(&booking).await {
        Ok(result) => {
            let mut created = booking;
            created.id = result.inserted_id.as_object_id();
            HttpResponse::Ok().json(created)
        }
        Err(err) => {
            log::error!("Failed to create booking: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to create booking")
        }
    }
}

pub async fn get_all_bookings(data: web::Data<Arc<Client>>, claims: Claims) -> impl Responder {
    let client = data.into_inner();

    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    let cursor = bookings_collection(&client)
        .find(doc! { "user_id": user_id })
        .sort(doc! { "created_at": -1 })
        .await;

    match cursor {
        Ok(cursor) => match cursor.try_collect::<Vec<Booking>>().await {
            Ok(bookings) => HttpResponse::Ok().json(bookings),
            Err(err) => {
                log::error!("Error retrieving bookings: {:?}", err);
                HttpResponse::InternalServerError().body("Failed to retrieve bookings")
            }
        },
        Err(err) => {
            log::error!("Error fetching bookings: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch bookings")
        }
    }
}

pub async fn get_booking_by_id(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String,)>,
    claims: Claims,
) -> impl Responder {
    let client = data.into_inner();
    let (booking_id,) = path.into_inner();

    let booking_object_id = match ObjectId::parse_str(&booking_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid booking ID format"),
    };
    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    // Scoping the filter to the caller makes someone else's booking
    // indistinguishable from a missing one.
    let filter = doc! { "_id": booking_object_id, "user_id": user_id };

    match bookings_collection(&client).find_one(filter).await {
        Ok(Some(booking)) => HttpResponse::Ok().json(booking),
        Ok(None) => HttpResponse::NotFound().body("Booking not found"),
        Err(err) => {
            log::error!("Error fetching booking: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to fetch booking")
        }
    }
}

/// Admin override for a booking's status. Customer-initiated cancellation
/// goes through the request workflow instead of this endpoint.
pub async fn update_booking_status(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String,)>,
    input: web::Json<BookingStatusInput>,
) -> impl Responder {
    let client = data.into_inner();
    let (booking_id,) = path.into_inner();

    let booking_object_id = match ObjectId::parse_str(&booking_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid booking ID format"),
    };

    let update = doc! {
        "$set": {
            "status": input.status.as_str(),
            "updated_at": Utc::now().to_rfc3339(),
        }
    };

    match bookings_collection(&client)
        .update_one(doc! { "_id": booking_object_id }, update)
        .await
    {
        Ok(result) => {
            if result.matched_count == 0 {
                return HttpResponse::NotFound().body("Booking not found");
            }
            HttpResponse::Ok().body("Booking status updated")
        }
        Err(err) => {
            log::error!("Failed to update booking status: {:?}", err);
            HttpResponse::InternalServerError().body("Failed to update booking status")
        }
    }
}
