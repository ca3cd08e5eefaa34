use actix_web::{web, HttpResponse, Responder};
use mongodb::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::models::pricing::BookingConfig;
use crate::services::discount_service::DiscountService;
use crate::services::pricing_service::PricingService;

#[derive(Debug, Deserialize)]
pub struct QuoteInput {
    pub config: BookingConfig,
    pub discount_code: Option<String>,
}

/// Price a booking configuration. The same computation runs again at booking
/// time; this endpoint exists so clients can show the figure up front.
pub async fn quote(data: web::Data<Arc<Client>>, input: web::Json<QuoteInput>) -> impl Responder {
    let client = data.into_inner();
    let input = input.into_inner();

    let discount = match &input.discount_code {
        Some(code) if !code.trim().is_empty() => {
            match DiscountService::find_applicable(&client, code).await {
                Ok(found) => found,
                Err(err) => {
                    // A broken discount lookup must not sink the quote; the
                    // breakdown simply reports no discount applied.
                    log::warn!("Discount lookup failed, quoting without discount: {}", err);
                    None
                }
            }
        }
        _ => None,
    };

    match PricingService::quote(&input.config, discount.as_ref()) {
        Ok(breakdown) => HttpResponse::Ok().json(breakdown),
        Err(err) => HttpResponse::BadRequest().body(err.to_string()),
    }
}
