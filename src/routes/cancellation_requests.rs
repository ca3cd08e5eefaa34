use actix_web::{web, HttpResponse, Responder};
use mongodb::bson::oid::ObjectId;
use mongodb::Client;
use serde::Deserialize;
use std::sync::Arc;

use crate::middleware::auth::Claims;
use crate::models::cancellation_request::{CancellationRequestInput, ProcessInput, RequestStatus};
use crate::services::cancellation::interface::WorkflowError;
use crate::services::cancellation::mongo::MongoWorkflowStore;
use crate::services::cancellation::notifier::LogNotifier;
use crate::services::cancellation::service::CancellationService;

fn workflow(data: &web::Data<Arc<Client>>) -> CancellationService<MongoWorkflowStore, LogNotifier> {
    CancellationService::new(MongoWorkflowStore::new(data.get_ref().clone()), LogNotifier)
}

fn error_response(err: WorkflowError) -> HttpResponse {
    match &err {
        WorkflowError::Validation(_) => HttpResponse::BadRequest().body(err.to_string()),
        WorkflowError::NotFound(_) => HttpResponse::NotFound().body(err.to_string()),
        WorkflowError::Conflict(_) => HttpResponse::Conflict().body(err.to_string()),
        WorkflowError::InvalidState(_) => HttpResponse::Conflict().body(err.to_string()),
        WorkflowError::Database(message) => {
            log::error!("Cancellation workflow database error: {}", message);
            HttpResponse::InternalServerError().body("Processing failed, please try again")
        }
    }
}

pub async fn create_request(
    data: web::Data<Arc<Client>>,
    input: web::Json<CancellationRequestInput>,
    claims: Claims,
) -> impl Responder {
    let input = input.into_inner();

    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };
    let booking_id = match ObjectId::parse_str(&input.booking_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid booking ID format"),
    };

    match workflow(&data).create(booking_id, user_id, &input.reason).await {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(err) => error_response(err),
    }
}

pub async fn get_by_booking(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String,)>,
    claims: Claims,
) -> impl Responder {
    let (booking_id,) = path.into_inner();

    let booking_object_id = match ObjectId::parse_str(&booking_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid booking ID format"),
    };
    let user_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    match workflow(&data).get_by_booking(booking_object_id).await {
        Ok(Some(request)) => {
            if request.user_id != user_id {
                return HttpResponse::Forbidden().body("Forbidden");
            }
            HttpResponse::Ok().json(request)
        }
        Ok(None) => HttpResponse::NotFound().body("No pending cancellation request for this booking"),
        Err(err) => error_response(err),
    }
}

pub async fn approve_request(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String,)>,
    input: web::Json<ProcessInput>,
    claims: Claims,
) -> impl Responder {
    let (request_id,) = path.into_inner();

    let request_object_id = match ObjectId::parse_str(&request_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid request ID format"),
    };
    let admin_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    match workflow(&data)
        .approve(request_object_id, admin_id, input.into_inner().admin_note)
        .await
    {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(err) => error_response(err),
    }
}

pub async fn reject_request(
    data: web::Data<Arc<Client>>,
    path: web::Path<(String,)>,
    input: web::Json<ProcessInput>,
    claims: Claims,
) -> impl Responder {
    let (request_id,) = path.into_inner();

    let request_object_id = match ObjectId::parse_str(&request_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid request ID format"),
    };
    let admin_id = match ObjectId::parse_str(&claims.user_id) {
        Ok(id) => id,
        Err(_) => return HttpResponse::BadRequest().body("Invalid user ID"),
    };

    match workflow(&data)
        .reject(request_object_id, admin_id, input.into_inner().admin_note)
        .await
    {
        Ok(request) => HttpResponse::Ok().json(request),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<RequestStatus>,
}

/// Admin review queue, newest first.
pub async fn list_requests(
    data: web::Data<Arc<Client>>,
    query: web::Query<ListQuery>,
) -> impl Responder {
    match workflow(&data).list(query.status).await {
        Ok(requests) => HttpResponse::Ok().json(requests),
        Err(err) => error_response(err),
    }
}
