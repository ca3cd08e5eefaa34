use actix_web::web;

use crate::middleware::auth::AuthMiddleware;
use crate::middleware::role_auth::{RequireRole, UserRole};
use crate::routes::{bookings, cancellation_requests, discounts};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            // Wraps run in reverse registration order: AuthMiddleware must
            // decode the claims before RequireRole reads them.
            .wrap(RequireRole::new(UserRole::Admin))
            .wrap(AuthMiddleware)
            .service(
                web::scope("/cancellationrequests")
                    .route("", web::get().to(cancellation_requests::list_requests))
                    .route(
                        "/{id}/approve",
                        web::put().to(cancellation_requests::approve_request),
                    )
                    .route(
                        "/{id}/reject",
                        web::put().to(cancellation_requests::reject_request),
                    ),
            )
            .service(
                web::scope("/discounts")
                    .route("", web::post().to(discounts::create_discount))
                    .route("", web::get().to(discounts::list_discounts))
                    .route("/{id}", web::put().to(discounts::update_discount))
                    .route("/{id}", web::delete().to(discounts::deactivate_discount)),
            )
            .route(
                "/bookings/{id}/status",
                web::put().to(bookings::update_booking_status),
            ),
    );
}
