use std::env;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use vietgo_api::db;
use vietgo_api::middleware::auth::AuthMiddleware;
use vietgo_api::routes;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    println!("Application starting...");

    env_logger::init_from_env(Env::default().default_filter_or("info"));
    println!("Logger initialized");

    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    } else {
        println!("Release mode");
    }

    let host = env::var("HOST").unwrap_or_else(|_| HOST.to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| PORT.to_string())
        .parse()
        .unwrap_or(PORT);
    println!("Attempting to bind to {}:{}", host, port);

    let mongo_uri = env::var("MONGODB_URI").expect("MONGODB_URI must be set");
    println!("Got MongoDB URI, attempting connection...");
    let client = db::mongo::create_mongo_client(&mongo_uri).await;
    println!("MongoDB connection established");

    if let Err(err) = db::mongo::ensure_indexes(&client).await {
        eprintln!("WARNING: Failed to create indexes: {}", err);
        eprintln!("The unique-pending-request guarantee is weakened until they exist");
    }

    println!("Starting HTTP server...");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(client.clone()))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .route("/", web::get().to(|| async { "VietGo API is running" }))
            .route("/health", web::get().to(routes::health::health_check))
            .service(
                web::scope("/api")
                    // Public routes
                    .route("/pricing/quote", web::post().to(routes::pricing::quote))
                    .route(
                        "/discounts/validate",
                        web::get().to(routes::discounts::validate_discount),
                    )
                    // Protected routes
                    .service(
                        web::scope("/bookings")
                            .wrap(AuthMiddleware)
                            .route("", web::post().to(routes::bookings::add_booking))
                            .route("", web::get().to(routes::bookings::get_all_bookings))
                            .route(
                                "/{id}",
                                web::get().to(routes::bookings::get_booking_by_id),
                            ),
                    )
                    .service(
                        web::scope("/cancellationrequests")
                            .wrap(AuthMiddleware)
                            .route(
                                "",
                                web::post().to(routes::cancellation_requests::create_request),
                            )
                            .route(
                                "/booking/{booking_id}",
                                web::get().to(routes::cancellation_requests::get_by_booking),
                            ),
                    )
                    .configure(routes::admin::config),
            )
    })
    .bind((host, port))?
    .run()
    .await
}
