use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, IndexModel};
use std::sync::Arc;
use std::time::Duration;

use crate::models::booking::Booking;
use crate::models::cancellation_request::{CancellationRequest, RequestStatus};
use crate::models::discount::Discount;

pub async fn create_mongo_client(uri: &String) -> Arc<Client> {
    println!("Connecting to MongoDB: {}", uri);

    let mut client_options = ClientOptions::parse(uri)
        .await
        .expect("MongoDB URI may be incorrect! Failed to parse.");

    // Set a reasonable timeout for operations
    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    // Set the server API if using MongoDB 5.0+
    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client =
        Client::with_options(client_options).expect("Failed to create MongoDB client with options");

    // Test the connection to make sure it works
    match client
        .database("Bookings")
        .run_command(doc! {"ping": 1})
        .await
    {
        Ok(_) => println!("Successfully connected to MongoDB and verified with ping command"),
        Err(e) => {
            eprintln!("WARNING: Connected to MongoDB but ping test failed: {}", e);
            eprintln!("The API may still work, but some functionality might be impaired");
        }
    }

    Arc::new(client)
}

/// Indexes the API depends on for correctness, created idempotently at boot.
/// The partial unique index is what actually holds the one-pending-request-
/// per-booking rule under concurrent inserts.
pub async fn ensure_indexes(client: &Client) -> mongodb::error::Result<()> {
    let db = client.database("Bookings");

    let pending_unique = IndexModel::builder()
        .keys(doc! { "booking_id": 1 })
        .options(
            IndexOptions::builder()
                .unique(true)
                .name("unique_pending_per_booking".to_string())
                .partial_filter_expression(doc! { "status": RequestStatus::Pending.as_str() })
                .build(),
        )
        .build();
    db.collection::<CancellationRequest>("CancellationRequests")
        .create_index(pending_unique)
        .await?;

    let code_unique = IndexModel::builder()
        .keys(doc! { "code": 1 })
        .options(
            IndexOptions::builder()
                .unique(true)
                .name("unique_discount_code".to_string())
                .build(),
        )
        .build();
    db.collection::<Discount>("Discounts")
        .create_index(code_unique)
        .await?;

    let bookings_by_user = IndexModel::builder()
        .keys(doc! { "user_id": 1 })
        .build();
    db.collection::<Booking>("Bookings")
        .create_index(bookings_by_user)
        .await?;

    Ok(())
}
