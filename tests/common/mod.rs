use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App};
use bson::oid::ObjectId;
use chrono::Utc;
use mongodb::options::ClientOptions;

use vietgo_api::middleware::auth::{generate_token, AuthMiddleware};
use vietgo_api::models::booking::{Booking, BookingStatus, BookingType};
use vietgo_api::models::cancellation_request::{CancellationRequest, RequestStatus};
use vietgo_api::models::pricing::{LegBreakdown, PriceBreakdown};
use vietgo_api::routes;
use vietgo_api::services::cancellation::interface::{
    Decision, NotificationSink, WorkflowError, WorkflowEvent, WorkflowStore,
};

pub const TEST_JWT_SECRET: &str = "vietgo-test-secret";

pub struct TestApp {
    pub client: Arc<mongodb::Client>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mongo_uri = std::env::var("MONGODB_URI")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

        // No startup ping, and selection gives up quickly. The routes under
        // test only reach for Mongo when a test sends them there.
        let mut options = ClientOptions::parse(&mongo_uri)
            .await
            .expect("Failed to parse MongoDB URI");
        options.server_selection_timeout = Some(Duration::from_millis(500));
        options.connect_timeout = Some(Duration::from_millis(500));

        let client = Arc::new(
            mongodb::Client::with_options(options).expect("Failed to create MongoDB client"),
        );

        Self { client }
    }

    /// The same app main.rs serves, minus the listener.
    pub fn create_app(&self) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(self.client.clone()))
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
                    .route("/pricing/quote", web::post().to(routes::pricing::quote))
                    .route(
                        "/discounts/validate",
                        web::get().to(routes::discounts::validate_discount),
                    )
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
    }
}

pub fn user_token(user_id: ObjectId) -> String {
    std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);
    let token = generate_token("traveler@example.com", user_id, None)
        .expect("Failed to generate test token");
    format!("Bearer {}", token)
}

pub fn admin_token(admin_id: ObjectId) -> String {
    std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);
    let token = generate_token("admin@example.com", admin_id, Some("admin"))
        .expect("Failed to generate test token");
    format!("Bearer {}", token)
}

pub fn flight_breakdown(total: i64) -> PriceBreakdown {
    PriceBreakdown {
        legs: vec![LegBreakdown {
            passenger_total: total,
            baggage_total: 0,
            insurance_total: 0,
            priority_seat_total: 0,
            seat_total: 0,
        }],
        subtotal: total,
        discount_code: None,
        discount_amount: 0,
        total,
    }
}

pub fn confirmed_booking(user_id: ObjectId) -> Booking {
    let now = Utc::now();
    Booking {
        id: Some(ObjectId::new()),
        user_id,
        booking_type: BookingType::Flight,
        status: BookingStatus::Confirmed,
        total_price: 2_000_000,
        breakdown: flight_breakdown(2_000_000),
        contact_name: Some("Test Traveler".to_string()),
        contact_email: Some("traveler@example.com".to_string()),
        contact_phone: None,
        created_at: Some(now),
        updated_at: Some(now),
    }
}

/// In-memory store with the same contract as the Mongo-backed one: at most
/// one pending request per booking, decisions only land on pending requests,
/// and an approval moves request and booking together or not at all.
#[derive(Clone, Default)]
pub struct MemoryWorkflowStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    bookings: Mutex<HashMap<ObjectId, Booking>>,
    requests: Mutex<HashMap<ObjectId, CancellationRequest>>,
    fail_booking_writes: AtomicBool,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_booking(&self, booking: Booking) -> ObjectId {
        let id = booking.id.expect("seeded bookings need an id");
        self.inner.bookings.lock().unwrap().insert(id, booking);
        id
    }

    pub fn booking_status(&self, booking_id: ObjectId) -> Option<BookingStatus> {
        self.inner
            .bookings
            .lock()
            .unwrap()
            .get(&booking_id)
            .map(|booking| booking.status)
    }

    pub fn stored_request(&self, request_id: ObjectId) -> Option<CancellationRequest> {
        self.inner.requests.lock().unwrap().get(&request_id).cloned()
    }

    /// Make every booking update fail, the way a dropped transaction would.
    pub fn fail_booking_writes(&self) {
        self.inner.fail_booking_writes.store(true, Ordering::SeqCst);
    }
}

impl WorkflowStore for MemoryWorkflowStore {
    async fn find_booking(&self, booking_id: ObjectId) -> Result<Option<Booking>, WorkflowError> {
        Ok(self.inner.bookings.lock().unwrap().get(&booking_id).cloned())
    }

    async fn find_request(
        &self,
        request_id: ObjectId,
    ) -> Result<Option<CancellationRequest>, WorkflowError> {
        Ok(self.inner.requests.lock().unwrap().get(&request_id).cloned())
    }

    async fn find_pending_by_booking(
        &self,
        booking_id: ObjectId,
    ) -> Result<Option<CancellationRequest>, WorkflowError> {
        Ok(self
            .inner
            .requests
            .lock()
            .unwrap()
            .values()
            .find(|request| {
                request.booking_id == booking_id && request.status == RequestStatus::Pending
            })
            .cloned())
    }

    async fn insert_request(
        &self,
        mut request: CancellationRequest,
    ) -> Result<CancellationRequest, WorkflowError> {
        let mut requests = self.inner.requests.lock().unwrap();
        // Same rule the partial unique index enforces in Mongo.
        if requests.values().any(|existing| {
            existing.booking_id == request.booking_id
                && existing.status == RequestStatus::Pending
        }) {
            return Err(WorkflowError::Conflict(
                "A cancellation request is already pending for this booking".to_string(),
            ));
        }
        let id = ObjectId::new();
        request.id = Some(id);
        requests.insert(id, request.clone());
        Ok(request)
    }

    async fn apply_decision(
        &self,
        decision: &Decision,
    ) -> Result<CancellationRequest, WorkflowError> {
        let mut requests = self.inner.requests.lock().unwrap();
        let current = requests
            .get(&decision.request_id)
            .ok_or(WorkflowError::NotFound("Cancellation request"))?;
        if current.status.is_terminal() {
            return Err(WorkflowError::InvalidState(current.status));
        }

        // The booking side goes first; if it fails the request stays pending.
        if decision.cancel_booking {
            if self.inner.fail_booking_writes.load(Ordering::SeqCst) {
                return Err(WorkflowError::Database(
                    "injected booking write failure".to_string(),
                ));
            }
            let mut bookings = self.inner.bookings.lock().unwrap();
            let booking = bookings
                .get_mut(&decision.booking_id)
                .ok_or(WorkflowError::NotFound("Booking"))?;
            booking.status = BookingStatus::Cancelled;
            booking.updated_at = Some(decision.processed_at);
        }

        let request = requests
            .get_mut(&decision.request_id)
            .expect("request checked above");
        request.status = decision.status;
        request.admin_note = decision.admin_note.clone();
        request.processed_by = Some(decision.processed_by);
        request.processed_at = Some(decision.processed_at);
        request.updated_at = Some(decision.processed_at);
        Ok(request.clone())
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<CancellationRequest>, WorkflowError> {
        let mut requests: Vec<CancellationRequest> = self
            .inner
            .requests
            .lock()
            .unwrap()
            .values()
            .filter(|request| status.map_or(true, |wanted| request.status == wanted))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<WorkflowEvent>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.name)
            .collect()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, event: &WorkflowEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
