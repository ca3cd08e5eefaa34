pub mod admin;
pub mod bookings;
pub mod cancellation_requests;
pub mod discounts;
pub mod health;
pub mod pricing;
