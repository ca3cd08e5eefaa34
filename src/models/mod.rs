pub mod booking;
pub mod cancellation_request;
pub mod discount;
pub mod pricing;
