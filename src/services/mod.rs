pub mod cancellation;
pub mod discount_service;
pub mod pricing_service;
