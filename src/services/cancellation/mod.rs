pub mod interface;
pub mod mongo;
pub mod notifier;
pub mod service;
