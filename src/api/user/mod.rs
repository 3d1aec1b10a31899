pub mod handlers;
pub mod models;
pub mod service;
pub mod tracker;

pub use service::UserService;
pub use tracker::RegistrationTracker;
