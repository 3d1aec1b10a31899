pub mod models;
pub mod dto;
pub mod handlers;
pub mod query;
pub mod service;

// Re-export commonly used types
pub use query::JobQueryEngine;
pub use service::JobService;
