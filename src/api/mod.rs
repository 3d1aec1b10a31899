pub mod error;
pub mod health;
pub mod job;
pub mod user;
pub mod validation;
pub mod wallet;
