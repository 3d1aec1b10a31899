//! Client-side view of the on-chain freelance program.

pub mod accounts;
pub mod instruction;
pub mod pubkey;
pub mod rpc;
pub mod store;
pub mod transaction;
