//! Request handlers.

pub mod account;
pub mod health;
pub mod listings;
pub mod manage;

pub use health::{health, ready};
