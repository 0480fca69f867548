//! Route handlers for the admin gateway.

pub mod admin;
pub mod health;
