//! Release Review library
//!
//! Exposes the API modules so integration tests can build the router.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod test_utils;
pub mod validation;
