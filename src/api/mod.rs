//! HTTP surface: axum handlers and router setup.
pub mod handlers;
pub mod routes;
