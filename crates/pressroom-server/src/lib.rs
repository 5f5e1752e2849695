//! HTTP front-end and process wiring for the ingestion service.

pub mod config;
pub mod routes;
