//! # Inspector Hex
//!
//! Application service layer, message analyzers and HTTP adapter for the
//! SMS inspector dashboard.
//!
//! ## Architecture
//!
//! - `service` - Application service (orchestrates domain operations)
//! - `inbound/` - HTTP adapter (Axum server, sessions, rate limiting)
//! - `outbound/` - Message analyzers (Gemini and the regex fallback)
//!
//! The service is generic over `R: DashboardRepository`, allowing
//! different repository implementations to be injected.

pub mod inbound;
pub mod openapi;
pub mod outbound;
pub mod service;

#[cfg(test)]
mod service_tests;

pub use service::{AdminCredentials, InspectorService};
