//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

mod analyzer;
mod gateway;
mod repository;

pub use analyzer::{AnalyzerError, MessageAnalyzer};
pub use gateway::{GatewayAccess, MdrQuery, ProviderError, SmsGateway};
pub use repository::DashboardRepository;
