//! # Inspector Types
//!
//! Domain types and port traits for the SMS inspector dashboard.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Pure domain types (SmsRecord, User, settings, analysis)
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for API boundaries
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    AdminSettings, ErrorMapping, ExtractedInfo, PhoneGroup, ProxySettings, Segment, SettingKey,
    SiteSettings, SmsRecord, User, UserId, UserProfile, UserStatus,
};
pub use dto::*;
pub use error::{AppError, DomainError, RepoError};
pub use ports::{
    AnalyzerError, DashboardRepository, GatewayAccess, MdrQuery, MessageAnalyzer, ProviderError,
    SmsGateway,
};
