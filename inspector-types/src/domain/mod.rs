//! Domain models for the SMS inspector.

pub mod analysis;
pub mod numbers;
pub mod settings;
pub mod sms;
pub mod user;

pub use analysis::{ExtractedInfo, Segment, highlight};
pub use numbers::{merge_numbers, normalize_numbers, parse_number_text};
pub use settings::{AdminSettings, ErrorMapping, ProxySettings, SettingKey, SiteSettings};
pub use sms::{PhoneGroup, SmsRecord, UNKNOWN_NUMBER, group_by_phone};
pub use user::{User, UserId, UserProfile, UserStatus};
