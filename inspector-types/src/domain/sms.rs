//! SMS delivery records (MDR rows) and the per-number grouped view.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Group key used for records that carry no destination number.
pub const UNKNOWN_NUMBER: &str = "Unknown Number";

/// Timestamp layout used by the billing API for the `datetime` column.
pub const MDR_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One SMS delivery row as reported by the billing API.
///
/// Every field is kept as text. Columns missing upstream become empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SmsRecord {
    #[schema(example = "2024-05-01 10:15:00")]
    pub date_time: String,
    #[schema(example = "Telegram")]
    pub sender_id: String,
    /// Destination number (the API's "B-number")
    #[schema(example = "447700900123")]
    pub phone: String,
    #[schema(example = "234/15")]
    pub mcc_mnc: String,
    pub destination: String,
    pub range: String,
    pub rate: String,
    pub currency: String,
    pub message: String,
}

impl SmsRecord {
    /// Parses `date_time` with the billing API layout.
    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(self.date_time.trim(), MDR_DATETIME_FORMAT).ok()
    }
}

/// All messages delivered to one phone number, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneGroup {
    pub phone: String,
    /// Sender of the earliest message in the group
    pub sender_id: String,
    pub messages: Vec<SmsRecord>,
}

/// Groups records by phone number.
///
/// Groups keep the order in which their number first appears. Messages inside a
/// group are sorted chronologically; rows with an unparseable timestamp keep
/// their relative order and go last.
pub fn group_by_phone(records: &[SmsRecord]) -> Vec<PhoneGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<PhoneGroup> = Vec::new();

    for record in records {
        let key = match record.phone.trim() {
            "" => UNKNOWN_NUMBER,
            phone => phone,
        };

        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(PhoneGroup {
                phone: key.to_string(),
                sender_id: String::new(),
                messages: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].messages.push(record.clone());
    }

    for group in &mut groups {
        // sort_by_key is stable, so unparseable rows keep their order
        group
            .messages
            .sort_by_key(|m| (m.timestamp().is_none(), m.timestamp()));
        if let Some(first) = group.messages.first() {
            group.sender_id = first.sender_id.clone();
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(phone: &str, at: &str, sender: &str, message: &str) -> SmsRecord {
        SmsRecord {
            date_time: at.to_string(),
            sender_id: sender.to_string(),
            phone: phone.to_string(),
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_groups_keep_first_appearance_order() {
        let records = vec![
            record("222", "2024-05-01 10:00:00", "WhatsApp", "a"),
            record("111", "2024-05-01 09:00:00", "Telegram", "b"),
            record("222", "2024-05-01 08:00:00", "Telegram", "c"),
        ];

        let groups = group_by_phone(&records);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].phone, "222");
        assert_eq!(groups[1].phone, "111");
    }

    #[test]
    fn test_messages_sorted_chronologically() {
        let records = vec![
            record("222", "2024-05-01 10:00:00", "WhatsApp", "late"),
            record("222", "2024-05-01 08:00:00", "Telegram", "early"),
        ];

        let groups = group_by_phone(&records);

        assert_eq!(groups[0].messages[0].message, "early");
        assert_eq!(groups[0].messages[1].message, "late");
        assert_eq!(groups[0].sender_id, "Telegram");
    }

    #[test]
    fn test_blank_phone_goes_to_unknown_group() {
        let records = vec![
            record("", "2024-05-01 10:00:00", "X", "a"),
            record("  ", "2024-05-01 11:00:00", "X", "b"),
        ];

        let groups = group_by_phone(&records);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].phone, UNKNOWN_NUMBER);
        assert_eq!(groups[0].messages.len(), 2);
    }

    #[test]
    fn test_unparseable_timestamps_sort_last() {
        let records = vec![
            record("1", "garbage", "X", "bad"),
            record("1", "2024-05-01 10:00:00", "X", "good"),
        ];

        let groups = group_by_phone(&records);

        assert_eq!(groups[0].messages[0].message, "good");
        assert_eq!(groups[0].messages[1].message, "bad");
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_phone(&[]).is_empty());
    }
}
