//! Response normalization.
//!
//! The MDR endpoint has answered in several shapes over time:
//! - semicolon-delimited CSV whose header row drives the column mapping,
//! - a JSON-RPC envelope with an `error` object,
//! - a JSON-RPC envelope whose `result` holds the rows (directly, or under a
//!   list key, or as embedded CSV text).
//!
//! Everything ends up as [`SmsRecord`]s. Columns that are not present fall back
//! to empty strings; only `datetime` and `message` are required.

use serde_json::{Map, Value};

use inspector_types::{ProviderError, SmsRecord};

/// Keys probed (in order) when `result` is an object instead of a list.
const LIST_KEYS: [&str; 5] = ["items", "rows", "data", "list", "mdr_full_list"];

/// Record fields that can be mapped from a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    DateTime,
    SenderId,
    Phone,
    MccMnc,
    Destination,
    Range,
    Rate,
    Currency,
    Message,
}

impl Field {
    const ALL: [Field; 9] = [
        Field::DateTime,
        Field::SenderId,
        Field::Phone,
        Field::MccMnc,
        Field::Destination,
        Field::Range,
        Field::Rate,
        Field::Currency,
        Field::Message,
    ];

    /// Accepted column names, already in canonical form (see [`canonical`]).
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::DateTime => &["datetime", "date"],
            Field::SenderId => &["senderid", "sender"],
            Field::Phone => &["bnumber", "phone", "number", "phonenumber"],
            Field::MccMnc => &["mccmnc"],
            Field::Destination => &["destination"],
            Field::Range => &["range", "rangename"],
            Field::Rate => &["rate"],
            Field::Currency => &["currency"],
            Field::Message => &["message", "text", "body"],
        }
    }

    fn assign(&self, record: &mut SmsRecord, value: String) {
        let slot = match self {
            Field::DateTime => &mut record.date_time,
            Field::SenderId => &mut record.sender_id,
            Field::Phone => &mut record.phone,
            Field::MccMnc => &mut record.mcc_mnc,
            Field::Destination => &mut record.destination,
            Field::Range => &mut record.range,
            Field::Rate => &mut record.rate,
            Field::Currency => &mut record.currency,
            Field::Message => &mut record.message,
        };
        *slot = value;
    }
}

/// Lowercases and strips separators so `B-Number`, `b_number` and `bnumber` match.
fn canonical(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | '/' | ' '))
        .collect()
}

fn field_for(column: &str) -> Option<Field> {
    let column = canonical(column);
    Field::ALL
        .into_iter()
        .find(|f| f.aliases().contains(&column.as_str()))
}

/// Normalizes a raw response body into records.
pub fn parse_response(body: &str) -> Result<Vec<SmsRecord>, ProviderError> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        // A body that only looks like JSON is handed to the CSV parser.
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return parse_json(value);
        }
    }

    parse_csv(trimmed)
}

// ─────────────────────────────────────────────────────────────────────────────
// CSV
// ─────────────────────────────────────────────────────────────────────────────

/// Parses semicolon-delimited text whose first row is the header.
///
/// Every line is one row: an unbalanced quote never pulls the following lines
/// into its field.
pub fn parse_csv(text: &str) -> Result<Vec<SmsRecord>, ProviderError> {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());

    let header = match lines.next() {
        Some(line) => read_row(line).map_err(|e| ProviderError::Malformed(e.to_string()))?,
        None => return Ok(Vec::new()),
    };

    let body: Vec<csv::StringRecord> = lines
        .filter_map(|line| match read_row(line) {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::warn!("Skipping unreadable CSV row: {}", e);
                None
            }
        })
        .collect();

    if body.is_empty() {
        return Ok(Vec::new());
    }

    // First matching column wins when a header repeats an alias.
    let mut columns: Vec<(Field, usize)> = Vec::new();
    for (index, name) in header.iter().enumerate() {
        if let Some(field) = field_for(name) {
            if !columns.iter().any(|(f, _)| *f == field) {
                columns.push((field, index));
            }
        }
    }

    let has = |field: Field| columns.iter().any(|(f, _)| *f == field);
    if !has(Field::DateTime) || !has(Field::Message) {
        return Err(ProviderError::MissingColumns);
    }

    let width = header.len();
    let records = body
        .iter()
        .filter(|row| row.len() >= width)
        .map(|row| {
            let mut record = SmsRecord::default();
            for (field, index) in &columns {
                let raw = row.get(*index).unwrap_or_default();
                field.assign(&mut record, clean_value(*field, raw));
            }
            record
        })
        .collect();

    Ok(records)
}

/// Splits a single line on `;`, honouring quotes that close on the same line.
fn read_row(line: &str) -> Result<csv::StringRecord, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut row = csv::StringRecord::new();
    reader.read_record(&mut row)?;
    Ok(row)
}

/// Trims metadata columns and strips a leftover pair of quotes from the message.
fn clean_value(field: Field, raw: &str) -> String {
    if field != Field::Message {
        return raw.trim().to_string();
    }
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
        .to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON
// ─────────────────────────────────────────────────────────────────────────────

fn parse_json(value: Value) -> Result<Vec<SmsRecord>, ProviderError> {
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(mut envelope) => {
            if let Some(message) = envelope.get("error").and_then(error_message) {
                return Err(ProviderError::Api(message));
            }
            match envelope.remove("result") {
                Some(Value::Array(rows)) => rows,
                Some(Value::Object(mut result)) => {
                    match LIST_KEYS.iter().find_map(|k| match result.remove(*k) {
                        Some(Value::Array(rows)) => Some(rows),
                        _ => None,
                    }) {
                        Some(rows) => rows,
                        None => return Ok(Vec::new()),
                    }
                }
                Some(Value::String(text)) => return parse_csv(text.trim()),
                Some(Value::Null) | None => {
                    return Err(ProviderError::Malformed(
                        "JSON response has neither `result` nor `error`".into(),
                    ));
                }
                Some(other) => {
                    return Err(ProviderError::Malformed(format!(
                        "unexpected `result` type: {}",
                        other
                    )));
                }
            }
        }
        other => {
            return Err(ProviderError::Malformed(format!(
                "unexpected JSON body: {}",
                other
            )));
        }
    };

    Ok(rows
        .into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(record_from_object(&map)),
            _ => None,
        })
        .collect())
}

/// `{"error": {"message": ".."}}`, `{"error": ".."}`; falsy values mean no error.
fn error_message(error: &Value) -> Option<String> {
    match error {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => Some(
            map.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

fn record_from_object(map: &Map<String, Value>) -> SmsRecord {
    let mut record = SmsRecord::default();
    let mut seen: Vec<Field> = Vec::new();
    for (key, value) in map {
        let Some(field) = field_for(key) else {
            continue;
        };
        if seen.contains(&field) {
            continue;
        }
        seen.push(field);
        field.assign(&mut record, clean_value(field, &scalar_text(value)));
    }
    record
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
