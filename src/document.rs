//! Normalized document and date-partitioned index naming.
//!
//! A document is written to `<prefix>-<YYYY>.<MM>.<DD>`, using the date of
//! the processing instant. The `@timestamp` field is the processing time as
//! well (dashboards filter on it), not the SNS publish time.

use chrono::{DateTime, Datelike, Local, NaiveDate, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::config::PartitionTimezone;
use crate::envelope::NotificationEnvelope;

/// Body of the upsert request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(rename = "@timestamp", serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub data: DocumentData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentData {
    #[serde(rename = "MessageId")]
    pub message_id: String,
    #[serde(rename = "Message")]
    pub message: Value,
}

impl Document {
    pub fn id(&self) -> &str {
        &self.data.message_id
    }
}

fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_timestamp(ts))
}

/// `2026-03-01T09:15:02.123Z`
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Name of the date-suffixed index a document goes to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionName(String);

impl PartitionName {
    pub fn new(prefix: &str, date: NaiveDate) -> Self {
        PartitionName(format!(
            "{}-{}.{:02}.{:02}",
            prefix,
            date.year(),
            date.month(),
            date.day()
        ))
    }

    /// Partition for `now`, with the date taken in `tz`.
    pub fn for_instant(prefix: &str, now: &DateTime<Utc>, tz: PartitionTimezone) -> Self {
        let date = match tz {
            PartitionTimezone::Utc => now.date_naive(),
            PartitionTimezone::Local => now.with_timezone(&Local).date_naive(),
        };
        Self::new(prefix, date)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Assemble the document and pick its partition. Pure.
pub fn build_document(
    envelope: &NotificationEnvelope,
    now: DateTime<Utc>,
    prefix: &str,
    tz: PartitionTimezone,
) -> (Document, PartitionName) {
    let document = Document {
        timestamp: now,
        data: DocumentData {
            message_id: envelope.message_id.clone(),
            message: envelope.message.clone(),
        },
    };
    (document, PartitionName::for_instant(prefix, &now, tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn envelope(id: &str, message: Value) -> NotificationEnvelope {
        NotificationEnvelope {
            message_id: id.to_string(),
            raw_message: message.to_string(),
            message,
            topic_arn: None,
        }
    }

    #[test]
    fn partition_name_zero_pads() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(PartitionName::new("sns", date).as_str(), "sns-2026.03.07");
    }

    #[test]
    fn partition_name_stable_within_a_day() {
        let morning = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 1).unwrap();
        let night = Utc.with_ymd_and_hms(2026, 10, 18, 23, 59, 59).unwrap();
        let a = PartitionName::for_instant("logs", &morning, PartitionTimezone::Utc);
        let b = PartitionName::for_instant("logs", &night, PartitionTimezone::Utc);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "logs-2026.10.18");
    }

    #[test]
    fn partition_name_changes_at_utc_midnight() {
        let before = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            PartitionName::for_instant("logs", &before, PartitionTimezone::Utc).as_str(),
            "logs-2026.12.31"
        );
        assert_eq!(
            PartitionName::for_instant("logs", &after, PartitionTimezone::Utc).as_str(),
            "logs-2027.01.01"
        );
    }

    #[test]
    fn local_partition_uses_local_calendar() {
        let now = Utc.with_ymd_and_hms(2026, 6, 15, 12, 0, 0).unwrap();
        let expected = PartitionName::new("logs", now.with_timezone(&Local).date_naive());
        assert_eq!(
            PartitionName::for_instant("logs", &now, PartitionTimezone::Local),
            expected
        );
    }

    #[test]
    fn timestamp_has_millis_and_z() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 9, 15, 2).unwrap()
            + chrono::Duration::milliseconds(123);
        assert_eq!(format_timestamp(&ts), "2026-03-01T09:15:02.123Z");
    }

    #[test]
    fn document_serializes_to_wire_shape() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 15, 2).unwrap();
        let (doc, partition) = build_document(
            &envelope("abc-1", json!({ "x": 1 })),
            now,
            "sns",
            PartitionTimezone::Utc,
        );

        assert_eq!(doc.id(), "abc-1");
        assert_eq!(partition.as_str(), "sns-2026.03.01");
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "@timestamp": "2026-03-01T09:15:02.000Z",
                "data": { "MessageId": "abc-1", "Message": { "x": 1 } }
            })
        );
    }
}
