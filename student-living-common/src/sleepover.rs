//! Sleepover requests submitted by students for overnight guests.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Review state of a sleepover request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    /// Any status string this build does not know about.
    #[serde(other)]
    Unknown,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Store-native timestamp: seconds and nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl StoreTimestamp {
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.seconds, self.nanoseconds)
    }
}

impl From<DateTime<Utc>> for StoreTimestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self {
            seconds: instant.timestamp(),
            nanoseconds: instant.timestamp_subsec_nanos(),
        }
    }
}

/// A date field as returned by the record store.
///
/// Depending on the query path the store hands back either its native
/// timestamp wrapper or a plain date value, so both shapes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreDate {
    Timestamp(StoreTimestamp),
    Instant(DateTime<Utc>),
    /// Calendar date without a time, taken as midnight UTC.
    Date(NaiveDate),
}

impl StoreDate {
    /// Normalise to a UTC instant. `None` only for out-of-range timestamps.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            StoreDate::Timestamp(ts) => ts.to_datetime(),
            StoreDate::Instant(instant) => Some(*instant),
            StoreDate::Date(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        }
    }
}

impl From<DateTime<Utc>> for StoreDate {
    fn from(instant: DateTime<Utc>) -> Self {
        StoreDate::Instant(instant)
    }
}

impl From<StoreTimestamp> for StoreDate {
    fn from(ts: StoreTimestamp) -> Self {
        StoreDate::Timestamp(ts)
    }
}

/// Extra guest listed on a sleepover request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalGuest {
    pub name: String,
    pub surname: String,
    pub phone_number: String,
}

/// A sleepover request as held by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepoverRequest {
    pub id: String,
    /// Principal that submitted the request.
    pub user_id: String,
    pub tenant_code: String,
    pub guest_name: String,
    pub guest_surname: String,
    pub guest_phone_number: String,
    pub room_number: String,
    /// Length of the stay in days.
    pub duration_of_stay: u32,
    pub start_date: StoreDate,
    pub end_date: StoreDate,
    pub status: RequestStatus,
    #[serde(default)]
    pub additional_guests: Vec<AdditionalGuest>,
}
