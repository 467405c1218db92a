use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Closed set of application states. Unknown values coming in from an
/// import are coerced to `Applied` rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Applied,
    Interviewing,
    Offer,
    Rejected,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Applied,
        Status::Interviewing,
        Status::Offer,
        Status::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Applied => "Applied",
            Status::Interviewing => "Interviewing",
            Status::Offer => "Offer",
            Status::Rejected => "Rejected",
        }
    }

    /// Case-insensitive parse, `None` for anything outside the set.
    pub fn parse(s: &str) -> Option<Status> {
        match s.trim().to_lowercase().as_str() {
            "applied" => Some(Status::Applied),
            "interviewing" => Some(Status::Interviewing),
            "offer" => Some(Status::Offer),
            "rejected" => Some(Status::Rejected),
            _ => None,
        }
    }

    /// Import coercion: anything unrecognized becomes `Applied`.
    pub fn parse_or_applied(s: &str) -> Status {
        Status::parse(s).unwrap_or(Status::Applied)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked job application. Serialized with the camelCase field names
/// of the shared data file so local blobs and the synced remote file stay
/// interchangeable with other clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub company: String,
    pub position: String,
    pub applied_date: NaiveDate,
    pub status: Status,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub job_link: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, deserialize_with = "empty_date_as_none")]
    pub reminder_date: Option<NaiveDate>,
    #[serde(default)]
    pub reminder_note: Option<String>,
}

impl Application {
    /// The triple that identifies "the same application" across
    /// independently created copies. Deliberately not the `id`: the same
    /// posting entered on two devices gets two different ids.
    pub fn identity_key(&self) -> String {
        format!("{}|{}|{}", self.company, self.position, self.applied_date)
    }
}

/// Session-clock-derived id for records created in this app. Other clients
/// write the same shape, so lexicographic order on ids is temporal order.
pub fn new_record_id(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Filter for the list view. `status: None` means "All".
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub search: String,
    pub status: Option<Status>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// Older data files write an empty string where no reminder is set.
fn empty_date_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
