//! View model for the sleepover request history page.

use chrono::FixedOffset;
use serde::Serialize;
use student_living_common::{RequestStatus, SleepoverRequest, StoreDate};

use super::format::format_long_date;

pub const PAGE_TITLE: &str = "Sleepover Request History";
pub const NEW_REQUEST_HREF: &str = "/student/sleepover";
pub const EMPTY_MESSAGE: &str = "No sleepover requests found.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub label: &'static str,
    pub href: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeTone {
    Warning,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: String,
    pub tone: BadgeTone,
}

impl From<RequestStatus> for StatusBadge {
    fn from(status: RequestStatus) -> Self {
        let tone = match status {
            RequestStatus::Pending => BadgeTone::Warning,
            RequestStatus::Approved => BadgeTone::Success,
            RequestStatus::Rejected | RequestStatus::Unknown => BadgeTone::Error,
        };
        Self {
            label: capitalize(status.as_str()),
            tone,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One rendered sleepover request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestCard {
    pub id: String,
    pub guest: String,
    pub tenant_code: String,
    pub room_number: String,
    pub guest_phone: String,
    pub duration: String,
    pub check_in: String,
    pub check_out: String,
    pub additional_guests: Vec<String>,
    pub status: StatusBadge,
}

impl RequestCard {
    pub fn render(request: &SleepoverRequest, offset: &FixedOffset) -> Self {
        let date = |d: &StoreDate| format_long_date(d, offset).unwrap_or_else(|| "Unknown date".to_string());
        let duration = match request.duration_of_stay {
            1 => "1 day".to_string(),
            n => format!("{} days", n),
        };

        Self {
            id: request.id.clone(),
            guest: format!("{} {}", request.guest_name, request.guest_surname),
            tenant_code: request.tenant_code.clone(),
            room_number: request.room_number.clone(),
            guest_phone: request.guest_phone_number.clone(),
            duration,
            check_in: date(&request.start_date),
            check_out: date(&request.end_date),
            additional_guests: request
                .additional_guests
                .iter()
                .map(|g| format!("{} {} - {}", g.name, g.surname, g.phone_number))
                .collect(),
            status: StatusBadge::from(request.status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistoryContent {
    Loading,
    Empty {
        message: &'static str,
        call_to_action: Link,
    },
    Requests {
        requests: Vec<RequestCard>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryPage {
    pub title: &'static str,
    pub new_request: Link,
    /// Inline, non-fatal error shown above the content.
    pub error: Option<String>,
    pub content: HistoryContent,
}

impl HistoryPage {
    pub fn render(
        requests: &[SleepoverRequest],
        loading: bool,
        error: Option<String>,
        offset: &FixedOffset,
    ) -> Self {
        let content = if loading {
            HistoryContent::Loading
        } else if requests.is_empty() {
            HistoryContent::Empty {
                message: EMPTY_MESSAGE,
                call_to_action: Link {
                    label: "Submit your first request",
                    href: NEW_REQUEST_HREF,
                },
            }
        } else {
            HistoryContent::Requests {
                requests: requests
                    .iter()
                    .map(|r| RequestCard::render(r, offset))
                    .collect(),
            }
        };

        Self {
            title: PAGE_TITLE,
            new_request: Link {
                label: "New Request",
                href: NEW_REQUEST_HREF,
            },
            error,
            content,
        }
    }
}
