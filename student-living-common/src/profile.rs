//! Application-level profiles attached to an authenticated principal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Principal;

/// Role tag discriminating the profile variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Student tier assigned to every new resident.
    Newbie,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Newbie => write!(f, "newbie"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Review state of a student's accommodation application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Profile of a resident student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub full_name: String,
    pub email: String,
    pub application_status: ApplicationStatus,
    pub place_of_study: String,
    pub room_number: String,
    pub tenant_code: String,
    pub is_guest: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    /// Derive the default student shape from the principal's display fields.
    ///
    /// The display name is split on its first whitespace run into `name` and
    /// `surname`. Institution fields stay empty until the application is
    /// processed.
    pub fn from_principal(principal: &Principal, now: DateTime<Utc>) -> Self {
        let full_name = principal
            .display_name
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let (name, surname) = match full_name.split_once(char::is_whitespace) {
            Some((name, surname)) => (name.to_string(), surname.trim().to_string()),
            None => (full_name.clone(), String::new()),
        };

        Self {
            id: principal.id.clone(),
            name,
            surname,
            full_name,
            email: principal.email.clone().unwrap_or_default(),
            application_status: ApplicationStatus::Pending,
            place_of_study: String::new(),
            room_number: String::new(),
            tenant_code: String::new(),
            is_guest: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile of a residence administrator, as stored in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub name: String,
    pub email: String,
}

/// The application-level record describing a principal's role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Profile {
    #[serde(rename = "newbie")]
    Student(StudentProfile),
    Admin(AdminProfile),
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Student(_) => Role::Newbie,
            Profile::Admin(_) => Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Profile::Admin(_))
    }

    pub fn email(&self) -> &str {
        match self {
            Profile::Student(student) => &student.email,
            Profile::Admin(admin) => &admin.email,
        }
    }

    /// Dashboard the profile lands on after signing in.
    pub fn home_route(&self) -> &'static str {
        match self {
            Profile::Student(_) => "/student/dashboard",
            Profile::Admin(_) => "/admin/dashboard",
        }
    }
}
