#[cfg(test)]
pub mod mock_store;

use chrono::{TimeZone, Utc};
use student_living_common::{
    AdditionalGuest, AdminProfile, Principal, RequestStatus, SleepoverRequest, StoreDate,
    StoreTimestamp,
};

use crate::config::{
    ApiConfig, Config, CorsConfig, HistoryConfig, IdentityBackend, IdentityConfig, LoggingConfig,
    StoreConfig,
};
use crate::identity::InMemoryIdentityProvider;

pub const STUDENT_EMAIL: &str = "lerato@example.com";
pub const STUDENT_PASSWORD: &str = "student-pass";
pub const STUDENT_ID: &str = "uid-student";
pub const ADMIN_EMAIL: &str = "warden@example.com";
pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const ADMIN_ID: &str = "uid-admin";

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
        },
        identity: IdentityConfig {
            backend: IdentityBackend::Memory,
            ..IdentityConfig::default()
        },
        store: StoreConfig {
            database_url: "sqlite::memory:".to_string(),
        },
        history: HistoryConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
        cors: CorsConfig {
            origins: "*".to_string(),
        },
    }
}

pub fn student_principal() -> Principal {
    Principal::new(STUDENT_ID)
        .with_display_name("Lerato Mokoena")
        .with_email(STUDENT_EMAIL)
}

pub fn admin_principal() -> Principal {
    Principal::new(ADMIN_ID)
        .with_display_name("Residence Warden")
        .with_email(ADMIN_EMAIL)
}

pub fn admin_profile() -> AdminProfile {
    AdminProfile {
        name: "Residence Warden".to_string(),
        email: ADMIN_EMAIL.to_string(),
    }
}

/// Identity provider with one student and one admin account.
pub fn seeded_identity() -> InMemoryIdentityProvider {
    let identity = InMemoryIdentityProvider::new();
    identity.add_account(STUDENT_EMAIL, STUDENT_PASSWORD, student_principal());
    identity.add_account(ADMIN_EMAIL, ADMIN_PASSWORD, admin_principal());
    identity
}

/// A pending request starting on April 9th, 2024, with the start date in
/// store-native form and the end date as a plain instant.
pub fn sample_request(id: &str, user_id: &str) -> SleepoverRequest {
    let start = Utc.with_ymd_and_hms(2024, 4, 9, 10, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 4, 11, 10, 0, 0).unwrap();
    SleepoverRequest {
        id: id.to_string(),
        user_id: user_id.to_string(),
        tenant_code: "T-100".to_string(),
        guest_name: "Sipho".to_string(),
        guest_surname: "Dlamini".to_string(),
        guest_phone_number: "0821234567".to_string(),
        room_number: "B12".to_string(),
        duration_of_stay: 2,
        start_date: StoreDate::Timestamp(StoreTimestamp::from(start)),
        end_date: StoreDate::Instant(end),
        status: RequestStatus::Pending,
        additional_guests: vec![AdditionalGuest {
            name: "Ayanda".to_string(),
            surname: "Khumalo".to_string(),
            phone_number: "0831112222".to_string(),
        }],
    }
}
