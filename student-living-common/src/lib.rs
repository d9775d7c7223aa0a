//! Student Living Common Types
//!
//! Shared types used by the session controller, the record store and the
//! HTTP surface.

pub mod principal;
pub mod profile;
pub mod sleepover;

pub use principal::{AuthEvent, Principal, SessionMetadata};
pub use profile::{AdminProfile, ApplicationStatus, Profile, Role, StudentProfile};
pub use sleepover::{AdditionalGuest, RequestStatus, SleepoverRequest, StoreDate, StoreTimestamp};
