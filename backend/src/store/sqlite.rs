use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use student_living_common::{
    AdditionalGuest, AdminProfile, RequestStatus, SleepoverRequest, StoreDate,
};

use super::{RecordStore, StoreError};

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        // Parse sqlite: prefix if present
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        let conn = if path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
            }
            Connection::open(path)?
        };

        conn.execute(
            "CREATE TABLE IF NOT EXISTS admins (
                principal_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS sleepover_requests (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                tenant_code TEXT NOT NULL,
                guest_name TEXT NOT NULL,
                guest_surname TEXT NOT NULL,
                guest_phone_number TEXT NOT NULL,
                room_number TEXT NOT NULL,
                duration_of_stay INTEGER NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                status TEXT NOT NULL,
                additional_guests TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_sleepover_requests_user_id ON sleepover_requests(user_id)",
            [],
        )?;

        tracing::info!("Record store initialized with database: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    /// Create or replace the administrator profile for a principal.
    pub fn insert_admin(&self, principal_id: &str, profile: &AdminProfile) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO admins (principal_id, name, email) VALUES (?1, ?2, ?3)
             ON CONFLICT(principal_id) DO UPDATE SET name = excluded.name, email = excluded.email",
            params![principal_id, profile.name, profile.email],
        )?;
        Ok(())
    }

    /// Store a sleepover request. An empty id is replaced by a fresh UUID.
    /// Returns the stored id.
    pub fn insert_sleepover_request(&self, request: &SleepoverRequest) -> Result<String, StoreError> {
        let id = if request.id.is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            request.id.clone()
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO sleepover_requests (
                id, user_id, tenant_code, guest_name, guest_surname, guest_phone_number,
                room_number, duration_of_stay, start_date, end_date, status,
                additional_guests, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                request.user_id,
                request.tenant_code,
                request.guest_name,
                request.guest_surname,
                request.guest_phone_number,
                request.room_number,
                request.duration_of_stay,
                to_json(&request.start_date)?,
                to_json(&request.end_date)?,
                request.status.as_str(),
                to_json(&request.additional_guests)?,
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        tracing::debug!(request_id = %id, user_id = %request.user_id, "Stored sleepover request");
        Ok(id)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::DatabaseError(e.to_string()))
}

/// Raw row, decoded into a request once the connection lock is released.
struct SleepoverRow {
    id: String,
    user_id: String,
    tenant_code: String,
    guest_name: String,
    guest_surname: String,
    guest_phone_number: String,
    room_number: String,
    duration_of_stay: u32,
    start_date: String,
    end_date: String,
    status: String,
    additional_guests: String,
}

impl SleepoverRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            tenant_code: row.get(2)?,
            guest_name: row.get(3)?,
            guest_surname: row.get(4)?,
            guest_phone_number: row.get(5)?,
            room_number: row.get(6)?,
            duration_of_stay: row.get(7)?,
            start_date: row.get(8)?,
            end_date: row.get(9)?,
            status: row.get(10)?,
            additional_guests: row.get(11)?,
        })
    }

    fn into_request(self) -> Result<SleepoverRequest, StoreError> {
        let corrupt = |reason: String| StoreError::CorruptRecord {
            id: self.id.clone(),
            reason,
        };

        let start_date: StoreDate = serde_json::from_str(&self.start_date)
            .map_err(|e| corrupt(format!("start_date: {}", e)))?;
        let end_date: StoreDate = serde_json::from_str(&self.end_date)
            .map_err(|e| corrupt(format!("end_date: {}", e)))?;
        let additional_guests: Vec<AdditionalGuest> = serde_json::from_str(&self.additional_guests)
            .map_err(|e| corrupt(format!("additional_guests: {}", e)))?;
        let status: RequestStatus = serde_json::from_value(serde_json::Value::String(self.status.clone()))
            .map_err(|e| corrupt(format!("status: {}", e)))?;

        Ok(SleepoverRequest {
            id: self.id,
            user_id: self.user_id,
            tenant_code: self.tenant_code,
            guest_name: self.guest_name,
            guest_surname: self.guest_surname,
            guest_phone_number: self.guest_phone_number,
            room_number: self.room_number,
            duration_of_stay: self.duration_of_stay,
            start_date,
            end_date,
            status,
            additional_guests,
        })
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn admin_profile(&self, principal_id: &str) -> Result<Option<AdminProfile>, StoreError> {
        let conn = self.lock()?;
        let profile = conn
            .query_row(
                "SELECT name, email FROM admins WHERE principal_id = ?1",
                params![principal_id],
                |row| {
                    Ok(AdminProfile {
                        name: row.get(0)?,
                        email: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    async fn sleepover_requests(
        &self,
        principal_id: &str,
    ) -> Result<Vec<SleepoverRequest>, StoreError> {
        let rows = {
            let conn = self.lock()?;
            let mut stmt = conn.prepare(
                "SELECT id, user_id, tenant_code, guest_name, guest_surname, guest_phone_number,
                        room_number, duration_of_stay, start_date, end_date, status, additional_guests
                 FROM sleepover_requests
                 WHERE user_id = ?1
                 ORDER BY created_at, rowid",
            )?;
            let rows = stmt
                .query_map(params![principal_id], SleepoverRow::from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        rows.into_iter().map(SleepoverRow::into_request).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use student_living_common::StoreTimestamp;
    use tempfile::TempDir;

    fn request(id: &str, user_id: &str, start: StoreDate) -> SleepoverRequest {
        SleepoverRequest {
            id: id.to_string(),
            user_id: user_id.to_string(),
            tenant_code: "T-100".to_string(),
            guest_name: "Sipho".to_string(),
            guest_surname: "Dlamini".to_string(),
            guest_phone_number: "0821234567".to_string(),
            room_number: "B12".to_string(),
            duration_of_stay: 2,
            start_date: start,
            end_date: start,
            status: RequestStatus::Pending,
            additional_guests: vec![],
        }
    }

    #[tokio::test]
    async fn test_admin_profile_lookup() {
        let store = SqliteRecordStore::new(":memory:").unwrap();
        let admin = AdminProfile {
            name: "Warden".to_string(),
            email: "warden@example.com".to_string(),
        };
        store.insert_admin("uid-admin", &admin).unwrap();

        assert_eq!(store.admin_profile("uid-admin").await.unwrap(), Some(admin));
        assert_eq!(store.admin_profile("uid-student").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_insert_admin_replaces_existing() {
        let store = SqliteRecordStore::new("sqlite::memory:").unwrap();
        let mut admin = AdminProfile {
            name: "Warden".to_string(),
            email: "warden@example.com".to_string(),
        };
        store.insert_admin("uid-admin", &admin).unwrap();
        admin.name = "Head Warden".to_string();
        store.insert_admin("uid-admin", &admin).unwrap();

        let stored = store.admin_profile("uid-admin").await.unwrap().unwrap();
        assert_eq!(stored.name, "Head Warden");
    }

    #[tokio::test]
    async fn test_sleepover_requests_keep_insertion_order_and_date_shape() {
        let store = SqliteRecordStore::new(":memory:").unwrap();
        let instant = Utc.with_ymd_and_hms(2024, 4, 9, 12, 0, 0).unwrap();

        store
            .insert_sleepover_request(&request("req-b", "uid-1", StoreDate::from(instant)))
            .unwrap();
        store
            .insert_sleepover_request(&request(
                "req-a",
                "uid-1",
                StoreDate::from(StoreTimestamp::from(instant)),
            ))
            .unwrap();
        store
            .insert_sleepover_request(&request("req-c", "uid-2", StoreDate::from(instant)))
            .unwrap();

        let requests = store.sleepover_requests("uid-1").await.unwrap();
        let ids: Vec<&str> = requests.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["req-b", "req-a"]);
        assert!(matches!(requests[0].start_date, StoreDate::Instant(_)));
        assert!(matches!(requests[1].start_date, StoreDate::Timestamp(_)));
    }

    #[tokio::test]
    async fn test_insert_generates_id_and_keeps_guests() {
        let store = SqliteRecordStore::new(":memory:").unwrap();
        let mut req = request("", "uid-1", StoreDate::from(Utc::now()));
        req.additional_guests = vec![AdditionalGuest {
            name: "Ayanda".to_string(),
            surname: "Khumalo".to_string(),
            phone_number: "0831112222".to_string(),
        }];

        let id = store.insert_sleepover_request(&req).unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let stored = store.sleepover_requests("uid-1").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].additional_guests, req.additional_guests);
    }

    #[tokio::test]
    async fn test_unknown_principal_has_no_requests() {
        let store = SqliteRecordStore::new(":memory:").unwrap();
        assert!(store.sleepover_requests("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_database_persists_across_opens() {
        let dir = TempDir::new().unwrap();
        let url = format!("sqlite:{}", dir.path().join("nested/records.db").display());

        {
            let store = SqliteRecordStore::new(&url).unwrap();
            store
                .insert_sleepover_request(&request("req-1", "uid-1", StoreDate::from(Utc::now())))
                .unwrap();
        }

        let store = SqliteRecordStore::new(&url).unwrap();
        assert_eq!(store.sleepover_requests("uid-1").await.unwrap().len(), 1);
    }
}
