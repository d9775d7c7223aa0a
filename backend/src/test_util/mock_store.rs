use async_trait::async_trait;
use mockall::mock;
use student_living_common::{AdminProfile, SleepoverRequest};

use crate::store::{RecordStore, StoreError};

mock! {
    pub Store {}

    #[async_trait]
    impl RecordStore for Store {
        async fn admin_profile(&self, principal_id: &str) -> Result<Option<AdminProfile>, StoreError>;
        async fn sleepover_requests(&self, principal_id: &str) -> Result<Vec<SleepoverRequest>, StoreError>;
    }
}
