//! Signed-in user's dashboard

use super::ApiClient;
use crate::error::ClientResult;
use crate::models::Dashboard;

impl ApiClient {
    pub async fn dashboard(&self) -> ClientResult<Dashboard> {
        self.get("/api/users/dashboard/").await
    }
}
