//! Farming news and tips

use super::ApiClient;
use crate::error::ClientResult;
use crate::models::FarmingUpdate;

impl ApiClient {
    pub async fn list_updates(&self) -> ClientResult<Vec<FarmingUpdate>> {
        self.get("/api/updates/").await
    }
}
