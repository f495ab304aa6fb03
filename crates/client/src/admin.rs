//! Dashboard counters.

use crate::api::{unwrap_data, ApiClient};
use estate_core::error::{EstateError, EstateResult};
use estate_core::DashboardStats;

pub struct AdminApi {
    api: ApiClient,
}

impl AdminApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `GET /admin/stats`. Counters the server leaves out read as zero.
    pub async fn stats(&self) -> EstateResult<DashboardStats> {
        let body = self.api.get("/admin/stats").await?;
        match unwrap_data(body) {
            serde_json::Value::Null => Ok(DashboardStats::default()),
            payload => serde_json::from_value(payload)
                .map_err(|e| EstateError::InvalidPayload(format!("malformed stats: {e}"))),
        }
    }
}
