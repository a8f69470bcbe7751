//! Weather reports

use super::ApiClient;
use crate::error::ClientResult;
use crate::models::{WeatherQuery, WeatherReport};

impl ApiClient {
    /// Stored reports
    pub async fn list_weather_reports(&self) -> ClientResult<Vec<WeatherReport>> {
        self.get("/api/weather-reports/").await
    }

    /// Ask the backend for the current weather at `location`
    pub async fn fetch_weather(&self, location: &str) -> ClientResult<WeatherReport> {
        self.post("/api/weatherreports/fetch/", &WeatherQuery { location })
            .await
    }
}
