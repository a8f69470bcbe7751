//! Data models for the AgriConnect marketplace API

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub mod auth;
pub use auth::*;

/// User as nested inside products and orders
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_farmer: bool,
    #[serde(default)]
    pub is_buyer: bool,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Produce listed by a farmer
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    #[serde(default)]
    pub farmer: Option<UserSummary>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub quantity: f64,
    pub unit: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub price_per_unit: f64,
    #[serde(default = "default_available")]
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

fn default_available() -> bool {
    true
}

/// Body for `POST /api/products/`
#[derive(Debug, Serialize, Clone)]
pub struct NewProduct {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quantity: f64,
    pub unit: String,
    pub price_per_unit: f64,
}

/// Order lifecycle as tracked by the backend
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parse a status name, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" | "canceled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

/// Product as embedded in an order
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OrderProduct {
    pub id: i64,
    pub name: String,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub price_per_unit: f64,
    pub unit: String,
}

/// Buyer order against a product
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Order {
    pub id: i64,
    pub product: OrderProduct,
    #[serde(default)]
    pub buyer: Option<UserSummary>,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub quantity: f64,
    #[serde(deserialize_with = "decimal::deserialize")]
    pub total_price: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Body for `POST /api/orders/`
#[derive(Debug, Serialize, Clone)]
pub struct NewOrder {
    pub product_id: i64,
    pub quantity: f64,
}

/// Body for `PATCH /api/orders/{id}/`
#[derive(Debug, Serialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
}

/// Informational update category
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateCategory {
    News,
    Technology,
    Tips,
}

/// Farming news/tips item
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FarmingUpdate {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub category: UpdateCategory,
    pub published_at: DateTime<Utc>,
}

/// Weather report; freshly fetched reports may not carry an id yet
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReport {
    #[serde(default)]
    pub id: Option<i64>,
    pub location: String,
    #[serde(default)]
    pub report_date: Option<NaiveDate>,
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub conditions: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for `POST /api/weatherreports/fetch/`
#[derive(Debug, Serialize)]
pub struct WeatherQuery<'a> {
    pub location: &'a str,
}

/// `GET /api/users/dashboard/`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Dashboard {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub is_farmer: bool,
    pub is_buyer: bool,
    #[serde(default)]
    pub products_count: u64,
    #[serde(default)]
    pub orders_count: u64,
}

impl Dashboard {
    /// Human readable role, e.g. "Farmer & Buyer"
    pub fn role_label(&self) -> &'static str {
        match (self.is_farmer, self.is_buyer) {
            (true, true) => "Farmer & Buyer",
            (true, false) => "Farmer",
            (false, true) => "Buyer",
            (false, false) => "",
        }
    }
}

/// Body for `POST /api/ask-ai/`
#[derive(Debug, Serialize, Validate)]
pub struct AskAiRequest {
    #[validate(length(min = 1, message = "question is required"))]
    pub question: String,
}

impl AskAiRequest {
    pub fn new(question: &str) -> Self {
        Self {
            question: question.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskAiResponse {
    pub answer: String,
}

/// Decimal fields arrive as JSON strings ("12.50") from the backend.
mod decimal {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DecimalVisitor)
    }

    struct DecimalVisitor;

    impl<'de> Visitor<'de> for DecimalVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a number or a decimal string")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            v.trim()
                .parse::<f64>()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }
}
