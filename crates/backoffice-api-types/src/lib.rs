//! Wire types for the storefront back-office API.
//!
//! Records carry the fields the admin tooling reads directly; everything else
//! the backend returns is kept verbatim in `attributes` so round-tripping a
//! record through an update never drops data.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Spring-style page envelope returned by paged list endpoints.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageEnvelope<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: Option<u64>,
    /// Spring serializes unpaged requests as the string `"INSTANCE"`, so this stays loose.
    #[serde(default)]
    pub pageable: Option<Value>,
    /// Some endpoints echo the page index at the top level instead of under `pageable`.
    #[serde(default)]
    pub number: Option<u32>,
}

impl<T> PageEnvelope<T> {
    /// Zero-based page index echoed by the server, if any.
    pub fn echoed_index(&self) -> Option<u32> {
        self.pageable
            .as_ref()
            .and_then(|p| p.get("pageNumber"))
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .or(self.number)
    }
}

/// Error body the backend attaches to failed requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
}

impl ApiErrorBody {
    /// Human-readable message, preferring `message` over the generic `error` reason.
    pub fn human_message(&self) -> Option<&str> {
        non_blank(self.message.as_deref()).or_else(|| non_blank(self.error.as_deref()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|m| !m.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipping,
    Delivered,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    pub const FILTERABLE: [&'static str; 5] =
        ["PENDING", "CONFIRMED", "SHIPPING", "DELIVERED", "CANCELLED"];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Shipping => "SHIPPING",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecruitmentStatus {
    Open,
    Closed,
    #[serde(other)]
    Unknown,
}

impl RecruitmentStatus {
    pub const FILTERABLE: [&'static str; 2] = ["OPEN", "CLOSED"];

    pub fn as_str(self) -> &'static str {
        match self {
            RecruitmentStatus::Open => "OPEN",
            RecruitmentStatus::Closed => "CLOSED",
            RecruitmentStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Admin,
    Editor,
    Customer,
    #[serde(other)]
    Unknown,
}

impl UserRole {
    pub const FILTERABLE: [&'static str; 3] = ["ADMIN", "EDITOR", "CUSTOMER"];

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Editor => "EDITOR",
            UserRole::Customer => "CUSTOMER",
            UserRole::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub id: i64,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub status: OrderStatus,
    #[serde(default)]
    pub total_amount: Option<f64>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category_names: Vec<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub category_names: Vec<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsRecord {
    pub id: i64,
    pub title: String,
    #[serde(default, rename = "type")]
    pub news_type: Option<String>,
    #[serde(default)]
    pub category_names: Vec<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
    #[serde(default, rename = "type")]
    pub category_type: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecruitmentRecord {
    pub id: i64,
    pub title: String,
    pub status: RecruitmentStatus,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: UserRole,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_prefers_pageable_echo() {
        let body = r#"{"content":[],"totalElements":0,"pageable":{"pageNumber":2},"number":7}"#;
        let page: PageEnvelope<Value> = serde_json::from_str(body).expect("envelope");
        assert_eq!(page.echoed_index(), Some(2));
    }

    #[test]
    fn envelope_tolerates_unpaged_marker() {
        let body = r#"{"content":[{"id":1}],"pageable":"INSTANCE"}"#;
        let page: PageEnvelope<Value> = serde_json::from_str(body).expect("envelope");
        assert_eq!(page.echoed_index(), None);
        assert_eq!(page.total_elements, None);
    }

    #[test]
    fn unknown_status_does_not_fail_decoding() {
        let order: OrderRecord =
            serde_json::from_str(r#"{"id":1,"status":"REFUNDED","note":"x"}"#).expect("order");
        assert_eq!(order.status, OrderStatus::Unknown);
        assert_eq!(order.attributes.get("note"), Some(&Value::from("x")));
    }

    #[test]
    fn error_body_falls_back_to_reason() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"error":"Bad Request","message":"  "}"#).expect("body");
        assert_eq!(body.human_message(), Some("Bad Request"));
    }
}
