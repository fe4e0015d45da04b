use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Philippine mobile format used across the customer pages.
pub static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\+639\d{9}$").expect("phone pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub date_registered: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCustomer {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
    #[validate(regex(path = "PHONE_RE", message = "Phone must match +639XXXXXXXXX"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CustomerPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Full name must not be empty"))]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Email address is invalid"))]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(regex(path = "PHONE_RE", message = "Phone must match +639XXXXXXXXX"))]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Customer {
    /// Applies a partial update, leaving unset fields untouched.
    pub fn merged(&self, patch: &CustomerPatch) -> Customer {
        Customer {
            id: self.id,
            full_name: patch.full_name.clone().unwrap_or_else(|| self.full_name.clone()),
            email: patch.email.clone().unwrap_or_else(|| self.email.clone()),
            phone: patch.phone.clone().unwrap_or_else(|| self.phone.clone()),
            address: patch.address.clone().unwrap_or_else(|| self.address.clone()),
            date_registered: self.date_registered,
        }
    }
}
