//! Read-only reference data used for routing.

use serde::{Deserialize, Serialize};

/// A payment gateway as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    pub id: i64,
    pub name: String,
    /// Content-type identifier the gateway speaks, e.g. `application/json`.
    pub data_format_supported: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub country_id: i64,
}
