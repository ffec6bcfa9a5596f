//! Marketplace users (buyers and sellers).

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// A KitabWale account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

/// A user reference that may or may not be populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Id(UserId),
    User(UserSummary),
}

/// The subset of user fields embedded in listings and orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl UserRef {
    /// The referenced user id.
    #[must_use]
    pub fn id(&self) -> &UserId {
        match self {
            Self::Id(id) => id,
            Self::User(user) => &user.id,
        }
    }

    /// Display name, if populated.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Id(_) => None,
            Self::User(user) => user.name.as_deref(),
        }
    }
}
