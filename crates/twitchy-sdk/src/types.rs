//! Helix response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope shared by Helix list endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelixResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub total: Option<u64>,
}

impl<T> HelixResponse<T> {
    /// Cursor for the next page, if Helix returned one
    pub fn next_cursor(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.cursor.as_deref())
            .filter(|cursor| !cursor.is_empty())
    }
}

/// Page of a cursor-paginated endpoint to request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Page {
    /// No cursor
    #[default]
    First,
    /// Page following this cursor (`after=`)
    After(String),
    /// Page preceding this cursor (`before=`)
    Before(String),
}

impl Page {
    /// Page after `response`, `None` once Helix stops returning a cursor
    pub fn next<T>(response: &HelixResponse<T>) -> Option<Self> {
        response
            .next_cursor()
            .map(|cursor| Page::After(cursor.to_string()))
    }

    /// Page before `response`, `None` when there is no cursor
    pub fn previous<T>(response: &HelixResponse<T>) -> Option<Self> {
        response
            .next_cursor()
            .map(|cursor| Page::Before(cursor.to_string()))
    }
}

/// Pagination cursor (`{}` on the last page)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Twitch user as returned by `GET /users`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub login: String,
    pub display_name: String,
    /// Staff/admin marker, empty for regular users
    #[serde(rename = "type", default)]
    pub user_type: String,
    /// `partner`, `affiliate` or empty
    #[serde(default)]
    pub broadcaster_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub profile_image_url: String,
    #[serde(default)]
    pub offline_image_url: String,
    #[serde(default)]
    pub view_count: u64,
    /// Only present for user tokens with the `user:read:email` scope
    #[serde(default)]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}
