//! Typed request bodies for directory writes
//!
//! Field names follow the camelCase JSON the HTTP API accepts.

use serde::{Deserialize, Serialize};

/// Body of `POST /users`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// sAMAccountName
    pub user_name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    /// CN of the new entry; defaults to "first last" or the user name
    #[serde(default)]
    pub common_name: Option<String>,
    #[serde(default)]
    pub pass: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Parent OU path ("Sales/EMEA") or DN
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub password_expires: Option<bool>,
}

impl NewUser {
    /// Initial password; `pass` wins over `password`
    pub fn initial_password(&self) -> Option<&str> {
        self.pass
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(self.password.as_deref())
            .filter(|p| !p.is_empty())
    }

    pub fn common_name(&self) -> String {
        if let Some(cn) = self.common_name.as_deref().filter(|s| !s.is_empty()) {
            return cn.to_string();
        }

        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(name), None) | (None, Some(name)) => name.to_string(),
            (None, None) => self.user_name.clone(),
        }
    }
}

/// Body of `PUT /users/{user}`; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub password_expires: Option<bool>,
}

impl UserUpdate {
    /// AD attribute names paired with the new values
    pub fn attribute_changes(&self) -> Vec<(&'static str, &str)> {
        [
            ("givenName", &self.first_name),
            ("sn", &self.last_name),
            ("displayName", &self.display_name),
            ("mail", &self.email),
            ("title", &self.title),
            ("telephoneNumber", &self.phone),
            ("description", &self.description),
        ]
        .into_iter()
        .filter_map(|(attr, value)| value.as_deref().map(|v| (attr, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_changes().is_empty()
            && self.enabled.is_none()
            && self.password_expires.is_none()
    }
}

/// Body of `POST /group`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Body of `POST /ou`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOu {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Body of `POST /users/{user}/authenticate` and `PUT /users/{user}/password`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PasswordBody {
    #[serde(default)]
    pub pass: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl PasswordBody {
    /// `pass` wins over `password`
    pub fn into_password(self) -> Option<String> {
        self.pass
            .filter(|p| !p.is_empty())
            .or(self.password)
    }
}

/// Body of `PUT /users/{user}/move`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoveRequest {
    pub location: String,
}
