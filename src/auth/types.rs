//! Types for user accounts and profiles

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// User profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: i64,

    /// Display name
    #[serde(rename = "nome")]
    pub name: String,

    /// The user's email address
    pub email: String,

    /// The user's phone number
    #[serde(rename = "telefone", default)]
    pub phone: Option<String>,

    /// Delivery address kept on the profile
    #[serde(rename = "endereco", default)]
    pub address: Option<String>,

    #[serde(rename = "data_nascimento", default)]
    pub birth_date: Option<NaiveDate>,

    #[serde(rename = "genero", default)]
    pub gender: Option<String>,

    #[serde(default)]
    pub avatar_url: Option<String>,

    /// The creation time
    #[serde(rename = "data_criacao", default)]
    pub created_at: Option<NaiveDateTime>,

    /// Whether the account can use the admin endpoints
    #[serde(default)]
    pub is_admin: bool,
}

/// Data for creating an account
#[derive(Clone, Default, Serialize)]
pub struct RegisterData {
    #[serde(rename = "nome")]
    pub name: String,

    pub email: String,

    #[serde(rename = "senha")]
    pub password: String,

    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(rename = "endereco", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(rename = "data_nascimento", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,

    #[serde(rename = "genero", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl RegisterData {
    pub fn new(name: &str, email: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }
}

impl fmt::Debug for RegisterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterData")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("phone", &self.phone)
            .field("address", &self.address)
            .field("birth_date", &self.birth_date)
            .field("gender", &self.gender)
            .field("avatar_url", &self.avatar_url)
            .finish()
    }
}

/// Profile fields to change; `None` leaves a field as it is
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "telefone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(rename = "endereco", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(rename = "data_nascimento", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,

    #[serde(rename = "genero", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Credentials<'a> {
    pub email: &'a str,
    #[serde(rename = "senha")]
    pub password: &'a str,
}

/// Login response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    pub usuario: User,
}

/// Response wrapping a user under `usuario`, as returned by registration and
/// profile updates
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserEnvelope {
    pub usuario: User,
}
