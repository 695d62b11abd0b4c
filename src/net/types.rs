//! Shared wire DTOs for the admin client / REST API boundary.
//!
//! DESIGN
//! ======
//! Field names follow the API's camelCase JSON. Identifiers are kept as
//! strings on the client even when a backend emits numbers, so the
//! deserializers below accept either form.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// SESSION
// =============================================================================

/// The authenticated user as returned by the login and refresh endpoints.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
}

/// Tokens plus profile for one logged-in tab.
///
/// Login and refresh both answer with exactly this shape, so the same type is
/// used for the response body and for the persisted record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(alias = "token")]
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
}

impl Session {
    /// A record only counts as a session when it carries an access token.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Body of `POST <refresh-url>`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Optional error payload on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Which login identifier the user typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoginIdentifier {
    Username(String),
    Email(String),
}

impl LoginIdentifier {
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Username(value) | Self::Email(value) => value,
        }
    }
}

/// Transient login input. Never persisted and never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub identifier: LoginIdentifier,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn username(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: LoginIdentifier::Username(username.into()),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn email(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: LoginIdentifier::Email(email.into()),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Serialize for Credentials {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            username: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            email: Option<&'a str>,
            password: &'a str,
        }

        let (username, email) = match &self.identifier {
            LoginIdentifier::Username(value) => (Some(value.as_str()), None),
            LoginIdentifier::Email(value) => (None, Some(value.as_str())),
        };
        let wire = Wire {
            username,
            email,
            password: &self.password,
        };
        wire.serialize(serializer)
    }
}

// =============================================================================
// PRODUCTS
// =============================================================================

/// Price tier of a product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductTier {
    #[serde(rename = "Económico")]
    Economico,
    #[serde(rename = "Intermedio")]
    Intermedio,
    #[serde(rename = "Premium")]
    Premium,
}

impl ProductTier {
    pub const ALL: [Self; 3] = [Self::Economico, Self::Intermedio, Self::Premium];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Economico => "Económico",
            Self::Intermedio => "Intermedio",
            Self::Premium => "Premium",
        }
    }

    /// Parse a tier label, ignoring ASCII case and the accent on "Económico".
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL.into_iter().find(|tier| {
            tier.label().eq_ignore_ascii_case(raw)
                || (*tier == Self::Economico && raw.eq_ignore_ascii_case("economico"))
        })
    }
}

impl fmt::Display for ProductTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A product as stored by the API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", alias = "id", deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tier: ProductTier,
    pub price: f64,
    pub stock: u32,
}

/// A product that has not been assigned an id yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub tier: ProductTier,
    pub price: f64,
    pub stock: u32,
}

impl ProductDraft {
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Product {
        Product {
            id: id.into(),
            name: self.name,
            tier: self.tier,
            price: self.price,
            stock: self.stock,
        }
    }
}

// =============================================================================
// USERS
// =============================================================================

/// An admin-area user record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
}

/// Registration payload for `POST <users>/register`.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("name", &self.name)
            .field("role", &self.role)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Partial user update; absent fields are left untouched by the server.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(number) if number.is_i64() || number.is_u64() => {
            Ok(number.to_string())
        }
        _ => Err(D::Error::custom("expected string or integer id")),
    }
}
