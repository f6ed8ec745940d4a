//! User records and password hashing

use std::fmt;
use std::str::FromStr;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Allowed gender values, in wire form
pub const GENDERS: [&str; 3] = ["male", "female", "other"];

/// User gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown gender string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid gender: '{0}'")]
pub struct InvalidGender(pub String);

impl FromStr for Gender {
    type Err = InvalidGender;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(InvalidGender(other.to_owned())),
        }
    }
}

impl TryFrom<String> for Gender {
    type Error = InvalidGender;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// User record as persisted.
///
/// Deliberately not `Serialize`: the password hash must never reach a
/// response body. HTTP handlers convert to a response DTO instead.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    #[sqlx(try_from = "String")]
    pub gender: Gender,
    pub email: String,
    #[sqlx(rename = "password")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields for a user that has not been stored yet.
///
/// `password` is plaintext until the service hashes it.
#[derive(Clone, PartialEq)]
pub struct NewUser {
    pub full_name: String,
    pub phone: String,
    pub gender: Gender,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// True when every text field is empty.
    pub fn is_blank(&self) -> bool {
        [&self.full_name, &self.phone, &self.email, &self.password]
            .iter()
            .all(|s| s.is_empty())
    }
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("full_name", &self.full_name)
            .field("phone", &self.phone)
            .field("gender", &self.gender)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Partial user update; `None` leaves the stored value alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub email: Option<String>,
}

impl UserChanges {
    /// Overwrite every field of `user` that has a change.
    pub fn apply(self, user: &mut User) {
        if let Some(full_name) = self.full_name {
            user.full_name = full_name;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(gender) = self.gender {
            user.gender = gender;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
    }
}

/// Password hashing failure
#[derive(Debug, thiserror::Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// Hash a plaintext password into an Argon2id PHC string.
pub fn hash_password(plain: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashError(e.to_string()))
}
