use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::text_enum;

text_enum! {
    /// Global role, independent of any project role.
    UserRole("user role") {
        Researcher => "researcher",
        AcademicManager => "academic_manager",
        Administrator => "administrator",
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub affiliation: String,
    pub role: UserRole,
    pub is_email_verified: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_expires: Option<DateTime<Utc>>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            affiliation: self.affiliation.clone(),
        }
    }

    /// Consumes the verification token if `token` matches and has not expired.
    pub fn verify_email(&mut self, token: &str, now: DateTime<Utc>) -> bool {
        let valid = self.email_verification_token.as_deref() == Some(token)
            && self.email_verification_expires.is_some_and(|exp| exp > now);
        if valid {
            self.is_email_verified = true;
            self.email_verification_token = None;
            self.email_verification_expires = None;
            self.updated_at = now;
        }
        valid
    }

    pub fn clear_reset_token(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expires = None;
    }
}

/// The populated form of a user reference in responses. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub affiliation: String,
}
