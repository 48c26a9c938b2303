//! Users, roles and the acting principal.

use chrono::{DateTime, Utc};
use common::{DocumentId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::repository::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    Admin,
    Rider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::Rider => "rider",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            "rider" => Ok(Role::Rider),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Saved postal address of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Trimmed and lowercased; unique across users.
    pub email: String,
    pub name: String,
    /// PHC string; absent for accounts that sign in through an external provider.
    pub password_hash: Option<String>,
    pub role: Role,
    pub is_approved: bool,
    #[serde(default)]
    pub external_subject: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn document_id(&self) -> DocumentId {
        self.id.document_id()
    }

    fn unique_key(&self) -> Option<String> {
        Some(self.email.clone())
    }
}

impl User {
    pub fn new(email: &str, name: &str, role: Role) -> Self {
        Self {
            id: UserId::new(),
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash: None,
            role,
            is_approved: false,
            external_subject: None,
            address: None,
            phone: None,
            created_at: Utc::now(),
        }
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.id,
            role: self.role,
        }
    }

    /// Public view without credentials.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            is_approved: self.is_approved,
            address: self.address.clone(),
            phone: self.phone.clone(),
            created_at: self.created_at,
        }
    }
}

/// What clients get to see of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_approved: bool,
    pub address: Option<Address>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The authenticated principal performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_rider(&self) -> bool {
        self.role == Role::Rider
    }
}

/// Password hashing seam; the HTTP layer plugs in a real algorithm.
pub trait PasswordHasher: Send + Sync {
    /// Produces a self-describing hash string for `password`.
    fn hash(&self, password: &str) -> Result<String>;

    /// Checks `password` against a hash produced by [`PasswordHasher::hash`].
    fn verify(&self, password: &str, hash: &str) -> bool;
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let user = User::new("  Jane.Doe@Example.COM ", " Jane ", Role::Customer);
        assert_eq!(user.email, "jane.doe@example.com");
        assert_eq!(user.name, "Jane");
        assert_eq!(user.unique_key().as_deref(), Some("jane.doe@example.com"));
        assert!(!user.is_approved);
    }

    #[test]
    fn profile_omits_password_hash() {
        let mut user = User::new("a@b.co", "A", Role::Rider);
        user.password_hash = Some("secret-hash".to_string());

        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "rider");
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [Role::Customer, Role::Admin, Role::Rider] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn actor_role_checks() {
        let admin = Actor::new(UserId::new(), Role::Admin);
        assert!(admin.is_admin());
        assert!(!admin.is_rider());
    }
}
