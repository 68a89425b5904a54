//! Identity, ticket, and profile records shared by the auth core and the stores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// A validated `(username, tenant)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    username: String,
    tenant_name: String,
}

impl Identity {
    #[must_use]
    pub fn new(username: impl Into<String>, tenant_name: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            tenant_name: tenant_name.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn tenant_name(&self) -> &str {
        &self.tenant_name
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.tenant_name)
    }
}

/// A persisted session ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub username: String,
    pub tenant_name: String,
    pub issued_at: DateTime<Utc>,
    pub last_access_at: DateTime<Utc>,
}

impl Ticket {
    /// New ticket for `identity` with both timestamps set to `now`.
    #[must_use]
    pub fn new(id: String, identity: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: identity.username().to_string(),
            tenant_name: identity.tenant_name().to_string(),
            issued_at: now,
            last_access_at: now,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(self.username.clone(), self.tenant_name.clone())
    }
}

/// The durable user record. The auth core only ever reads it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub tenant_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
    pub active: bool,
    pub roles: BTreeSet<String>,
    pub attributes: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

// Keep the password hash out of logs.
impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("tenant_name", &self.tenant_name)
            .field("email", &self.email)
            .field("active", &self.active)
            .field("roles", &self.roles)
            .field("attributes", &self.attributes)
            .field("created_at", &self.created_at)
            .field("modified_at", &self.modified_at)
            .finish_non_exhaustive()
    }
}

impl Profile {
    /// Build a new active profile with a fresh id.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        tenant_name: impl Into<String>,
        email: impl Into<String>,
        hashed_password: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            tenant_name: tenant_name.into(),
            email: email.into(),
            hashed_password: hashed_password.into(),
            active: true,
            roles: BTreeSet::new(),
            attributes: BTreeMap::new(),
            created_at: now,
            modified_at: now,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(self.username.clone(), self.tenant_name.clone())
    }

    /// Copy of this profile whose attributes are restricted to `names`.
    #[must_use]
    pub fn with_attributes_only<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let mut projected = self.clone();
        projected
            .attributes
            .retain(|key, _| names.iter().any(|name| name.as_ref() == key));
        projected
    }

    /// Apply a partial update and return the resulting snapshot.
    ///
    /// Blank strings are ignored, attributes are merged key by key, and
    /// `modified_at` is set to `now`. `self` is left untouched.
    #[must_use]
    pub fn apply(&self, update: ProfileUpdate, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        if let Some(username) = non_blank(update.username) {
            next.username = username;
        }
        if let Some(hashed_password) = non_blank(update.hashed_password) {
            next.hashed_password = hashed_password;
        }
        if let Some(tenant_name) = non_blank(update.tenant_name) {
            next.tenant_name = tenant_name;
        }
        if let Some(email) = update.email {
            next.email = email;
        }
        if let Some(active) = update.active {
            next.active = active;
        }
        if let Some(roles) = update.roles {
            next.roles = roles;
        }
        if let Some(attributes) = update.attributes {
            next.attributes.extend(attributes);
        }
        next.modified_at = now;
        next
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Partial profile change; `None` fields are left as they are.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub hashed_password: Option<String>,
    pub tenant_name: Option<String>,
    pub email: Option<String>,
    pub active: Option<bool>,
    pub roles: Option<BTreeSet<String>>,
    pub attributes: Option<BTreeMap<String, Value>>,
}

/// A ticket paired with the profile it resolves to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Authentication {
    ticket: String,
    profile: Profile,
}

impl Authentication {
    #[must_use]
    pub fn new(ticket: String, profile: Profile) -> Self {
        Self { ticket, profile }
    }

    #[must_use]
    pub fn ticket(&self) -> &str {
        &self.ticket
    }

    #[must_use]
    pub fn profile(&self) -> &Profile {
        &self.profile
    }
}
