use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Globally unique.
    pub email: String,

    pub login: String,

    pub name: String,

    pub birthday: NaiveDate,

    /// Outgoing friendship edges (user -> friend). Not reciprocal.
    #[serde(default)]
    pub friends: BTreeSet<i64>,
}

/// Writable user fields. Used for create, and as the merge-patch base on
/// update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInput {
    pub email: String,

    pub login: String,

    /// Falls back to `login` when empty.
    #[serde(default)]
    pub name: String,

    pub birthday: NaiveDate,
}

impl UserInput {
    /// Display name, defaulting to the login.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            self.login.clone()
        } else {
            self.name.clone()
        }
    }
}

impl From<&User> for UserInput {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            login: user.login.clone(),
            name: user.name.clone(),
            birthday: user.birthday,
        }
    }
}
