//! Acting staff member and their capability level.
//!
//! Authentication lives outside this service; handlers receive the caller's
//! identity and role from trusted headers and pass them into operations as an
//! explicit argument instead of reading ambient request state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "STAFF" => Some(Role::Staff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: Option<String>,
    pub role: Role,
}

impl Actor {
    pub fn new(name: Option<String>, role: Role) -> Self {
        Actor { name, role }
    }

    /// Default when no role header is supplied.
    pub fn staff() -> Self {
        Actor {
            name: None,
            role: Role::Staff,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
