//! Parties acting on executions, bills and approval requests.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Site engineer or contractor recording physical work.
    Submitter,
    /// Measurement authority who checks executions and bills.
    Verifier,
    /// Sanctioning authority deciding approval requests.
    Approver,
    /// Accounts officer releasing payments.
    Accounts,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::Submitter => "submitter",
            Role::Verifier => "verifier",
            Role::Approver => "approver",
            Role::Accounts => "accounts",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "submitter" => Some(Role::Submitter),
            "verifier" => Some(Role::Verifier),
            "approver" => Some(Role::Approver),
            "accounts" => Some(Role::Accounts),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            role,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

impl Identifiable for Actor {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for Actor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for Actor {
    fn display_label(&self) -> String {
        format!("{} ({})", self.name, self.role)
    }
}
