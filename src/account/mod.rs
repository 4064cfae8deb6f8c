// SPDX-License-Identifier: AGPL-3.0-or-later
//! Account lifecycle module
//!
//! Provisions, modifies, and retires operating-system user accounts,
//! including bulk provisioning from a CSV record source. Role elevation is
//! encoded solely as membership in a configurable privilege group.

mod credential;
mod directory;
mod import;
mod lifecycle;

pub use credential::{CredentialEncoder, CredentialRef};
pub use directory::{Directory, HostDirectory, PrivilegeAssignor};
pub use import::{import_users, BatchReport};
pub use lifecycle::{
    FailureKind, Lifecycle, Operation, OperationResult, Outcome, SkipReason, UpdateRequest,
};

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::RosterError;

/// Role of a host account
///
/// Raw role strings are normalized here, at the validation boundary:
/// anything outside the accepted set is rejected before any directory
/// contact happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Ordinary account with no elevated access
    Standard,
    /// Member of the configured privilege group
    Admin,
}

impl FromStr for Role {
    type Err = RosterError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" | "standard" => Ok(Role::Standard),
            _ => Err(RosterError::InvalidRole {
                role: s.trim().to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Standard => write!(f, "standard"),
            Role::Admin => write!(f, "admin"),
        }
    }
}
