// SPDX-License-Identifier: AGPL-3.0-or-later
//! Account lifecycle orchestrator
//!
//! Implements the create / delete / update state machine by composing the
//! directory adapter, credential encoder, and privilege assignor. Every
//! operation produces a structured [`OperationResult`]; failures are typed
//! outcomes, never uncontrolled control flow.
//!
//! Existence is re-queried immediately before each mutating step and never
//! cached. The check and the mutation are not atomic: with concurrent
//! callers, mutations for a given username must be serialized by an
//! external mutual-exclusion mechanism keyed on the username. This core
//! assumes a single-threaded deployment.

use std::fmt;

use serde::Serialize;
use tracing::{error, info, warn};

use super::credential::CredentialEncoder;
use super::directory::{Directory, PrivilegeAssignor};
use super::Role;
use crate::error::RosterError;

/// Lifecycle operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Delete,
    Update,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => write!(f, "create"),
            Operation::Delete => write!(f, "delete"),
            Operation::Update => write!(f, "update"),
        }
    }
}

/// Why an operation was skipped rather than performed
///
/// Skips are not errors: batch callers count them separately from failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Create requested for an account that already exists
    AlreadyExists,
    /// Delete or update requested for an account that does not exist
    NotFound,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyExists => write!(f, "already exists"),
            SkipReason::NotFound => write!(f, "not found"),
        }
    }
}

/// Classification of a failed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// Malformed input, e.g. an invalid role string
    Validation,
    /// Credential encoding failed
    Encoding,
    /// The host account store refused or failed the operation
    Directory,
}

/// Outcome of a single lifecycle operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every step completed
    Succeeded,
    /// Nothing to do; no mutation was performed
    Skipped { reason: SkipReason },
    /// Some steps completed and at least one did not
    ///
    /// Distinct from total failure so recovery can target only the failed
    /// step, relying on the idempotency of grant/revoke/set_credential.
    PartiallySucceeded {
        completed: Vec<String>,
        failed: Vec<String>,
    },
    /// No step took effect
    Failed { kind: FailureKind, cause: String },
}

impl Outcome {
    /// Whether the caller should treat this outcome as fully successful
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded | Outcome::Skipped { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Succeeded => write!(f, "succeeded"),
            Outcome::Skipped { reason } => write!(f, "skipped ({reason})"),
            Outcome::PartiallySucceeded { .. } => write!(f, "partially succeeded"),
            Outcome::Failed { .. } => write!(f, "failed"),
        }
    }
}

/// Immutable result of a single lifecycle operation
///
/// The message never contains plaintext credentials.
#[derive(Debug, Clone, Serialize)]
pub struct OperationResult {
    pub username: String,
    pub operation: Operation,
    pub outcome: Outcome,
    pub message: String,
}

/// Requested field changes for an update operation
///
/// Each field is applied independently, in the stable order credential,
/// role, rename.
#[derive(Debug, Clone, Default)]
pub struct UpdateRequest {
    pub new_username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

impl UpdateRequest {
    /// Whether any field change was requested
    pub fn is_empty(&self) -> bool {
        self.new_username.is_none() && self.password.is_none() && self.role.is_none()
    }
}

fn failure_kind(err: &RosterError) -> FailureKind {
    match err {
        RosterError::InvalidRole { .. } => FailureKind::Validation,
        RosterError::Encoding { .. } => FailureKind::Encoding,
        _ => FailureKind::Directory,
    }
}

/// Orchestrator for the account lifecycle state machine
///
/// The only component that talks to the directory adapter, encoder, and
/// privilege assignor. One store value implements both trait seams so the
/// production adapter and the test fake each plug in whole.
pub struct Lifecycle<S: Directory + PrivilegeAssignor> {
    store: S,
    encoder: CredentialEncoder,
    privilege_group: String,
    purge_home: bool,
}

impl<S: Directory + PrivilegeAssignor> Lifecycle<S> {
    /// Create an orchestrator over a store, elevating via `privilege_group`
    pub fn new(store: S, privilege_group: impl Into<String>) -> Self {
        Self {
            store,
            encoder: CredentialEncoder::new(),
            privilege_group: privilege_group.into(),
            purge_home: true,
        }
    }

    /// Configure whether deletions purge the home directory
    pub fn with_purge_home(mut self, purge_home: bool) -> Self {
        self.purge_home = purge_home;
        self
    }

    /// Direct access to the underlying store
    ///
    /// The documented recovery path after a partial create is to re-run the
    /// grant alone, which is idempotent.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Create an account with the given role and plaintext password
    ///
    /// The plaintext is used once to produce a credential and discarded.
    pub fn create_user(&mut self, username: &str, role: &str, password: &str) -> OperationResult {
        let operation = Operation::Create;

        // Validation happens before any directory contact.
        let role = match role.parse::<Role>() {
            Ok(role) => role,
            Err(e) => return self.fail(username, operation, &e),
        };

        let exists = match self.store.exists(username) {
            Ok(exists) => exists,
            Err(e) => return self.fail(username, operation, &e),
        };
        if exists {
            return self.skip(
                username,
                operation,
                SkipReason::AlreadyExists,
                format!("user '{username}' already exists, skipping creation"),
            );
        }

        let credential = match self.encoder.encode(password) {
            Ok(credential) => credential,
            Err(e) => return self.fail(username, operation, &e),
        };
        if let Err(e) = self.store.add(username, &credential) {
            return self.fail(username, operation, &e);
        }

        if role == Role::Admin {
            if let Err(e) = self.store.grant(username, &self.privilege_group) {
                // The account exists and is usable; a naive create retry
                // would skip on AlreadyExists and never reach the grant.
                let group = &self.privilege_group;
                return self.report(OperationResult {
                    username: username.to_string(),
                    operation,
                    outcome: Outcome::PartiallySucceeded {
                        completed: vec!["add".to_string()],
                        failed: vec!["grant".to_string()],
                    },
                    message: format!(
                        "user '{username}' created but granting '{group}' failed: {e}; \
                         re-run the grant alone to recover"
                    ),
                });
            }
        }

        let message = match role {
            Role::Admin => format!(
                "user '{username}' created with '{}' membership",
                self.privilege_group
            ),
            Role::Standard => format!("user '{username}' created successfully"),
        };
        self.succeed(username, operation, message)
    }

    /// Delete an account
    pub fn delete_user(&mut self, username: &str) -> OperationResult {
        let operation = Operation::Delete;

        let exists = match self.store.exists(username) {
            Ok(exists) => exists,
            Err(e) => return self.fail(username, operation, &e),
        };
        if !exists {
            return self.skip(
                username,
                operation,
                SkipReason::NotFound,
                format!("user '{username}' does not exist, nothing to delete"),
            );
        }

        if let Err(e) = self.store.remove(username, self.purge_home) {
            return self.fail(username, operation, &e);
        }
        self.succeed(
            username,
            operation,
            format!("user '{username}' deleted successfully"),
        )
    }

    /// Apply requested field changes to an account
    ///
    /// Field changes are independent: one failing does not abort the rest.
    /// The rename is applied last so the earlier steps address the
    /// pre-rename identity.
    pub fn update_user(&mut self, username: &str, request: &UpdateRequest) -> OperationResult {
        let operation = Operation::Update;

        // Validation happens before any directory contact.
        let role = match request.role.as_deref().map(str::parse::<Role>).transpose() {
            Ok(role) => role,
            Err(e) => return self.fail(username, operation, &e),
        };

        let exists = match self.store.exists(username) {
            Ok(exists) => exists,
            Err(e) => return self.fail(username, operation, &e),
        };
        if !exists {
            return self.skip(
                username,
                operation,
                SkipReason::NotFound,
                format!("user '{username}' does not exist, nothing to update"),
            );
        }

        if request.is_empty() {
            return self.succeed(
                username,
                operation,
                format!("no changes requested for user '{username}'"),
            );
        }

        let mut completed: Vec<String> = Vec::new();
        let mut failed: Vec<String> = Vec::new();
        let mut causes: Vec<String> = Vec::new();
        let mut first_kind: Option<FailureKind> = None;

        if let Some(password) = &request.password {
            let step = self
                .encoder
                .encode(password)
                .and_then(|credential| self.store.set_credential(username, &credential));
            match step {
                Ok(()) => completed.push("credential".to_string()),
                Err(e) => {
                    failed.push("credential".to_string());
                    first_kind.get_or_insert(failure_kind(&e));
                    causes.push(format!("credential: {e}"));
                }
            }
        }

        if let Some(role) = role {
            let step = match role {
                Role::Admin => self.store.grant(username, &self.privilege_group),
                Role::Standard => self.store.revoke(username, &self.privilege_group),
            };
            match step {
                Ok(()) => completed.push("role".to_string()),
                Err(e) => {
                    failed.push("role".to_string());
                    first_kind.get_or_insert(failure_kind(&e));
                    causes.push(format!("role: {e}"));
                }
            }
        }

        if let Some(new_username) = &request.new_username {
            match self.store.rename(username, new_username) {
                Ok(()) => completed.push("rename".to_string()),
                Err(e) => {
                    failed.push("rename".to_string());
                    first_kind.get_or_insert(failure_kind(&e));
                    causes.push(format!("rename: {e}"));
                }
            }
        }

        if failed.is_empty() {
            let fields = completed.join(", ");
            return self.succeed(
                username,
                operation,
                format!("user '{username}' updated ({fields})"),
            );
        }

        if completed.is_empty() {
            return self.report(OperationResult {
                username: username.to_string(),
                operation,
                outcome: Outcome::Failed {
                    kind: first_kind.unwrap_or(FailureKind::Directory),
                    cause: causes.join("; "),
                },
                message: format!("update of user '{username}' failed: {}", causes.join("; ")),
            });
        }

        let detail = causes.join("; ");
        self.report(OperationResult {
            username: username.to_string(),
            operation,
            outcome: Outcome::PartiallySucceeded { completed, failed },
            message: format!("user '{username}' partially updated: {detail}"),
        })
    }

    fn succeed(&self, username: &str, operation: Operation, message: String) -> OperationResult {
        self.report(OperationResult {
            username: username.to_string(),
            operation,
            outcome: Outcome::Succeeded,
            message,
        })
    }

    fn skip(
        &self,
        username: &str,
        operation: Operation,
        reason: SkipReason,
        message: String,
    ) -> OperationResult {
        self.report(OperationResult {
            username: username.to_string(),
            operation,
            outcome: Outcome::Skipped { reason },
            message,
        })
    }

    fn fail(&self, username: &str, operation: Operation, err: &RosterError) -> OperationResult {
        self.report(OperationResult {
            username: username.to_string(),
            operation,
            outcome: Outcome::Failed {
                kind: failure_kind(err),
                cause: err.to_string(),
            },
            message: format!("{operation} of user '{username}' failed: {err}"),
        })
    }

    /// Emit the result to the structured log sink and hand it back
    fn report(&self, result: OperationResult) -> OperationResult {
        match &result.outcome {
            Outcome::Succeeded => info!(
                username = %result.username,
                operation = %result.operation,
                outcome = %result.outcome,
                "{}", result.message
            ),
            Outcome::Skipped { .. } => warn!(
                username = %result.username,
                operation = %result.operation,
                outcome = %result.outcome,
                "{}", result.message
            ),
            Outcome::PartiallySucceeded { .. } => warn!(
                username = %result.username,
                operation = %result.operation,
                outcome = %result.outcome,
                "{}", result.message
            ),
            Outcome::Failed { .. } => error!(
                username = %result.username,
                operation = %result.operation,
                outcome = %result.outcome,
                "{}", result.message
            ),
        }
        result
    }
}
