// SPDX-License-Identifier: AGPL-3.0-or-later
//! Identity directory adapter
//!
//! The sole point of contact with the host's account store. Production use
//! shells out to the standard account-management programs; tests implement
//! the same traits over an in-memory store so the lifecycle state machine
//! can run deterministically without root privilege.

use std::process::Command;

use tracing::{debug, info};

use crate::account::credential::CredentialRef;
use crate::config::DirectoryConfig;
use crate::error::{Result, RosterError};

/// Queries and mutations against the authoritative host account store
pub trait Directory {
    /// Whether an account exists right now
    ///
    /// Always queries the authoritative store; never answered from a cached
    /// listing. A query failure is an error, distinct from `Ok(false)` —
    /// "absent" must never be conflated with "could not determine".
    fn exists(&self, username: &str) -> Result<bool>;

    /// Add an account with an already-encoded credential
    fn add(&mut self, username: &str, credential: &CredentialRef) -> Result<()>;

    /// Remove an account, optionally purging its home directory
    fn remove(&mut self, username: &str, purge_home: bool) -> Result<()>;

    /// Replace an account's stored credential
    fn set_credential(&mut self, username: &str, credential: &CredentialRef) -> Result<()>;

    /// Change an account's login name
    fn rename(&mut self, username: &str, new_username: &str) -> Result<()>;
}

/// Grants and revokes membership in an elevated-privilege group
///
/// Both operations are idempotent: granting an already-held privilege or
/// revoking an unheld one succeeds as a no-op.
pub trait PrivilegeAssignor {
    /// Ensure the account is a member of the privilege group
    fn grant(&mut self, username: &str, group: &str) -> Result<()>;

    /// Ensure the account is not a member of the privilege group
    fn revoke(&mut self, username: &str, group: &str) -> Result<()>;
}

/// Directory adapter backed by the host's account-management programs
///
/// Uses `getent` for existence queries and `useradd`/`userdel`/`usermod`/
/// `gpasswd` for mutations. In dry-run mode mutations are logged and
/// reported as successful without touching the host; existence queries
/// still run, but grant/revoke skip their membership pre-check, since the
/// account it would inspect may only notionally exist.
pub struct HostDirectory {
    create_home: bool,
    shell: String,
    dry_run: bool,
}

impl HostDirectory {
    /// Create an adapter from the `[directory]` configuration section
    pub fn from_config(config: &DirectoryConfig, dry_run: bool) -> Self {
        Self {
            create_home: config.create_home,
            shell: config.shell.clone(),
            dry_run,
        }
    }

    /// Run an account-management program, mapping failure to a directory error
    fn run(&self, operation: &str, username: &str, program: &str, args: &[&str]) -> Result<()> {
        if self.dry_run {
            info!(
                operation,
                username, program, "[DRY RUN] Skipping host mutation"
            );
            return Ok(());
        }

        let output = Command::new(program).args(args).output().map_err(|e| {
            RosterError::Directory {
                operation: operation.to_string(),
                username: username.to_string(),
                message: format!("failed to run {program}: {e}"),
            }
        })?;

        if output.status.success() {
            debug!(operation, username, program, "Host mutation applied");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RosterError::Directory {
                operation: operation.to_string(),
                username: username.to_string(),
                message: format!("{program} exited with {}: {}", output.status, stderr.trim()),
            })
        }
    }

    /// Whether the account currently belongs to the named group
    fn is_member(&self, username: &str, group: &str) -> Result<bool> {
        let output = Command::new("id").args(["-nG", username]).output().map_err(
            |e| RosterError::Directory {
                operation: "membership".to_string(),
                username: username.to_string(),
                message: format!("failed to run id: {e}"),
            },
        )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RosterError::Directory {
                operation: "membership".to_string(),
                username: username.to_string(),
                message: format!("id exited with {}: {}", output.status, stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .any(|g| g == group))
    }
}

impl Directory for HostDirectory {
    fn exists(&self, username: &str) -> Result<bool> {
        let output = Command::new("getent")
            .args(["passwd", username])
            .output()
            .map_err(|e| RosterError::Directory {
                operation: "exists".to_string(),
                username: username.to_string(),
                message: format!("failed to run getent: {e}"),
            })?;

        // getent exits 0 when the key is found and 2 when it is absent;
        // anything else means the store could not be queried.
        match output.status.code() {
            Some(0) => {
                debug!(username, "Account exists");
                Ok(true)
            }
            Some(2) => {
                debug!(username, "Account does not exist");
                Ok(false)
            }
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(RosterError::Directory {
                    operation: "exists".to_string(),
                    username: username.to_string(),
                    message: format!(
                        "getent exited with {}: {}",
                        output.status,
                        stderr.trim()
                    ),
                })
            }
        }
    }

    fn add(&mut self, username: &str, credential: &CredentialRef) -> Result<()> {
        let mut args: Vec<&str> = Vec::new();
        if self.create_home {
            args.push("-m");
        }
        args.extend(["-s", self.shell.as_str(), "-p", credential.as_str(), username]);
        self.run("add", username, "useradd", &args)
    }

    fn remove(&mut self, username: &str, purge_home: bool) -> Result<()> {
        let mut args: Vec<&str> = Vec::new();
        if purge_home {
            args.push("-r");
        }
        args.push(username);
        self.run("remove", username, "userdel", &args)
    }

    fn set_credential(&mut self, username: &str, credential: &CredentialRef) -> Result<()> {
        self.run(
            "set_credential",
            username,
            "usermod",
            &["-p", credential.as_str(), username],
        )
    }

    fn rename(&mut self, username: &str, new_username: &str) -> Result<()> {
        self.run("rename", username, "usermod", &["-l", new_username, username])
    }
}

impl PrivilegeAssignor for HostDirectory {
    fn grant(&mut self, username: &str, group: &str) -> Result<()> {
        if self.dry_run {
            info!(username, group, "[DRY RUN] Skipping privilege grant");
            return Ok(());
        }
        if self.is_member(username, group)? {
            debug!(username, group, "Already a member, nothing to grant");
            return Ok(());
        }
        self.run("grant", username, "gpasswd", &["-a", username, group])
    }

    fn revoke(&mut self, username: &str, group: &str) -> Result<()> {
        if self.dry_run {
            info!(username, group, "[DRY RUN] Skipping privilege revocation");
            return Ok(());
        }
        if !self.is_member(username, group)? {
            debug!(username, group, "Not a member, nothing to revoke");
            return Ok(());
        }
        self.run("revoke", username, "gpasswd", &["-d", username, group])
    }
}

/// In-memory account store for unit tests
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{BTreeMap, BTreeSet};

    use super::{Directory, PrivilegeAssignor};
    use crate::account::credential::CredentialRef;
    use crate::error::{Result, RosterError};

    #[derive(Debug, Clone, Default)]
    pub struct StoredAccount {
        pub credential: String,
        pub groups: BTreeSet<String>,
    }

    /// Deterministic fake store with per-operation failure injection
    #[derive(Debug, Default)]
    pub struct MemoryDirectory {
        pub accounts: BTreeMap<String, StoredAccount>,
        pub fail_exists: bool,
        pub fail_add: bool,
        pub fail_remove: bool,
        pub fail_set_credential: bool,
        pub fail_rename: bool,
        pub fail_grant: bool,
        pub fail_revoke: bool,
        /// Mutating calls in invocation order, e.g. `"add alice"`
        pub journal: Vec<String>,
    }

    impl MemoryDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        fn refused(operation: &str, username: &str) -> RosterError {
            RosterError::Directory {
                operation: operation.to_string(),
                username: username.to_string(),
                message: "refused by test store".to_string(),
            }
        }

        pub fn credential_of(&self, username: &str) -> Option<&str> {
            self.accounts.get(username).map(|a| a.credential.as_str())
        }

        pub fn is_member(&self, username: &str, group: &str) -> bool {
            self.accounts
                .get(username)
                .is_some_and(|a| a.groups.contains(group))
        }
    }

    impl Directory for MemoryDirectory {
        fn exists(&self, username: &str) -> Result<bool> {
            if self.fail_exists {
                return Err(MemoryDirectory::refused("exists", username));
            }
            Ok(self.accounts.contains_key(username))
        }

        fn add(&mut self, username: &str, credential: &CredentialRef) -> Result<()> {
            self.journal.push(format!("add {username}"));
            if self.fail_add {
                return Err(MemoryDirectory::refused("add", username));
            }
            if self.accounts.contains_key(username) {
                return Err(MemoryDirectory::refused("add", username));
            }
            self.accounts.insert(
                username.to_string(),
                StoredAccount {
                    credential: credential.as_str().to_string(),
                    groups: BTreeSet::new(),
                },
            );
            Ok(())
        }

        fn remove(&mut self, username: &str, _purge_home: bool) -> Result<()> {
            self.journal.push(format!("remove {username}"));
            if self.fail_remove {
                return Err(MemoryDirectory::refused("remove", username));
            }
            if self.accounts.remove(username).is_none() {
                return Err(MemoryDirectory::refused("remove", username));
            }
            Ok(())
        }

        fn set_credential(&mut self, username: &str, credential: &CredentialRef) -> Result<()> {
            self.journal.push(format!("set_credential {username}"));
            if self.fail_set_credential {
                return Err(MemoryDirectory::refused("set_credential", username));
            }
            let account = self
                .accounts
                .get_mut(username)
                .ok_or_else(|| MemoryDirectory::refused("set_credential", username))?;
            account.credential = credential.as_str().to_string();
            Ok(())
        }

        fn rename(&mut self, username: &str, new_username: &str) -> Result<()> {
            self.journal.push(format!("rename {username} {new_username}"));
            if self.fail_rename {
                return Err(MemoryDirectory::refused("rename", username));
            }
            if self.accounts.contains_key(new_username) {
                return Err(MemoryDirectory::refused("rename", username));
            }
            let account = self
                .accounts
                .remove(username)
                .ok_or_else(|| MemoryDirectory::refused("rename", username))?;
            self.accounts.insert(new_username.to_string(), account);
            Ok(())
        }
    }

    impl PrivilegeAssignor for MemoryDirectory {
        fn grant(&mut self, username: &str, group: &str) -> Result<()> {
            self.journal.push(format!("grant {username}"));
            if self.fail_grant {
                return Err(MemoryDirectory::refused("grant", username));
            }
            let account = self
                .accounts
                .get_mut(username)
                .ok_or_else(|| MemoryDirectory::refused("grant", username))?;
            account.groups.insert(group.to_string());
            Ok(())
        }

        fn revoke(&mut self, username: &str, group: &str) -> Result<()> {
            self.journal.push(format!("revoke {username}"));
            if self.fail_revoke {
                return Err(MemoryDirectory::refused("revoke", username));
            }
            let account = self
                .accounts
                .get_mut(username)
                .ok_or_else(|| MemoryDirectory::refused("revoke", username))?;
            account.groups.remove(group);
            Ok(())
        }
    }
}
