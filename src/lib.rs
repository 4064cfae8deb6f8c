// SPDX-License-Identifier: AGPL-3.0-or-later
//! Roster: user-account lifecycle administration for managed hosts
//!
//! Provisions, modifies, and retires operating-system user accounts on a
//! single host, including bulk provisioning from a CSV record source, with
//! role-based privilege elevation.
//!
//! # Features
//!
//! * **Lifecycle state machine:** create / delete / update with typed
//!   outcomes (succeeded, skipped, partially succeeded, failed)
//! * **Batch import:** per-record failure isolation over an ordered CSV
//!   source, reported in source order
//! * **Pluggable account store:** production shells out to the host's
//!   account-management programs; tests run against an in-memory store

pub mod account;
pub mod config;
pub mod error;

pub use account::{BatchReport, Lifecycle, OperationResult, Outcome, Role};
pub use config::Config;
pub use error::{Result, RosterError};
