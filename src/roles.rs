//! Roles and the permission gate.
//!
//! Roles form a total order; a command requires a minimum role and the
//! gate is an explicit [`RoleStore::require`] call at the top of each
//! handler. Assignments persist as a flat JSON map of user id to role
//! name, rewritten wholesale on every change.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::UserId;

/// Caller role, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Default for unknown users.
    Unverified,
    /// Verified member.
    Verified,
    /// Trusted member.
    Trusted,
    /// Administrator.
    Admin,
    /// Guild owner.
    Owner,
}

impl Role {
    fn name(self) -> &'static str {
        match self {
            Role::Unverified => "UNVERIFIED",
            Role::Verified => "VERIFIED",
            Role::Trusted => "TRUSTED",
            Role::Admin => "ADMIN",
            Role::Owner => "OWNER",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UNVERIFIED" => Ok(Role::Unverified),
            "VERIFIED" => Ok(Role::Verified),
            "TRUSTED" => Ok(Role::Trusted),
            "ADMIN" => Ok(Role::Admin),
            "OWNER" => Ok(Role::Owner),
            _ => Err(RoleError::UnknownRole(s.to_string())),
        }
    }
}

/// Role store errors.
#[derive(Debug, Error)]
pub enum RoleError {
    /// A role name did not match any member of [`Role`].
    #[error("'{0}' is not a valid role name")]
    UnknownRole(String),

    /// The store file could not be read or written.
    #[error("role store {path}: {source}")]
    Io {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The store file exists but is not valid JSON.
    #[error("role store {path} is malformed: {source}")]
    Malformed {
        /// Path of the store file.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Raised when a caller's role is below a command's minimum.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("requires {required} or higher, caller has {actual}")]
pub struct PermissionError {
    /// The minimum role the command requires.
    pub required: Role,
    /// The caller's resolved role.
    pub actual: Role,
}

/// File-backed role assignments.
#[derive(Debug)]
pub struct RoleStore {
    path: PathBuf,
    assignments: HashMap<String, Role>,
}

impl RoleStore {
    /// Load assignments from a JSON file; a missing file is an empty store.
    pub fn load(path: &Path) -> Result<Self, RoleError> {
        let assignments = match fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| RoleError::Malformed {
                path: path.to_path_buf(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(source) => {
                return Err(RoleError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            assignments,
        })
    }

    /// Rewrite the store file from the in-memory assignments.
    pub fn save(&self) -> Result<(), RoleError> {
        let io_err = |source| RoleError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let body = serde_json::to_string_pretty(&self.assignments).map_err(|source| {
            RoleError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;
        fs::write(&self.path, body).map_err(io_err)
    }

    /// Resolve a user's role; unknown users are [`Role::Unverified`].
    pub fn role_of(&self, user: UserId) -> Role {
        self.assignments
            .get(&user.0.to_string())
            .copied()
            .unwrap_or(Role::Unverified)
    }

    /// Validate and set a user's role, persisting immediately.
    pub fn assign(&mut self, user: UserId, role_name: &str) -> Result<Role, RoleError> {
        let role: Role = role_name.parse()?;
        self.assignments.insert(user.0.to_string(), role);
        self.save()?;
        Ok(role)
    }

    /// The permission gate: pass iff the caller's role is at least `minimum`.
    pub fn require(&self, user: UserId, minimum: Role) -> Result<(), PermissionError> {
        let actual = self.role_of(user);
        if actual >= minimum {
            Ok(())
        } else {
            Err(PermissionError {
                required: minimum,
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_totally_ordered() {
        assert!(Role::Unverified < Role::Verified);
        assert!(Role::Verified < Role::Trusted);
        assert!(Role::Trusted < Role::Admin);
        assert!(Role::Admin < Role::Owner);
    }

    #[test]
    fn unknown_users_are_unverified() {
        let dir = tempfile::tempdir().unwrap();
        let store = RoleStore::load(&dir.path().join("roles.json")).unwrap();
        assert_eq!(store.role_of(UserId(42)), Role::Unverified);
    }

    #[test]
    fn assign_persists_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roles.json");

        let mut store = RoleStore::load(&path).unwrap();
        store.assign(UserId(42), "admin").unwrap();
        store.assign(UserId(7), "OWNER").unwrap();

        let reloaded = RoleStore::load(&path).unwrap();
        assert_eq!(reloaded.role_of(UserId(42)), Role::Admin);
        assert_eq!(reloaded.role_of(UserId(7)), Role::Owner);
    }

    #[test]
    fn assign_rejects_unknown_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RoleStore::load(&dir.path().join("roles.json")).unwrap();
        assert!(matches!(
            store.assign(UserId(42), "SUPREME"),
            Err(RoleError::UnknownRole(_))
        ));
    }

    #[test]
    fn require_checks_the_total_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RoleStore::load(&dir.path().join("roles.json")).unwrap();
        store.assign(UserId(1), "TRUSTED").unwrap();

        assert!(store.require(UserId(1), Role::Verified).is_ok());
        assert!(store.require(UserId(1), Role::Trusted).is_ok());
        assert_eq!(
            store.require(UserId(1), Role::Owner),
            Err(PermissionError {
                required: Role::Owner,
                actual: Role::Trusted,
            })
        );
    }
}
