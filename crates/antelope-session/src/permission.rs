use crate::name::{Name, NameError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when building a [PermissionLevel]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// Missing `@` separator
    #[error("Permission level '{0}' must be formatted as actor@permission")]
    Format(String),

    /// The actor is the empty name
    #[error("Permission level actor must not be empty")]
    EmptyActor,

    /// One of the two names is invalid
    #[error(transparent)]
    Name(#[from] NameError),
}

/// An `(actor, permission)` pair authorizing a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionLevel {
    /// Account holding the authority
    pub actor: Name,
    /// Permission name on that account
    pub permission: Name,
}

impl PermissionLevel {
    /// Creates a permission level, rejecting an empty actor
    pub fn new(actor: Name, permission: Name) -> Result<Self, PermissionError> {
        if actor.is_empty() {
            return Err(PermissionError::EmptyActor);
        }
        Ok(Self { actor, permission })
    }

    /// The `active` authority of `actor`
    pub fn active(actor: Name) -> Result<Self, PermissionError> {
        Self::new(actor, Name::ACTIVE)
    }
}

impl FromStr for PermissionLevel {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (actor, permission) = s
            .split_once('@')
            .ok_or_else(|| PermissionError::Format(s.to_string()))?;
        Self::new(actor.parse()?, permission.parse()?)
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_permission() {
        let level = PermissionLevel::active("alice".parse().unwrap()).unwrap();
        assert_eq!(level.to_string(), "alice@active");
    }

    #[test]
    fn test_parse() {
        let level: PermissionLevel = "bob@owner".parse().unwrap();
        assert_eq!(level.actor.to_string(), "bob");
        assert_eq!(level.permission.to_string(), "owner");
    }

    #[test]
    fn test_empty_actor_rejected() {
        assert_eq!(
            PermissionLevel::active(Name::default()),
            Err(PermissionError::EmptyActor)
        );
        assert_eq!("@active".parse::<PermissionLevel>(), Err(PermissionError::EmptyActor));
        assert!(matches!("alice".parse::<PermissionLevel>(), Err(PermissionError::Format(_))));
    }
}
