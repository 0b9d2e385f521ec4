//! Actor Identity
//!
//! The (type, id) pair that names exactly one actor instance in this process.

use crate::{ActorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique actor identifier within a process
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorIdentity {
    actor_type: String,
    actor_id: String,
}

impl ActorIdentity {
    /// Create a validated identity; both parts must be non-empty
    pub fn new(actor_type: impl Into<String>, actor_id: impl Into<String>) -> Result<Self> {
        let actor_type = actor_type.into();
        let actor_id = actor_id.into();

        if actor_type.is_empty() {
            return Err(ActorError::invalid_identity("actor type must not be empty"));
        }
        if actor_id.is_empty() {
            return Err(ActorError::invalid_identity(format!(
                "actor id must not be empty (type {})",
                actor_type
            )));
        }

        Ok(Self {
            actor_type,
            actor_id,
        })
    }

    /// Parse the `type/id` display form
    ///
    /// The split happens at the first `/`, so ids may themselves contain slashes.
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((actor_type, actor_id)) => Self::new(actor_type, actor_id),
            None => Err(ActorError::invalid_identity(format!(
                "expected 'type/id', got '{}'",
                s
            ))),
        }
    }

    /// Actor type name
    pub fn actor_type(&self) -> &str {
        &self.actor_type
    }

    /// Instance id within the type
    pub fn actor_id(&self) -> &str {
        &self.actor_id
    }
}

impl fmt::Display for ActorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.actor_id)
    }
}
