//! Actor Runtime Error Types
//!
//! Error taxonomy for identity validation, type table construction, instance
//! lifecycle and method invocation.

use thiserror::Error;

/// Boxed error carried as the source of hook and method failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main actor runtime error type
#[derive(Error, Debug)]
pub enum ActorError {
    /// Malformed (type, id) pair supplied by the caller
    #[error("Invalid actor identity: {message}")]
    InvalidIdentity { message: String },

    /// No type descriptor registered for the requested actor type
    #[error("Unknown actor type: {actor_type}")]
    UnknownActorType { actor_type: String },

    /// The actor type exists but exposes no method with this name
    #[error("Unknown method '{method}' on actor type {actor_type}")]
    UnknownMethod { actor_type: String, method: String },

    /// Implementing class name could not be resolved at startup
    #[error("Cannot resolve class '{class_name}' for actor type {actor_type}")]
    TypeResolution {
        actor_type: String,
        class_name: String,
    },

    /// More than one activate or deactivate hook candidate on a class
    #[error("Ambiguous {role} hook on class '{class_name}': {candidates:?}")]
    AmbiguousLifecycleHook {
        class_name: String,
        role: &'static str,
        candidates: Vec<String>,
    },

    /// Construction or activate hook failed; the identity stays absent
    #[error("Activation of {actor} failed: {source}")]
    Activation { actor: String, source: BoxError },

    /// Deactivate hook failed; the entry was removed regardless
    #[error("Deactivation of {actor} failed: {source}")]
    Deactivation { actor: String, source: BoxError },

    /// A remote method returned an error
    #[error("Method '{method}' on {actor} failed: {source}")]
    Invocation {
        actor: String,
        method: String,
        source: BoxError,
    },

    /// The instance was deactivated before the invocation acquired it
    #[error("Actor {actor} has been deactivated")]
    Deactivated { actor: String },

    /// Method handle of one actor type applied to an instance of another
    #[error("Method of type {expected} cannot be invoked on {actor}")]
    WrongActorType { actor: String, expected: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },
}

/// Result type alias for actor runtime operations
pub type Result<T> = std::result::Result<T, ActorError>;

impl ActorError {
    /// Create an invalid identity error
    pub fn invalid_identity(message: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            message: message.into(),
        }
    }

    /// Create an unknown actor type error
    pub fn unknown_actor_type(actor_type: impl Into<String>) -> Self {
        Self::UnknownActorType {
            actor_type: actor_type.into(),
        }
    }

    /// Create an unknown method error
    pub fn unknown_method(actor_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self::UnknownMethod {
            actor_type: actor_type.into(),
            method: method.into(),
        }
    }

    /// Create a type resolution error
    pub fn type_resolution(actor_type: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self::TypeResolution {
            actor_type: actor_type.into(),
            class_name: class_name.into(),
        }
    }

    /// Create an activation error wrapping the hook or constructor failure
    pub fn activation(actor: impl ToString, source: impl Into<BoxError>) -> Self {
        Self::Activation {
            actor: actor.to_string(),
            source: source.into(),
        }
    }

    /// Create a deactivation error wrapping the hook failure
    pub fn deactivation(actor: impl ToString, source: impl Into<BoxError>) -> Self {
        Self::Deactivation {
            actor: actor.to_string(),
            source: source.into(),
        }
    }

    /// Create an invocation error wrapping the method failure
    pub fn invocation(
        actor: impl ToString,
        method: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Invocation {
            actor: actor.to_string(),
            method: method.into(),
            source: source.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            field: field.map(|s| s.to_string()),
        }
    }

    /// Error class used by gateways to pick a response
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidIdentity { .. } | Self::WrongActorType { .. } => "caller",
            Self::UnknownActorType { .. } | Self::UnknownMethod { .. } => "routing",
            Self::TypeResolution { .. }
            | Self::AmbiguousLifecycleHook { .. }
            | Self::Configuration { .. } => "startup",
            Self::Activation { .. } | Self::Invocation { .. } | Self::Deactivated { .. } => {
                "instance"
            }
            Self::Deactivation { .. } => "cleanup",
        }
    }

    /// True for configuration defects that must stop the process from serving
    pub fn is_startup_fatal(&self) -> bool {
        self.category() == "startup"
    }

    /// True when the caller may simply retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Activation { .. } | Self::Deactivated { .. })
    }
}
