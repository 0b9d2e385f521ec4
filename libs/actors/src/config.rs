//! Actor Configuration
//!
//! Enumerates the actor types this process hosts and the class implementing
//! each one. Loaded from TOML with environment-specific overrides, or built from
//! the comma-delimited type/class lists used by sidecar deployments.
//!
//! ```toml
//! [runtime]
//! log_level = "debug"
//! actor_idle_timeout_secs = 600
//!
//! [[actors]]
//! type = "counter"
//! class = "demo.Counter"
//! ```

use crate::{ActorError, Result};
use anyhow::Context;
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Main actor configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ActorConfig {
    /// Type bindings in registration order
    #[serde(default)]
    pub actors: Vec<ActorTypeBinding>,

    /// Runtime settings
    #[serde(default)]
    pub runtime: RuntimeSettings,
}

/// One actor type and its implementing class
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ActorTypeBinding {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(rename = "class")]
    pub class_name: String,
}

/// Process-level runtime settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RuntimeSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Idle period after which `collect_idle_default` deactivates an actor
    pub actor_idle_timeout_secs: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            actor_idle_timeout_secs: None,
        }
    }
}

impl RuntimeSettings {
    pub fn actor_idle_timeout(&self) -> Option<Duration> {
        self.actor_idle_timeout_secs.map(Duration::from_secs)
    }
}

impl ActorTypeBinding {
    pub fn new(type_name: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            class_name: class_name.into(),
        }
    }
}

impl ActorConfig {
    /// Load configuration from files with environment overrides
    ///
    /// Reads `base_path` (default `config/actors.toml`), then
    /// `config/environments/<env>.toml` when present, then `ACTORS__*`
    /// environment variables (e.g. `ACTORS__RUNTIME__LOG_LEVEL=debug`).
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> anyhow::Result<Self> {
        let base = base_path.unwrap_or(Path::new("config/actors.toml"));

        let mut builder = Config::builder().add_source(File::from(base).required(true));

        if let Some(env) = environment {
            let env_file = PathBuf::from("config/environments").join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("ACTORS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        info!(
            actor_types = config.actors.len(),
            path = %base.display(),
            "Loaded actor configuration"
        );
        Ok(config)
    }

    /// Parse an inline TOML document
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(source).context("Failed to parse actor configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Pair two comma-delimited lists by position
    ///
    /// `from_delimited("counter,widget", "demo.Counter,demo.Widget")`
    pub fn from_delimited(type_names: &str, class_names: &str) -> Result<Self> {
        let types = split_list(type_names);
        let classes = split_list(class_names);

        if types.len() != classes.len() {
            return Err(ActorError::configuration(
                format!(
                    "{} actor types but {} actor classes",
                    types.len(),
                    classes.len()
                ),
                Some("actors"),
            ));
        }

        let config = Self {
            actors: types
                .into_iter()
                .zip(classes)
                .map(|(t, c)| ActorTypeBinding::new(t, c))
                .collect(),
            runtime: RuntimeSettings::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Append a binding; a later binding for the same type wins
    pub fn with_actor(mut self, type_name: impl Into<String>, class_name: impl Into<String>) -> Self {
        self.actors.push(ActorTypeBinding::new(type_name, class_name));
        self
    }

    /// Reject empty type or class names
    pub fn validate(&self) -> Result<()> {
        for (index, binding) in self.actors.iter().enumerate() {
            if binding.type_name.trim().is_empty() {
                return Err(ActorError::configuration(
                    format!("actor binding {} has an empty type name", index),
                    Some("type"),
                ));
            }
            if binding.class_name.trim().is_empty() {
                return Err(ActorError::configuration(
                    format!("actor type {} has an empty class name", binding.type_name),
                    Some("class"),
                ));
            }
        }
        Ok(())
    }
}

fn split_list(list: &str) -> Vec<String> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',').map(|s| s.trim().to_string()).collect()
}
