//! Server configuration: the known accounts and the commentable entity types.
//!
//! Read from a TOML file:
//!
//! ```toml
//! [[users]]
//! uid = "alice"
//! display_name = "Alice Liddell"
//!
//! [[entity_types]]
//! name = "files"
//! object_ids = ["42", "43"]   # omit to accept any non-empty id
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use commentdav_dav::EntityTypeRegistry;
use commentdav_model::{User, UserDirectory};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub uid: String,
    /// Defaults to the uid.
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeEntry {
    pub name: String,
    #[serde(default)]
    pub object_ids: Option<Vec<String>>,
}

/// Configuration parsed from `commentdav.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub users: Vec<UserEntry>,
    #[serde(default = "default_entity_types")]
    pub entity_types: Vec<EntityTypeEntry>,
}

fn default_entity_types() -> Vec<EntityTypeEntry> {
    vec![EntityTypeEntry {
        name: "files".to_string(),
        object_ids: None,
    }]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            entity_types: default_entity_types(),
        }
    }
}

impl ServerConfig {
    /// Loads the configuration at `path`. A missing file yields the
    /// defaults; an unreadable or malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path:?}"))?;
        let config = Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file {path:?}"))?;
        info!(
            users = config.users.len(),
            entity_types = config.entity_types.len(),
            "Loaded config from {:?}",
            path
        );
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// The configured accounts.
    pub fn directory(&self) -> ConfiguredUsers {
        let users = self
            .users
            .iter()
            .map(|entry| {
                let display_name = entry.display_name.clone().unwrap_or_else(|| entry.uid.clone());
                (entry.uid.clone(), User::new(entry.uid.clone(), display_name))
            })
            .collect();
        ConfiguredUsers(users)
    }

    /// A registry holding every configured entity type.
    pub fn registry(&self) -> EntityTypeRegistry {
        let mut registry = EntityTypeRegistry::new();
        for entry in &self.entity_types {
            match &entry.object_ids {
                Some(ids) => {
                    let ids: HashSet<String> = ids.iter().cloned().collect();
                    registry.register_entity_type(entry.name.clone(), move |id: &str| {
                        ids.contains(id)
                    });
                }
                None => registry.register_entity_type(entry.name.clone(), |id: &str| !id.is_empty()),
            }
        }
        registry
    }
}

/// Accounts from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredUsers(HashMap<String, User>);

impl UserDirectory for ConfiguredUsers {
    fn get(&self, uid: &str) -> Option<User> {
        self.0.get(uid).cloned()
    }
}
