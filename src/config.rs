use alloc::string::{String, ToString};

use serde::Deserialize;

use crate::path::PathPolicy;

/// Mount-time settings. Every field is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MountConfig {
    pub fs_name: String,
    pub allow_other: bool,
    pub auto_unmount: bool,
    pub attr_ttl_ms: u64,
    pub policy: PathPolicy,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            fs_name: "alphanumfs".to_string(),
            allow_other: false,
            auto_unmount: false,
            attr_ttl_ms: 1000,
            policy: PathPolicy::Strict,
        }
    }
}

impl MountConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
