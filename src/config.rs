// SPDX-License-Identifier: GPL-3.0-only
//! Persisted per-monitor state.
//!
//! Carries what a rescan cannot recover from hardware alone, keyed by the
//! stable device id: today that is the brightness range learned in a prior
//! session, which keeps write-only monitors usable across restarts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::monitor::DeviceId;

static STATE_PATH: Lazy<Option<PathBuf>> =
    Lazy::new(|| dirs::config_dir().map(|dir| dir.join("brightctl").join("state.toml")));

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct StoredMonitor {
    pub max_brightness: u16,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct StoredState {
    pub monitors: HashMap<DeviceId, StoredMonitor>,
}

impl StoredState {
    pub fn max_brightness(&self, id: &str) -> Option<u16> {
        self.monitors.get(id).map(|m| m.max_brightness)
    }

    pub fn remember_max(&mut self, id: &str, max_brightness: u16) {
        self.monitors
            .insert(id.to_string(), StoredMonitor { max_brightness });
    }

    /// Load from the default location; any failure degrades to defaults.
    pub fn load() -> Self {
        let Some(path) = STATE_PATH.as_ref() else {
            return Self::default();
        };
        match Self::load_from(path) {
            Ok(state) => state,
            Err(err) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %err, "failed to load stored state, using defaults");
                }
                Self::default()
            }
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Save to the default location.
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = STATE_PATH.as_ref() else {
            anyhow::bail!("no config directory available");
        };
        self.save_to(path)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_toml() {
        let mut state = StoredState::default();
        state.remember_max("ddc-10aca042", 255);
        state.remember_max("ddc-1e6d0777", 100);

        let path =
            std::env::temp_dir().join(format!("brightctl-state-{}.toml", std::process::id()));
        state.save_to(&path).unwrap();
        let loaded = StoredState::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded, state);
        assert_eq!(loaded.max_brightness("ddc-10aca042"), Some(255));
        assert_eq!(loaded.max_brightness("missing"), None);
    }
}
