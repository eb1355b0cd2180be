//! Server configuration and its three-layer resolution.
//!
//! A [`ServiceServer`](crate::ServiceServer) resolves its configuration
//! exactly once, at construction, from three layers:
//!
//! 1. per-instance options (highest precedence)
//! 2. process-wide shared settings (middle)
//! 3. hard-coded defaults (lowest)
//!
//! A key present in a higher layer always wins; absent keys fall through.
//! The resolved [`Settings`] value is handed to the backend factory once
//! and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Fully resolved server configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Server tag, used in lifecycle log lines.
    pub name: String,
    /// Interface the backend binds to.
    pub host: String,
    /// Serve HTTP/2 alongside HTTP/1.1.
    pub http2: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: "podium".to_owned(),
            host: "0.0.0.0".to_owned(),
            http2: true,
        }
    }
}

impl Settings {
    /// Resolves the final configuration from the shared layer and the
    /// per-instance options layer, over the built-in defaults.
    pub fn resolve(shared: &SettingsLayer, options: SettingsLayer) -> Self {
        let mut settings = Self::default();
        shared.clone().apply(&mut settings);
        options.apply(&mut settings);
        settings
    }
}

/// One layer of configuration: every key optional.
///
/// Serde derives let a host framework deserialize the process-wide layer
/// from whatever configuration source it already uses.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SettingsLayer {
    pub name: Option<String>,
    pub host: Option<String>,
    pub http2: Option<bool>,
}

impl SettingsLayer {
    /// Overlays the keys present in this layer onto `settings`.
    fn apply(self, settings: &mut Settings) {
        if let Some(name) = self.name {
            settings.name = name;
        }
        if let Some(host) = self.host {
            settings.host = host;
        }
        if let Some(http2) = self.http2 {
            settings.http2 = http2;
        }
    }
}
