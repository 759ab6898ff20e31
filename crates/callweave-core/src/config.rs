//! Composer configuration.
//!
//! Sources, lowest to highest precedence: `Default`, a JSON document
//! (deserialised by the embedder), the environment (`apply_env`), and
//! explicit overrides set on the struct afterwards.

use serde::{Deserialize, Serialize};

/// Enables the spreading synthesizer above the static shape table.
pub const DYNAMIC_SHAPES_ENV: &str = "CALLWEAVE_DYNAMIC_SHAPES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComposerConfig {
    /// Serve arities above the static table with `SpreadingSynthesizer`.
    pub dynamic_shapes: bool,
    /// Intern every result type in the composer's `TypeTable`.
    pub intern_types: bool,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            dynamic_shapes: false,
            intern_types: true,
        }
    }
}

impl ComposerConfig {
    /// Overlay settings found in the process environment.
    pub fn apply_env(mut self) -> Self {
        if let Some(enabled) = std::env::var(DYNAMIC_SHAPES_ENV)
            .ok()
            .and_then(|value| parse_flag(&value))
        {
            self.dynamic_shapes = enabled;
        }
        self
    }
}

/// `1|true|yes|on` and `0|false|no|off`, case-insensitive.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
