//! Tree engine configuration
//!
//! One [`TreeConfig`] is handed to every tree view and to the move processor.
//! All fields use `#[serde(default)]`, so a config file only needs to name the
//! values it changes and files written by older versions keep loading.
//!
//! # Sources
//!
//! 1. Defaults ([`TreeConfig::default`])
//! 2. JSON file ([`TreeConfig::load`]); a missing file yields the defaults
//! 3. Environment ([`TreeConfig::apply_env_overrides`]):
//!    - `ARBOR_MAX_DEPTH` - a positive integer, or `none` to disable the limit
//!    - `ARBOR_AUTO_SAVE` - `true`/`false` (also `1`/`0`)
//!
//! # Examples
//!
//! ```rust
//! use arbor_core::config::TreeConfig;
//!
//! let config: TreeConfig = serde_json::from_str(r#"{"maxDepth": 4, "autoSave": false}"#).unwrap();
//! assert_eq!(config.max_depth, Some(4));
//! assert!(config.default_expanded);
//! assert!(config.validate().is_ok());
//! ```

use crate::client::SaveMode;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

pub const ENV_MAX_DEPTH: &str = "ARBOR_MAX_DEPTH";
pub const ENV_AUTO_SAVE: &str = "ARBOR_AUTO_SAVE";

/// Default nesting limit (levels 0..=9 usable)
pub const DEFAULT_MAX_DEPTH: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeConfig {
    /// Nesting limit for combine moves; `None` disables the check
    pub max_depth: Option<u32>,

    /// `true` persists every drop immediately, `false` stages drops until Save
    pub auto_save: bool,

    /// Expand state reported for nodes that were never toggled
    pub default_expanded: bool,

    /// Whether nodes can be collapsed at all
    pub collapsible: bool,

    pub hitbox: HitboxConfig,

    pub indicator: IndicatorMetrics,

    /// Wait between a persisted move and refreshing the view from the store
    pub settle_delay_ms: u64,

    /// Re-check acyclicity and depth against the stored tree before each move
    pub revalidate_moves: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(DEFAULT_MAX_DEPTH),
            auto_save: true,
            default_expanded: true,
            collapsible: true,
            hitbox: HitboxConfig::default(),
            indicator: IndicatorMetrics::default(),
            settle_delay_ms: 50,
            revalidate_moves: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HitboxConfig {
    /// Height of the before/after bands as a fraction of the row
    pub edge_fraction: f32,
}

impl Default for HitboxConfig {
    fn default() -> Self {
        Self {
            edge_fraction: 1.0 / 3.0,
        }
    }
}

/// Drop indicator geometry, in the host's layout units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IndicatorMetrics {
    /// Inset of the dashed outline drawn for combine
    pub combine_inset: f32,
    /// Thickness of before/after lines and of the outline border
    pub line_thickness: f32,
    /// Distance of the before line above the target's top edge
    pub before_offset: f32,
    /// Distance of the after line below the target's bottom edge
    pub after_offset: f32,
    /// Corner radius of the combine outline
    pub outline_radius: f32,
}

impl Default for IndicatorMetrics {
    fn default() -> Self {
        Self {
            combine_inset: 4.0,
            line_thickness: 3.0,
            before_offset: 6.0,
            after_offset: 3.0,
            outline_radius: 8.0,
        }
    }
}

impl TreeConfig {
    /// Load from a JSON file, falling back to defaults when it does not exist
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!("No tree config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read tree config {:?}", path))?;
        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse tree config {:?}", path))?;

        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid tree config {:?}: {}", path, e))?;
        Ok(config)
    }

    /// Apply `ARBOR_*` environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), String> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), String> {
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            let raw = raw.trim();
            self.max_depth = if raw.eq_ignore_ascii_case("none") || raw.is_empty() {
                None
            } else {
                Some(
                    raw.parse::<u32>()
                        .map_err(|e| format!("{} must be a number or 'none': {}", ENV_MAX_DEPTH, e))?,
                )
            };
        }

        if let Some(raw) = lookup(ENV_AUTO_SAVE) {
            self.auto_save = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => return Err(format!("{} must be true or false, got '{}'", ENV_AUTO_SAVE, other)),
            };
        }

        self.validate()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == Some(0) {
            return Err("max_depth must be greater than 0 (use null to disable)".to_string());
        }

        let fraction = self.hitbox.edge_fraction;
        if !(fraction > 0.0 && fraction <= 0.5) {
            return Err(format!(
                "hitbox.edge_fraction must be in (0, 0.5], got {}",
                fraction
            ));
        }

        let metrics = &self.indicator;
        for (name, value) in [
            ("combine_inset", metrics.combine_inset),
            ("line_thickness", metrics.line_thickness),
            ("before_offset", metrics.before_offset),
            ("after_offset", metrics.after_offset),
            ("outline_radius", metrics.outline_radius),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("indicator.{} must be a non-negative number", name));
            }
        }

        Ok(())
    }

    pub fn save_mode(&self) -> SaveMode {
        if self.auto_save {
            SaveMode::Immediate
        } else {
            SaveMode::Batched
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
