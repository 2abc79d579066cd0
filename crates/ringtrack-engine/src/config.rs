//! Tracker configuration.
//!
//! [`TrackerConfig`] selects the backend and the global aperture, and is
//! loadable from TOML:
//!
//! ```toml
//! global_xy_limit = 0.5
//! aperture_policy = "all_elements"
//! save_source_as = "kernel.c"
//!
//! [backend]
//! kind = "cpu_threaded"
//! threads = 8
//!
//! [arena]
//! max_capacity = 1048576
//! ```

use std::path::PathBuf;

use ringtrack_arena::ArenaConfig;
use ringtrack_core::{ApertureCheckPolicy, Backend, ConfigError};
use serde::{Deserialize, Serialize};

/// How a [`Tracker`](crate::Tracker) builds and runs its kernel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Where the kernel runs. Default: [`Backend::CpuSerial`].
    pub backend: Backend,
    /// Half-width of the global rectangular aperture in `x` and `y` \[m\].
    /// Default: 1.0.
    pub global_xy_limit: f64,
    /// Which elements are preceded by the global aperture check.
    /// Default: drifts only.
    pub aperture_policy: ApertureCheckPolicy,
    /// Write the generated kernel source here whenever a kernel is
    /// compiled.
    pub save_source_as: Option<PathBuf>,
    /// Arena holding the element data.
    pub arena: ArenaConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            global_xy_limit: Self::DEFAULT_GLOBAL_XY_LIMIT,
            aperture_policy: ApertureCheckPolicy::default(),
            save_source_as: None,
            arena: ArenaConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Default global aperture half-width \[m\].
    pub const DEFAULT_GLOBAL_XY_LIMIT: f64 = 1.0;

    /// Defaults on `backend`.
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    /// Set the global aperture half-width.
    pub fn with_global_xy_limit(mut self, limit: f64) -> Self {
        self.global_xy_limit = limit;
        self
    }

    /// Set the aperture policy.
    pub fn with_aperture_policy(mut self, policy: ApertureCheckPolicy) -> Self {
        self.aperture_policy = policy;
        self
    }

    /// Persist generated source to `path`.
    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_source_as = Some(path.into());
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.global_xy_limit.is_finite() && self.global_xy_limit > 0.0) {
            return Err(ConfigError::InvalidConfig {
                reason: format!(
                    "global_xy_limit must be finite and positive, got {}",
                    self.global_xy_limit
                ),
            });
        }
        self.arena
            .validate()
            .map_err(|reason| ConfigError::InvalidConfig {
                reason: format!("arena: {reason}"),
            })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}
