//! Engine configuration.

use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for an arrangement session.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrangeConfig {
    /// Minimum gap between any two objects and between an object and the plate edge.
    pub margin: f64,

    /// Overall session deadline in milliseconds (0 = unlimited).
    pub time_limit_ms: u64,

    /// Work allowed per call to the step function, in milliseconds.
    pub slice_ms: u64,

    /// Lattice step of the candidate search. `None` derives it from the margin and object sizes.
    pub search_step: Option<f64>,

    /// Upper bound on full passes over all objects before giving up.
    pub max_passes: u32,
}

impl Default for ArrangeConfig {
    fn default() -> Self {
        Self {
            margin: 10.0,
            time_limit_ms: 5000,
            slice_ms: 500,
            search_step: None,
            max_passes: 64,
        }
    }
}

impl ArrangeConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the separation margin.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Sets the session time limit in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Sets the per-call slice in milliseconds.
    pub fn with_slice(mut self, ms: u64) -> Self {
        self.slice_ms = ms;
        self
    }

    /// Fixes the candidate lattice step.
    pub fn with_search_step(mut self, step: f64) -> Self {
        self.search_step = Some(step);
        self
    }

    /// Sets the maximum number of passes.
    pub fn with_max_passes(mut self, passes: u32) -> Self {
        self.max_passes = passes.max(1);
        self
    }

    /// Checks that every value is usable.
    pub fn validate(&self) -> Result<()> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "margin must be finite and non-negative, got {}",
                self.margin
            )));
        }
        if let Some(step) = self.search_step {
            if !step.is_finite() || step <= 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "search step must be positive, got {}",
                    step
                )));
            }
        }
        if self.max_passes == 0 {
            return Err(Error::InvalidConfig("max_passes must be at least 1".into()));
        }
        Ok(())
    }
}

/// Configuration for the pairwise collision engine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionConfig {
    /// Budget per run in milliseconds (0 = unlimited).
    pub time_limit_ms: u64,

    /// Deliver a partial snapshot after each completed row of pairs.
    pub report_every_row: bool,

    /// Resolve pairs with disjoint bounding boxes without the triangle test.
    pub bounds_prefilter: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 0,
            report_every_row: true,
            bounds_prefilter: true,
        }
    }
}

impl CollisionConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-run time limit in milliseconds.
    pub fn with_time_limit(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    /// Enables or disables per-row partial reports.
    pub fn with_row_reports(mut self, enabled: bool) -> Self {
        self.report_every_row = enabled;
        self
    }

    /// Enables or disables the bounding-box short-circuit.
    pub fn with_bounds_prefilter(mut self, enabled: bool) -> Self {
        self.bounds_prefilter = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrange_config_defaults() {
        let config = ArrangeConfig::default();
        assert_eq!(config.margin, 10.0);
        assert_eq!(config.time_limit_ms, 5000);
        assert_eq!(config.slice_ms, 500);
        assert!(config.search_step.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_arrange_config_builder() {
        let config = ArrangeConfig::new()
            .with_margin(5.0)
            .with_time_limit(1000)
            .with_slice(50)
            .with_search_step(2.5)
            .with_max_passes(0);

        assert_eq!(config.margin, 5.0);
        assert_eq!(config.time_limit_ms, 1000);
        assert_eq!(config.slice_ms, 50);
        assert_eq!(config.search_step, Some(2.5));
        assert_eq!(config.max_passes, 1);
    }

    #[test]
    fn test_arrange_config_rejects_bad_values() {
        assert!(ArrangeConfig::new().with_margin(-1.0).validate().is_err());
        assert!(ArrangeConfig::new()
            .with_margin(f64::NAN)
            .validate()
            .is_err());
        assert!(ArrangeConfig::new()
            .with_search_step(0.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_collision_config_builder() {
        let config = CollisionConfig::new()
            .with_time_limit(250)
            .with_row_reports(false)
            .with_bounds_prefilter(false);
        assert_eq!(config.time_limit_ms, 250);
        assert!(!config.report_every_row);
        assert!(!config.bounds_prefilter);
    }
}
