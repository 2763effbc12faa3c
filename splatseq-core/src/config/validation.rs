//! Settings validation.
//!
//! Range checks on the tunable quality parameters, processing resolution
//! snapping, and detection of edits to checkpoint-coupled architecture keys.

use super::{
    MAX_PROCESSING_RESOLUTION, MIN_PROCESSING_RESOLUTION, PROCESSING_PATCH_SIZE, Settings,
};
use crate::error::{CoreError, CoreResult};
use serde_json::Value;

/// Architecture keys that must match the predictor's trained checkpoint.
pub const CHECKPOINT_COUPLED_KEYS: &[&str] = &[
    "initializer_stride",
    "initializer_num_layers",
    "gaussian_decoder_stride",
    "num_monodepth_layers",
    "alignment_steps",
    "alignment_base_width",
];

/// A checkpoint-coupled key whose value differs from the default.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointDeviation {
    pub key: &'static str,
    pub default: Value,
    pub current: Value,
}

impl Settings {
    /// Checks that tunable parameters are in range.
    pub fn validate(&self) -> CoreResult<()> {
        if !(MIN_PROCESSING_RESOLUTION..=MAX_PROCESSING_RESOLUTION)
            .contains(&self.processing_resolution)
        {
            return Err(CoreError::Settings(format!(
                "processing_resolution must be between {} and {}, got {}",
                MIN_PROCESSING_RESOLUTION, MAX_PROCESSING_RESOLUTION, self.processing_resolution
            )));
        }
        if !self.min_scale.is_finite() || self.min_scale < 0.0 {
            return Err(CoreError::Settings(format!(
                "min_scale must be non-negative, got {}",
                self.min_scale
            )));
        }
        if !self.max_scale.is_finite() || self.max_scale <= self.min_scale {
            return Err(CoreError::Settings(format!(
                "max_scale ({}) must be greater than min_scale ({})",
                self.max_scale, self.min_scale
            )));
        }
        if !self.low_pass_filter_eps.is_finite() || self.low_pass_filter_eps < 0.0 {
            return Err(CoreError::Settings(format!(
                "low_pass_filter_eps must be non-negative, got {}",
                self.low_pass_filter_eps
            )));
        }
        if !self.initializer_base_depth.is_finite() || self.initializer_base_depth <= 0.0 {
            return Err(CoreError::Settings(format!(
                "initializer_base_depth must be positive, got {}",
                self.initializer_base_depth
            )));
        }
        if self.initializer_stride == 0 {
            return Err(CoreError::Settings(
                "initializer_stride must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Processing resolution snapped to a multiple of the encoder patch size.
    ///
    /// The value is clamped into the accepted range, then rounded to the
    /// nearest multiple of 384 that is still inside the range. The flag is
    /// true when the result differs from the stored value.
    #[must_use]
    pub fn effective_processing_resolution(&self) -> (u32, bool) {
        let clamped = self
            .processing_resolution
            .clamp(MIN_PROCESSING_RESOLUTION, MAX_PROCESSING_RESOLUTION);
        let patch = PROCESSING_PATCH_SIZE;
        let mut snapped = ((clamped + patch / 2) / patch) * patch;
        if snapped < MIN_PROCESSING_RESOLUTION {
            snapped += patch;
        }
        let snapped = snapped.min(MAX_PROCESSING_RESOLUTION);
        (snapped, snapped != self.processing_resolution)
    }

    /// Lists checkpoint-coupled keys that were changed from their defaults.
    ///
    /// The values are still forwarded as-is; callers only warn.
    #[must_use]
    pub fn checkpoint_deviations(&self) -> Vec<CheckpointDeviation> {
        let defaults = Settings::default().to_map();
        let current = self.to_map();
        CHECKPOINT_COUPLED_KEYS
            .iter()
            .filter_map(|&key| {
                let default = defaults.get(key)?;
                let value = current.get(key)?;
                (default != value).then(|| CheckpointDeviation {
                    key,
                    default: default.clone(),
                    current: value.clone(),
                })
            })
            .collect()
    }
}
