//! Configuration structures and constants for the splatseq-core library.
//!
//! `Settings` is the strongly typed form of the flat settings document that
//! parametrizes predictor construction and export behavior. Field names are
//! the document keys. Loading is lenient (see [`store`]); validation and the
//! checkpoint-coupling checks live in [`validation`].

pub mod store;
pub mod validation;

use crate::error::CoreError;
use crate::ply::PlyEncoding;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// Default constants

/// Square working resolution handed to the predictor.
pub const DEFAULT_PROCESSING_RESOLUTION: u32 = 1536;

/// Patch edge of the predictor's encoder; processing resolutions snap to multiples of it.
pub const PROCESSING_PATCH_SIZE: u32 = 384;

/// Smallest accepted processing resolution.
pub const MIN_PROCESSING_RESOLUTION: u32 = 512;

/// Largest accepted processing resolution.
pub const MAX_PROCESSING_RESOLUTION: u32 = 6144;

/// Field of view assumed when no focal length is supplied.
pub const DEFAULT_FOV_DEGREES: f64 = 50.0;

pub const DEFAULT_LOW_PASS_FILTER_EPS: f64 = 0.001;
pub const DEFAULT_MIN_SCALE: f64 = 0.0;
pub const DEFAULT_MAX_SCALE: f64 = 10.0;
pub const DEFAULT_INITIALIZER_BASE_DEPTH: f64 = 10.0;

/// Compute device requested for the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Let the predictor pick the best available device.
    #[default]
    Default,
    Cuda,
    Cpu,
    Mps,
}

impl Device {
    pub const fn as_str(self) -> &'static str {
        match self {
            Device::Default => "default",
            Device::Cuda => "cuda",
            Device::Cpu => "cpu",
            Device::Mps => "mps",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "default" => Ok(Device::Default),
            "cuda" => Ok(Device::Cuda),
            "cpu" => Ok(Device::Cpu),
            "mps" => Ok(Device::Mps),
            other => Err(CoreError::Settings(format!(
                "Unknown device '{other}' (expected default, cuda, cpu or mps)"
            ))),
        }
    }
}

/// Color space of predicted Gaussian colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    #[default]
    #[serde(rename = "linearRGB")]
    LinearRgb,
    #[serde(rename = "sRGB")]
    Srgb,
}

impl ColorSpace {
    pub const fn as_str(self) -> &'static str {
        match self {
            ColorSpace::LinearRgb => "linearRGB",
            ColorSpace::Srgb => "sRGB",
        }
    }

    /// Index stored in the `color_space` element of extended PLY files.
    pub const fn ply_index(self) -> u8 {
        match self {
            ColorSpace::Srgb => 0,
            ColorSpace::LinearRgb => 1,
        }
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declares the settings table once: the struct, its defaults, the key list
/// and per-key assignment from untyped JSON.
macro_rules! settings_table {
    ($( $(#[$meta:meta])* $field:ident : $ty:ty = $default:expr ),+ $(,)?) => {
        /// Every persisted setting, keyed by its document name.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct Settings {
            $( $(#[$meta])* pub $field: $ty, )+
        }

        impl Default for Settings {
            fn default() -> Self {
                Self { $( $field: $default, )+ }
            }
        }

        impl Settings {
            /// All recognized document keys, in declaration order.
            pub const KEYS: &'static [&'static str] = &[ $( stringify!($field), )+ ];

            /// Assigns one untyped value. The field is untouched on error.
            pub(crate) fn assign(&mut self, key: &str, value: Value) -> Result<(), AssignError> {
                $(
                    if key == stringify!($field) {
                        self.$field = serde_json::from_value::<$ty>(value)
                            .map_err(|_| AssignError::InvalidType)?;
                        return Ok(());
                    }
                )+
                Err(AssignError::UnknownKey)
            }
        }
    };
}

/// Why a single key could not be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AssignError {
    UnknownKey,
    InvalidType,
}

settings_table! {
    device: Device = Device::Default,

    last_video_path: Option<String> = None,
    last_output_dir: Option<String> = None,

    // Initializer; stride and layer count are checkpoint-coupled
    initializer_stride: u32 = 2,
    initializer_num_layers: u32 = 2,
    initializer_scale_factor: f64 = 1.0,
    initializer_disparity_factor: f64 = 1.0,
    initializer_color_option: String = "all_layers".to_string(),
    initializer_first_layer_depth_option: String = "surface_min".to_string(),
    initializer_rest_layer_depth_option: String = "surface_min".to_string(),
    initializer_base_depth: f64 = DEFAULT_INITIALIZER_BASE_DEPTH,
    initializer_normalize_depth: bool = true,
    initializer_feature_input_stop_grad: bool = false,
    initializer_output_inpainted_layer_only: bool = false,
    initializer_set_uninpainted_opacity_to_zero: bool = false,
    initializer_concat_inpainting_mask: bool = false,

    // Gaussian decoder; stride is checkpoint-coupled
    gaussian_decoder_stride: u32 = 2,
    gaussian_decoder_norm_type: String = "group_norm".to_string(),
    gaussian_decoder_norm_num_groups: u32 = 8,
    gaussian_decoder_use_depth_input: bool = true,
    gaussian_decoder_image_encoder_type: String = "skip_conv_kernel2".to_string(),
    gaussian_decoder_grad_checkpointing: bool = false,
    gaussian_decoder_upsampling_mode: String = "transposed_conv".to_string(),

    max_scale: f64 = DEFAULT_MAX_SCALE,
    min_scale: f64 = DEFAULT_MIN_SCALE,
    color_space: ColorSpace = ColorSpace::LinearRgb,
    norm_type: String = "group_norm".to_string(),
    norm_num_groups: u32 = 8,
    use_predicted_mean: bool = false,
    color_activation_type: String = "sigmoid".to_string(),
    opacity_activation_type: String = "sigmoid".to_string(),
    low_pass_filter_eps: f64 = DEFAULT_LOW_PASS_FILTER_EPS,

    processing_resolution: u32 = DEFAULT_PROCESSING_RESOLUTION,
    num_monodepth_layers: u32 = 2,
    sorting_monodepth: bool = false,
    base_scale_on_predicted_mean: bool = true,

    delta_factor_xy: f64 = 0.001,
    delta_factor_z: f64 = 0.001,
    delta_factor_color: f64 = 0.1,
    delta_factor_opacity: f64 = 1.0,
    delta_factor_scale: f64 = 1.0,
    delta_factor_quaternion: f64 = 1.0,

    // Depth alignment; steps and base width are checkpoint-coupled
    alignment_kernel_size: u32 = 16,
    alignment_stride: u32 = 1,
    alignment_frozen: bool = false,
    alignment_steps: u32 = 4,
    alignment_activation_type: String = "exp".to_string(),
    alignment_depth_decoder_features: bool = false,
    alignment_base_width: u32 = 16,

    monodepth_patch_encoder_preset: String = "dinov2l16_384".to_string(),
    monodepth_image_encoder_preset: String = "dinov2l16_384".to_string(),
    monodepth_unfreeze_patch_encoder: bool = false,
    monodepth_unfreeze_image_encoder: bool = false,
    monodepth_unfreeze_decoder: bool = false,
    monodepth_unfreeze_head: bool = false,
    monodepth_unfreeze_norm_layers: bool = false,
    monodepth_grad_checkpointing: bool = false,
    monodepth_use_patch_overlap: bool = true,

    monodepth_adaptor_encoder_features: bool = true,
    monodepth_adaptor_decoder_features: bool = false,

    /// Replace each extended frame file with its standard-schema copy.
    auto_convert_to_standard: bool = true,
    /// Encoding used when writing PLY files.
    ply_encoding: PlyEncoding = PlyEncoding::BinaryLittleEndian,
    output_dir: Option<String> = None,
}

/// Keys that only describe the application, never the predictor.
const APPLICATION_KEYS: &[&str] = &[
    "last_video_path",
    "last_output_dir",
    "output_dir",
    "auto_convert_to_standard",
    "ply_encoding",
];

/// Parameter bundle handed to predictor construction.
///
/// The fields the built-in predictor reads are typed; every other predictor
/// key travels untouched in `forwarded`.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorParams {
    pub device: Device,
    pub processing_resolution: u32,
    pub color_space: ColorSpace,
    pub initializer_stride: u32,
    pub initializer_scale_factor: f64,
    pub initializer_disparity_factor: f64,
    pub initializer_base_depth: f64,
    pub min_scale: f64,
    pub max_scale: f64,
    pub low_pass_filter_eps: f64,
    pub forwarded: Map<String, Value>,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Settings::default().predictor_params()
    }
}

impl Settings {
    /// Current value of one key as JSON, or `None` for an unknown key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => map.remove(key),
            _ => None,
        }
    }

    /// All settings as a flat JSON object.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Sets one key from a JSON value, rejecting unknown keys and mistyped values.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), CoreError> {
        self.assign(key, value).map_err(|err| match err {
            AssignError::UnknownKey => CoreError::Settings(format!("Unknown setting: {key}")),
            AssignError::InvalidType => {
                CoreError::Settings(format!("Invalid value type for setting '{key}'"))
            }
        })
    }

    /// Restores every key to its default.
    pub fn reset_to_defaults(&mut self) {
        *self = Settings::default();
    }

    /// Builds the predictor parameter bundle from the current values.
    #[must_use]
    pub fn predictor_params(&self) -> PredictorParams {
        let mut forwarded = self.to_map();
        for key in APPLICATION_KEYS {
            forwarded.remove(*key);
        }
        for key in [
            "device",
            "processing_resolution",
            "color_space",
            "initializer_stride",
            "initializer_scale_factor",
            "initializer_disparity_factor",
            "initializer_base_depth",
            "min_scale",
            "max_scale",
            "low_pass_filter_eps",
        ] {
            forwarded.remove(key);
        }

        PredictorParams {
            device: self.device,
            processing_resolution: self.effective_processing_resolution().0,
            color_space: self.color_space,
            initializer_stride: self.initializer_stride,
            initializer_scale_factor: self.initializer_scale_factor,
            initializer_disparity_factor: self.initializer_disparity_factor,
            initializer_base_depth: self.initializer_base_depth,
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            low_pass_filter_eps: self.low_pass_filter_eps,
            forwarded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.device, Device::Default);
        assert_eq!(settings.processing_resolution, 1536);
        assert_eq!(settings.max_scale, 10.0);
        assert_eq!(settings.min_scale, 0.0);
        assert_eq!(settings.low_pass_filter_eps, 0.001);
        assert_eq!(settings.color_space, ColorSpace::LinearRgb);
        assert!(settings.auto_convert_to_standard);
        assert_eq!(settings.output_dir, None);
    }

    #[test]
    fn keys_cover_serialized_document() {
        let map = Settings::default().to_map();
        assert_eq!(map.len(), Settings::KEYS.len());
        for key in Settings::KEYS {
            assert!(map.contains_key(*key), "missing {key}");
        }
        assert_eq!(map["color_space"], json!("linearRGB"));
        assert_eq!(map["device"], json!("default"));
    }

    #[test]
    fn set_accepts_integer_for_float() {
        let mut settings = Settings::default();
        settings.set("max_scale", json!(12)).unwrap();
        assert_eq!(settings.max_scale, 12.0);
    }

    #[test]
    fn set_rejects_unknown_and_mistyped() {
        let mut settings = Settings::default();
        assert!(settings.set("warp_factor", json!(9)).is_err());
        assert!(settings.set("processing_resolution", json!("big")).is_err());
        assert!(settings.set("device", json!("tpu")).is_err());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn predictor_params_forward_architecture_keys() {
        let mut settings = Settings::default();
        settings.set("alignment_steps", json!(6)).unwrap();
        let params = settings.predictor_params();
        assert_eq!(params.forwarded["alignment_steps"], json!(6));
        assert!(!params.forwarded.contains_key("output_dir"));
        assert!(!params.forwarded.contains_key("max_scale"));
        assert_eq!(params.max_scale, 10.0);
    }

    #[test]
    fn device_parses_case_insensitively() {
        assert_eq!("CUDA".parse::<Device>().unwrap(), Device::Cuda);
        assert!("tpu".parse::<Device>().is_err());
    }
}
