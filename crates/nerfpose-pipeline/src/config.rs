use std::{collections::BTreeMap, path::Path};

use nerfpose_3d::normalize::NormalizationConfig;
use nerfpose_dataset::CorrespondenceConfig;
use nerfpose_validation::QualityThresholds;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Options of the COLMAP command line calls.
///
/// The typed fields take precedence over the same keys in the option maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColmapOptions {
    /// Executable to run.
    pub binary: String,
    /// Run SIFT extraction and matching on the GPU.
    pub use_gpu: bool,
    /// Render offscreen so that no display is needed.
    pub headless: bool,
    /// Images are downscaled to this size before feature extraction.
    pub max_image_size: u32,
    /// Features kept per image.
    pub max_num_features: u32,
    /// Kill a step after this many seconds.
    pub timeout_secs: Option<u64>,
    /// Extra `feature_extractor` options.
    pub feature_extractor: BTreeMap<String, String>,
    /// Extra `exhaustive_matcher` options.
    pub matcher: BTreeMap<String, String>,
    /// Extra `mapper` options.
    pub mapper: BTreeMap<String, String>,
}

fn options(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for ColmapOptions {
    fn default() -> Self {
        Self {
            binary: "colmap".to_string(),
            use_gpu: true,
            headless: true,
            max_image_size: 3200,
            max_num_features: 8192,
            timeout_secs: None,
            feature_extractor: options(&[
                ("ImageReader.single_camera", "1"),
                ("ImageReader.camera_model", "PINHOLE"),
                ("SiftExtraction.first_octave", "-1"),
                ("SiftExtraction.num_octaves", "4"),
                ("SiftExtraction.octave_resolution", "3"),
                ("SiftExtraction.peak_threshold", "0.02"),
                ("SiftExtraction.edge_threshold", "10.0"),
            ]),
            matcher: options(&[
                ("SiftMatching.max_ratio", "0.8"),
                ("SiftMatching.max_distance", "0.7"),
                ("SiftMatching.cross_check", "1"),
                ("SiftMatching.max_num_matches", "32768"),
            ]),
            mapper: options(&[
                ("Mapper.ba_refine_focal_length", "1"),
                ("Mapper.ba_refine_principal_point", "0"),
                ("Mapper.ba_refine_extra_params", "1"),
                ("Mapper.min_num_matches", "15"),
                ("Mapper.init_min_num_inliers", "100"),
                ("Mapper.abs_pose_min_num_inliers", "30"),
                ("Mapper.abs_pose_min_inlier_ratio", "0.25"),
                ("Mapper.filter_max_reproj_error", "4.0"),
                ("Mapper.filter_min_tri_angle", "1.5"),
            ]),
        }
    }
}

fn flag(value: bool) -> String {
    let flag = if value { "1" } else { "0" };
    flag.to_string()
}

fn to_args(options: &BTreeMap<String, String>) -> Vec<String> {
    options
        .iter()
        .flat_map(|(k, v)| [format!("--{k}"), v.clone()])
        .collect()
}

fn parse_positive(name: &str, value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected a positive integer".to_string(),
        }),
    }
}

fn parse_switch(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
            reason: "expected 0 or 1".to_string(),
        }),
    }
}

impl ColmapOptions {
    /// Overlay the `COLMAP_*` environment variables.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Overlay the `COLMAP_*` variables returned by `lookup`.
    ///
    /// * `COLMAP_USE_GPU` - `0` or `1`.
    /// * `COLMAP_MAX_IMAGE_SIZE` - positive integer.
    /// * `COLMAP_MAX_FEATURES` - positive integer.
    /// * `COLMAP_HEADLESS` - `0` or `1`.
    /// * `COLMAP_BINARY` - path or name of the executable.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("COLMAP_USE_GPU") {
            self.use_gpu = parse_switch("COLMAP_USE_GPU", &value)?;
        }
        if let Some(value) = lookup("COLMAP_MAX_IMAGE_SIZE") {
            self.max_image_size = parse_positive("COLMAP_MAX_IMAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("COLMAP_MAX_FEATURES") {
            self.max_num_features = parse_positive("COLMAP_MAX_FEATURES", &value)?;
        }
        if let Some(value) = lookup("COLMAP_HEADLESS") {
            self.headless = parse_switch("COLMAP_HEADLESS", &value)?;
        }
        if let Some(value) = lookup("COLMAP_BINARY") {
            if !value.trim().is_empty() {
                self.binary = value.trim().to_string();
            }
        }
        Ok(())
    }

    /// Arguments of the `feature_extractor` call.
    pub fn feature_extractor_args(&self, database: &Path, images: &Path) -> Vec<String> {
        let mut options = self.feature_extractor.clone();
        options.insert("SiftExtraction.use_gpu".to_string(), flag(self.use_gpu));
        options.insert(
            "SiftExtraction.max_image_size".to_string(),
            self.max_image_size.to_string(),
        );
        options.insert(
            "SiftExtraction.max_num_features".to_string(),
            self.max_num_features.to_string(),
        );

        let mut args = vec![
            "feature_extractor".to_string(),
            "--database_path".to_string(),
            database.display().to_string(),
            "--image_path".to_string(),
            images.display().to_string(),
        ];
        args.extend(to_args(&options));
        args
    }

    /// Arguments of the `exhaustive_matcher` call.
    pub fn matcher_args(&self, database: &Path) -> Vec<String> {
        let mut options = self.matcher.clone();
        options.insert("SiftMatching.use_gpu".to_string(), flag(self.use_gpu));

        let mut args = vec![
            "exhaustive_matcher".to_string(),
            "--database_path".to_string(),
            database.display().to_string(),
        ];
        args.extend(to_args(&options));
        args
    }

    /// Arguments of the `mapper` call.
    pub fn mapper_args(&self, database: &Path, images: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            "mapper".to_string(),
            "--database_path".to_string(),
            database.display().to_string(),
            "--image_path".to_string(),
            images.display().to_string(),
            "--output_path".to_string(),
            output.display().to_string(),
        ];
        args.extend(to_args(&self.mapper));
        args
    }

    /// Environment variables set on the engine process.
    pub fn env(&self) -> Vec<(String, String)> {
        if self.headless {
            vec![
                ("QT_QPA_PLATFORM".to_string(), "offscreen".to_string()),
                (
                    "QT_LOGGING_RULES".to_string(),
                    "qt.qpa.xcb.debug=false".to_string(),
                ),
            ]
        } else {
            Vec::new()
        }
    }
}

/// Configuration of a pipeline run.
///
/// Every section falls back to its defaults, so a config file only needs the
/// values it overrides:
///
/// ```json
/// { "thresholds": { "min_frame_count": 20 }, "correspondence": { "positional_fallback": true } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Reconstruction engine options.
    pub colmap: ColmapOptions,
    /// Scene normalization.
    pub normalization: NormalizationConfig,
    /// Matching of recorded names to files.
    pub correspondence: CorrespondenceConfig,
    /// Limits of the quality diagnostics.
    pub thresholds: QualityThresholds,
}

impl PipelineConfig {
    /// Load a configuration from a json file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Overlay the `COLMAP_*` environment variables on the engine options.
    pub fn with_env(mut self) -> Result<Self, ConfigError> {
        self.colmap.apply_env()?;
        Ok(self)
    }
}
