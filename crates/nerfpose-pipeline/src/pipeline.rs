use std::path::{Path, PathBuf};

use nerfpose_3d::{
    normalize::normalize_poses,
    quality::{analyze_poses, CameraRays},
    transforms::{colmap_to_nerf, horizontal_fov},
};
use nerfpose_colmap::{model::find_model_dir, read_model, ReconstructionModel};
use nerfpose_dataset::{
    images::{list_images, name_key},
    resolve, ConvertedFrame, Dataset, FileCorrespondenceMap, MatchKind,
};
use nerfpose_validation::{
    compare,
    completeness::{check_required_paths, RequiredPath},
    diagnose,
    diagnostics::check_frame_count,
    Finding, ReportBuilder, ValidationReport,
};
use serde::Serialize;
use serde_json::json;

use crate::{
    engine::EngineError, PipelineConfig, PipelineError, ProjectLayout, ReconstructionEngine,
};

/// Steps of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Copy the source images into the project.
    CopyImages,
    /// Feature extraction, matching and mapping.
    RunReconstruction,
    /// Convert the reconstruction into the dataset.
    ConvertPoses,
    /// Check consistency and geometry, write the report.
    ValidateAndReport,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::CopyImages => "copy images",
            Stage::RunReconstruction => "run reconstruction",
            Stage::ConvertPoses => "convert poses",
            Stage::ValidateAndReport => "validate and report",
        };
        write!(f, "{name}")
    }
}

/// Why a reconstructed image did not make it into the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No file on disk matches the recorded name.
    Unresolved,
    /// The matched file does not exist.
    MissingFile,
}

/// A reconstructed image left out of the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedImage {
    /// Image id in the reconstruction.
    pub image_id: u32,
    /// Recorded name.
    pub name: String,
    /// Reason.
    pub reason: SkipReason,
}

/// Result of the pose conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The written dataset.
    pub dataset: Dataset,
    /// Images that were skipped.
    pub skipped: Vec<SkippedImage>,
    /// Correspondence between recorded and on-disk names.
    pub correspondence: FileCorrespondenceMap,
    /// Subtracted scene center.
    pub center: [f64; 3],
    /// Applied scene scale.
    pub scale: f64,
}

/// Paths and results of a finished run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The pose conversion.
    pub conversion: Conversion,
    /// The validation report.
    pub report: ValidationReport,
    /// Where the dataset was written.
    pub dataset_path: PathBuf,
    /// Where the report was written, `None` when writing it failed.
    pub report_path: Option<PathBuf>,
}

/// Warning listing the pairs made by position only, if any.
fn positional_finding(correspondence: &FileCorrespondenceMap) -> Option<Finding> {
    let pairs = correspondence
        .iter()
        .filter(|(_, _, kind)| *kind == MatchKind::Positional)
        .map(|(recorded, actual, _)| json!({ "recorded": recorded, "file": actual }))
        .collect::<Vec<_>>();
    if pairs.is_empty() {
        return None;
    }

    Some(Finding::warning(
        "Images matched by position",
        format!(
            "{} images were paired with files by sorted position only and are not verified",
            pairs.len()
        ),
        json!({ "pairs": pairs }),
    ))
}

/// The staged pipeline from photographs to a validated pose dataset.
///
/// Stages run strictly in order. A failure before validation aborts the run,
/// validation problems only end up in the report.
pub struct Pipeline<E: ReconstructionEngine> {
    config: PipelineConfig,
    layout: ProjectLayout,
    engine: E,
    images_dir: Option<PathBuf>,
    model_dir: Option<PathBuf>,
    dataset_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
}

impl<E: ReconstructionEngine> Pipeline<E> {
    /// Create a new pipeline for a project directory.
    pub fn new(config: PipelineConfig, layout: ProjectLayout, engine: E) -> Self {
        Self {
            config,
            layout,
            engine,
            images_dir: None,
            model_dir: None,
            dataset_path: None,
            report_path: None,
        }
    }

    /// Read images from this directory instead of the project image directory
    /// when the copy stage is skipped.
    pub fn with_images_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.images_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Read the reconstruction from this directory.
    pub fn with_model_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.model_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Write the dataset to this path.
    pub fn with_dataset_path(mut self, path: impl AsRef<Path>) -> Self {
        self.dataset_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Write the report to this path.
    pub fn with_report_path(mut self, path: impl AsRef<Path>) -> Self {
        self.report_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// The configuration of the run.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The project layout.
    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// The reconstruction engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn images_dir(&self) -> PathBuf {
        self.images_dir
            .clone()
            .unwrap_or_else(|| self.layout.images_dir())
    }

    fn dataset_path(&self) -> PathBuf {
        self.dataset_path
            .clone()
            .unwrap_or_else(|| self.layout.transforms_path())
    }

    fn report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| self.layout.report_path())
    }

    fn model_dir(&self) -> PathBuf {
        let dir = self
            .model_dir
            .clone()
            .unwrap_or_else(|| self.layout.colmap_dir());
        find_model_dir(&dir).unwrap_or(dir)
    }

    /// Replace the project image directory with the supported images of `source`.
    ///
    /// Returns the number of copied files.
    pub fn copy_images(&self, source: impl AsRef<Path>) -> Result<usize, PipelineError> {
        let source = source.as_ref();
        let names = list_images(source)?;
        if names.is_empty() {
            return Err(PipelineError::NoImages(source.to_path_buf()));
        }

        let target = self.layout.images_dir();
        if target.exists() && source.canonicalize()? == target.canonicalize()? {
            log::info!("images already in {}", target.display());
            return Ok(names.len());
        }
        if target.exists() {
            std::fs::remove_dir_all(&target)?;
        }
        std::fs::create_dir_all(&target)?;

        for name in &names {
            std::fs::copy(source.join(name), target.join(name))?;
        }

        log::info!(
            "copied {} images from {} to {}",
            names.len(),
            source.display(),
            target.display()
        );
        Ok(names.len())
    }

    /// Run feature extraction, matching and mapping on the project images.
    ///
    /// Returns the directory of the first sparse model.
    pub fn run_reconstruction(&self) -> Result<PathBuf, PipelineError> {
        let database = self.layout.database_path();
        let images = self.layout.images_dir();
        let sparse = self.layout.sparse_dir();

        std::fs::create_dir_all(&sparse)?;
        // start from an empty database
        if database.exists() {
            std::fs::remove_file(&database)?;
        }

        self.engine.extract_features(&database, &images)?;
        self.engine.match_features(&database)?;
        self.engine.map(&database, &images, &sparse)?;

        let model_dir = self.layout.model_dir();
        let cameras = model_dir.join("cameras.bin");
        if !cameras.is_file() {
            return Err(EngineError::MissingOutput(cameras).into());
        }

        Ok(model_dir)
    }

    /// Convert a reconstruction into the dataset and write it.
    ///
    /// Images whose recorded name cannot be matched to a file are skipped;
    /// the dataset is only written when every remaining pose converted.
    pub fn convert_poses(
        &self,
        model: &ReconstructionModel,
        images_dir: &Path,
        output: &Path,
    ) -> Result<Conversion, PipelineError> {
        let camera = model.primary_camera().ok_or(PipelineError::NoCameras)?;
        if model.cameras().len() > 1 {
            log::warn!(
                "reconstruction has {} cameras, using camera {} for the field of view",
                model.cameras().len(),
                camera.camera_id
            );
        }

        let actual = list_images(images_dir)?;
        let correspondence = resolve(&actual, &model.image_names(), &self.config.correspondence);
        if correspondence.has_positional() {
            log::warn!("some images were matched by position only, check the dataset");
        }

        let mut skipped = Vec::new();
        let mut names = Vec::new();
        let mut poses = Vec::new();

        for (image_id, image) in model.images() {
            let Some(file_name) = correspondence.get(&image.name) else {
                log::warn!(
                    "skipping image {image_id} ({}): no matching file",
                    image.name
                );
                skipped.push(SkippedImage {
                    image_id: *image_id,
                    name: image.name.clone(),
                    reason: SkipReason::Unresolved,
                });
                continue;
            };

            if !images_dir.join(file_name).is_file() {
                log::warn!(
                    "skipping image {image_id} ({}): {file_name} is missing",
                    image.name
                );
                skipped.push(SkippedImage {
                    image_id: *image_id,
                    name: image.name.clone(),
                    reason: SkipReason::MissingFile,
                });
                continue;
            }

            poses.push(colmap_to_nerf(&image.rotation, &image.translation)?);
            names.push(file_name.to_string());
        }

        if poses.is_empty() {
            return Err(PipelineError::NoValidImages {
                skipped: skipped.len(),
            });
        }

        let normalized = normalize_poses(&poses, &self.config.normalization)?;

        let frames = names
            .into_iter()
            .zip(normalized.poses)
            .map(|(name, pose)| ConvertedFrame::new(name, pose))
            .collect();
        let dataset = Dataset::new(horizontal_fov(camera.width as f64, camera.fx), frames)?;
        dataset.write_json(output)?;

        log::info!(
            "converted {} images, skipped {}",
            dataset.len(),
            skipped.len()
        );

        Ok(Conversion {
            dataset,
            skipped,
            correspondence,
            center: normalized.center,
            scale: normalized.scale,
        })
    }

    /// Compare the three image sets and check the camera geometry.
    ///
    /// Recorded names are compared through the resolved correspondence, so a
    /// renamed file still counts as having a pose. The findings are advisory:
    /// a check that cannot run becomes an error finding instead of failing
    /// the run.
    pub fn validate_and_report(
        &self,
        images_dir: &Path,
        model: &ReconstructionModel,
        conversion: &Conversion,
        required: &[RequiredPath],
    ) -> ValidationReport {
        let dataset = &conversion.dataset;
        let correspondence = &conversion.correspondence;
        let thresholds = &self.config.thresholds;

        let mut builder = ReportBuilder::new();
        builder.extend("completeness", check_required_paths(required));

        match list_images(images_dir) {
            Ok(raw) => {
                let reconstructed = model
                    .image_names()
                    .into_iter()
                    .map(|name| name_key(correspondence.get(name).unwrap_or(name)));
                let diff = compare(
                    raw.iter().map(|n| name_key(n)),
                    dataset.frames.iter().map(|f| name_key(&f.file_path)),
                    reconstructed,
                );
                builder.extend("consistency", diff.findings());
            }
            Err(e) => {
                builder.push(
                    "consistency",
                    Finding::error(
                        "Raw images unreadable",
                        format!("cannot list {}: {e}", images_dir.display()),
                        json!({ "path": images_dir }),
                    ),
                );
            }
        }
        if let Some(finding) = positional_finding(correspondence) {
            builder.push("consistency", finding);
        }

        let poses = dataset.poses();
        match analyze_poses(&poses) {
            Ok(metrics) => {
                builder
                    .extend("quality", diagnose(&metrics, thresholds))
                    .metrics(metrics)
                    .cameras(CameraRays::from_poses(&poses));
            }
            Err(e) => {
                builder.push(
                    "quality",
                    Finding::error(
                        "Geometry not analyzed",
                        format!("camera geometry could not be analyzed: {e}"),
                        json!({}),
                    ),
                );
            }
        }
        builder.push("quality", check_frame_count(dataset.len(), thresholds));

        let report = builder.build();
        report.log();
        report
    }

    /// Write the report, logging instead of failing when that is not possible.
    fn write_report(&self, report: &ValidationReport) -> Option<PathBuf> {
        let path = self.report_path();
        match report.write_json(&path) {
            Ok(()) => {
                log::info!("wrote validation report to {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::error!("failed to write report to {}: {e}", path.display());
                None
            }
        }
    }

    fn required_paths(
        &self,
        images_dir: &Path,
        model_dir: &Path,
        with_database: bool,
    ) -> Vec<RequiredPath> {
        let mut required = vec![
            RequiredPath::new(images_dir, "image directory"),
            RequiredPath::new(model_dir.join("cameras.bin"), "reconstruction cameras"),
            RequiredPath::new(model_dir.join("images.bin"), "reconstruction images"),
            RequiredPath::new(self.dataset_path(), "dataset file"),
        ];
        if with_database {
            required.push(RequiredPath::new(
                self.layout.database_path(),
                "feature database",
            ));
        }
        required
    }

    fn finish(
        &self,
        images_dir: PathBuf,
        model_dir: PathBuf,
        with_database: bool,
    ) -> Result<PipelineOutcome, PipelineError> {
        log::info!("stage: {}", Stage::ConvertPoses);
        let model = read_model(&model_dir)?;
        let dataset_path = self.dataset_path();
        let conversion = self.convert_poses(&model, &images_dir, &dataset_path)?;

        log::info!("stage: {}", Stage::ValidateAndReport);
        let required = self.required_paths(&images_dir, &model_dir, with_database);
        let report = self.validate_and_report(&images_dir, &model, &conversion, &required);
        let report_path = self.write_report(&report);

        Ok(PipelineOutcome {
            conversion,
            report,
            dataset_path,
            report_path,
        })
    }

    /// Run all stages, starting from the images in `source`.
    pub fn run(&self, source: impl AsRef<Path>) -> Result<PipelineOutcome, PipelineError> {
        self.layout.create_dirs()?;

        log::info!("stage: {}", Stage::CopyImages);
        self.copy_images(source)?;

        log::info!("stage: {}", Stage::RunReconstruction);
        let model_dir = self.run_reconstruction()?;

        self.finish(self.layout.images_dir(), model_dir, true)
    }

    /// Convert and validate an existing reconstruction, without running the engine.
    pub fn run_existing(&self) -> Result<PipelineOutcome, PipelineError> {
        let images_dir = self.images_dir();
        if !images_dir.is_dir() || list_images(&images_dir)?.is_empty() {
            return Err(PipelineError::NoImages(images_dir));
        }

        self.finish(images_dir, self.model_dir(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::CopyImages.to_string(), "copy images");
        assert_eq!(Stage::ValidateAndReport.to_string(), "validate and report");
    }
}
