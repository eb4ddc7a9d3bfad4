use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use crate::{binary, text, CameraModelId, ColmapCamera, ColmapError, ImagePose};

/// Intrinsics of a distortion-free pinhole camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraIntrinsics {
    /// Camera id
    pub camera_id: u32,
    /// Camera model, always [`CameraModelId::Pinhole`]
    pub model: CameraModelId,
    /// Image width in pixels
    pub width: u64,
    /// Image height in pixels
    pub height: u64,
    /// Focal length along x in pixels
    pub fx: f64,
    /// Focal length along y in pixels
    pub fy: f64,
    /// Principal point x in pixels
    pub cx: f64,
    /// Principal point y in pixels
    pub cy: f64,
}

impl TryFrom<ColmapCamera> for CameraIntrinsics {
    type Error = ColmapError;

    fn try_from(camera: ColmapCamera) -> Result<Self, Self::Error> {
        if camera.model_id != CameraModelId::Pinhole {
            return Err(ColmapError::UnsupportedModel {
                camera_id: camera.camera_id,
                model: camera.model_id.name().to_string(),
            });
        }

        let [fx, fy, cx, cy]: [f64; 4] = camera
            .params
            .as_slice()
            .try_into()
            .map_err(|_| ColmapError::InvalidNumCameraParams(camera.params.len()))?;

        Ok(Self {
            camera_id: camera.camera_id,
            model: camera.model_id,
            width: camera.width,
            height: camera.height,
            fx,
            fy,
            cx,
            cy,
        })
    }
}

/// Cameras and registered images of one sparse reconstruction.
///
/// Built once by [`read_model`] or [`ReconstructionModel::from_records`] and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct ReconstructionModel {
    cameras: BTreeMap<u32, CameraIntrinsics>,
    images: BTreeMap<u32, ImagePose>,
}

impl ReconstructionModel {
    /// Validate raw records and assemble the model.
    ///
    /// Fails on the first non-pinhole camera, on a quaternion that cannot be
    /// normalized, and on images that reference a camera not in the list.
    pub fn from_records(
        cameras: Vec<ColmapCamera>,
        images: Vec<ImagePose>,
    ) -> Result<Self, ColmapError> {
        let cameras = cameras
            .into_iter()
            .map(|camera| {
                let intrinsics = CameraIntrinsics::try_from(camera)?;
                Ok((intrinsics.camera_id, intrinsics))
            })
            .collect::<Result<BTreeMap<_, _>, ColmapError>>()?;

        let images = images
            .into_iter()
            .map(|image| {
                validate_image(&image, &cameras)?;
                Ok((image.image_id, image))
            })
            .collect::<Result<BTreeMap<_, _>, ColmapError>>()?;

        Ok(Self { cameras, images })
    }

    /// Cameras keyed by id.
    pub fn cameras(&self) -> &BTreeMap<u32, CameraIntrinsics> {
        &self.cameras
    }

    /// Registered images keyed by id.
    pub fn images(&self) -> &BTreeMap<u32, ImagePose> {
        &self.images
    }

    /// Look up a camera by id.
    pub fn camera(&self, camera_id: u32) -> Option<&CameraIntrinsics> {
        self.cameras.get(&camera_id)
    }

    /// The camera with the lowest id, used when a single shared camera is assumed.
    pub fn primary_camera(&self) -> Option<&CameraIntrinsics> {
        self.cameras.values().next()
    }

    /// Image names in image-id order.
    pub fn image_names(&self) -> Vec<&str> {
        self.images.values().map(|image| image.name.as_str()).collect()
    }
}

fn validate_image(
    image: &ImagePose,
    cameras: &BTreeMap<u32, CameraIntrinsics>,
) -> Result<(), ColmapError> {
    let invalid = |reason: &str| ColmapError::InvalidRotation {
        image_id: image.image_id,
        reason: reason.to_string(),
    };

    if image.rotation.iter().any(|q| !q.is_finite()) {
        return Err(invalid("non-finite quaternion"));
    }
    let norm = image.rotation.iter().map(|q| q * q).sum::<f64>().sqrt();
    if norm < f64::EPSILON {
        return Err(invalid("zero-norm quaternion"));
    }

    if !cameras.contains_key(&image.camera_id) {
        return Err(ColmapError::UnknownCamera {
            image_id: image.image_id,
            camera_id: image.camera_id,
        });
    }

    Ok(())
}

/// Locate the directory holding the model files.
///
/// Accepts the model directory itself or a COLMAP output directory with a
/// `sparse/0` (or `0`) sub-directory.
pub fn find_model_dir(dir: impl AsRef<Path>) -> Option<PathBuf> {
    let dir = dir.as_ref();
    [
        dir.to_path_buf(),
        dir.join("sparse").join("0"),
        dir.join("sparse"),
        dir.join("0"),
    ]
    .into_iter()
    .find(|candidate| {
        candidate.join("cameras.bin").is_file() || candidate.join("cameras.txt").is_file()
    })
}

/// Read a sparse reconstruction from a directory.
///
/// The binary files `cameras.bin` and `images.bin` are preferred; the text
/// files are used when no binary model is present.
///
/// # Arguments
///
/// * `dir` - The model directory or the COLMAP output directory above it.
///
/// # Returns
///
/// The validated [`ReconstructionModel`].
pub fn read_model(dir: impl AsRef<Path>) -> Result<ReconstructionModel, ColmapError> {
    let dir = dir.as_ref();
    let model_dir =
        find_model_dir(dir).ok_or_else(|| ColmapError::MissingFile(dir.join("cameras.bin")))?;

    let (cameras, images) = if model_dir.join("cameras.bin").is_file() {
        (
            binary::read_cameras_bin(model_dir.join("cameras.bin"))?,
            binary::read_images_bin(model_dir.join("images.bin"))?,
        )
    } else {
        (
            text::read_cameras_txt(model_dir.join("cameras.txt"))?,
            text::read_images_txt(model_dir.join("images.txt"))?,
        )
    };

    log::info!(
        "found {} cameras and {} images in {}",
        cameras.len(),
        images.len(),
        model_dir.display()
    );

    ReconstructionModel::from_records(cameras, images)
}
