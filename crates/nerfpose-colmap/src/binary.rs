use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use super::{CameraModelId, ColmapCamera, ColmapError, ImagePose};

// upper bound for the capacity reserved from an untrusted record count
const MAX_PREALLOC: usize = 4096;
const MAX_NAME_LEN: usize = 4096;

/// Little-endian record reader that reports truncation with the field name.
struct RecordReader<R> {
    inner: R,
    path: PathBuf,
}

impl<R: Read> RecordReader<R> {
    fn new(inner: R, path: &Path) -> Self {
        Self {
            inner,
            path: path.to_path_buf(),
        }
    }

    fn read_bytes<const N: usize>(&mut self, field: &str) -> Result<[u8; N], ColmapError> {
        let mut bytes = [0u8; N];
        self.inner.read_exact(&mut bytes).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ColmapError::Truncated {
                path: self.path.clone(),
                field: field.to_string(),
            },
            _ => ColmapError::IoError(e),
        })?;
        Ok(bytes)
    }

    fn read_u64(&mut self, field: &str) -> Result<u64, ColmapError> {
        Ok(u64::from_le_bytes(self.read_bytes(field)?))
    }

    fn read_i32(&mut self, field: &str) -> Result<i32, ColmapError> {
        Ok(i32::from_le_bytes(self.read_bytes(field)?))
    }

    fn read_i64(&mut self, field: &str) -> Result<i64, ColmapError> {
        Ok(i64::from_le_bytes(self.read_bytes(field)?))
    }

    fn read_f64(&mut self, field: &str) -> Result<f64, ColmapError> {
        Ok(f64::from_le_bytes(self.read_bytes(field)?))
    }

    fn read_f64_array<const N: usize>(&mut self, field: &str) -> Result<[f64; N], ColmapError> {
        let mut values = [0.0; N];
        for value in values.iter_mut() {
            *value = self.read_f64(field)?;
        }
        Ok(values)
    }

    fn read_id(&mut self, field: &str) -> Result<u32, ColmapError> {
        let id = self.read_i32(field)?;
        u32::try_from(id).map_err(|_| ColmapError::ParseError(format!("negative {field}: {id}")))
    }

    /// Read a NUL-terminated UTF-8 string.
    fn read_name(&mut self, field: &str) -> Result<String, ColmapError> {
        let mut bytes = Vec::new();
        loop {
            let [byte] = self.read_bytes::<1>(field)?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
            if bytes.len() > MAX_NAME_LEN {
                return Err(ColmapError::ParseError(format!(
                    "{field} exceeds {MAX_NAME_LEN} bytes"
                )));
            }
        }
        String::from_utf8(bytes).map_err(|e| ColmapError::ParseError(format!("{field}: {e}")))
    }
}

fn open_model_file(path: &Path) -> Result<BufReader<File>, ColmapError> {
    if !path.is_file() {
        return Err(ColmapError::MissingFile(path.to_path_buf()));
    }
    Ok(BufReader::new(File::open(path)?))
}

/// Read the cameras.bin file and return a vector of ColmapCamera structs.
///
/// # Arguments
///
/// * `path` - The path to the cameras.bin file.
///
/// # Returns
///
/// The camera records in file order. Models other than pinhole are returned
/// as-is; rejecting them is the job of [`crate::read_model`].
pub fn read_cameras_bin(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    let path = path.as_ref();
    let mut reader = RecordReader::new(open_model_file(path)?, path);

    let num_cameras = reader.read_u64("number of cameras")? as usize;
    let mut cameras = Vec::with_capacity(num_cameras.min(MAX_PREALLOC));

    for _ in 0..num_cameras {
        let camera_id = reader.read_id("camera id")?;
        let model = reader.read_i32("camera model id")?;
        let model_id = CameraModelId::from_id(model)
            .ok_or_else(|| ColmapError::UnknownCameraModel(model.to_string()))?;
        let width = reader.read_u64("camera width")?;
        let height = reader.read_u64("camera height")?;
        let params = (0..model_id.num_params())
            .map(|_| reader.read_f64("camera params"))
            .collect::<Result<Vec<_>, _>>()?;

        cameras.push(ColmapCamera {
            camera_id,
            model_id,
            width,
            height,
            params,
        });
    }

    log::debug!("read {} cameras from {}", cameras.len(), path.display());

    Ok(cameras)
}

/// Read the images.bin file and return a vector of ImagePose structs.
///
/// # Arguments
///
/// * `path` - The path to the images.bin file.
///
/// # Returns
///
/// The registered images in file order, including their 2D observations.
pub fn read_images_bin(path: impl AsRef<Path>) -> Result<Vec<ImagePose>, ColmapError> {
    let path = path.as_ref();
    let mut reader = RecordReader::new(open_model_file(path)?, path);

    let num_images = reader.read_u64("number of images")? as usize;
    let mut images = Vec::with_capacity(num_images.min(MAX_PREALLOC));

    for _ in 0..num_images {
        let image_id = reader.read_id("image id")?;
        let rotation = reader.read_f64_array::<4>("image rotation")?;
        let translation = reader.read_f64_array::<3>("image translation")?;
        let camera_id = reader.read_id("image camera id")?;
        let name = reader.read_name("image name")?;

        let num_points2d = reader.read_u64("number of 2d points")? as usize;
        let mut points2d = Vec::with_capacity(num_points2d.min(MAX_PREALLOC));
        for _ in 0..num_points2d {
            let x = reader.read_f64("2d point x")?;
            let y = reader.read_f64("2d point y")?;
            let point3d_id = reader.read_i64("2d point 3d id")?;
            points2d.push((x, y, point3d_id));
        }

        images.push(ImagePose {
            image_id,
            rotation,
            translation,
            camera_id,
            name,
            points2d,
        });
    }

    log::debug!("read {} images from {}", images.len(), path.display());

    Ok(images)
}

/// Write camera records in the cameras.bin layout.
///
/// The parameter count of each camera must match its model.
pub fn write_cameras_bin(
    path: impl AsRef<Path>,
    cameras: &[ColmapCamera],
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(&(cameras.len() as u64).to_le_bytes())?;
    for camera in cameras {
        if camera.params.len() != camera.model_id.num_params() {
            return Err(ColmapError::InvalidNumCameraParams(camera.params.len()));
        }
        writer.write_all(&(camera.camera_id as i32).to_le_bytes())?;
        writer.write_all(&(camera.model_id as i32).to_le_bytes())?;
        writer.write_all(&camera.width.to_le_bytes())?;
        writer.write_all(&camera.height.to_le_bytes())?;
        for param in &camera.params {
            writer.write_all(&param.to_le_bytes())?;
        }
    }
    writer.flush()?;

    Ok(())
}

/// Write image records in the images.bin layout.
pub fn write_images_bin(path: impl AsRef<Path>, images: &[ImagePose]) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path)?);

    writer.write_all(&(images.len() as u64).to_le_bytes())?;
    for image in images {
        writer.write_all(&(image.image_id as i32).to_le_bytes())?;
        for q in &image.rotation {
            writer.write_all(&q.to_le_bytes())?;
        }
        for t in &image.translation {
            writer.write_all(&t.to_le_bytes())?;
        }
        writer.write_all(&(image.camera_id as i32).to_le_bytes())?;
        writer.write_all(image.name.as_bytes())?;
        writer.write_all(&[0u8])?;
        writer.write_all(&(image.points2d.len() as u64).to_le_bytes())?;
        for (x, y, point3d_id) in &image.points2d {
            writer.write_all(&x.to_le_bytes())?;
            writer.write_all(&y.to_le_bytes())?;
            writer.write_all(&point3d_id.to_le_bytes())?;
        }
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pinhole(camera_id: u32) -> ColmapCamera {
        ColmapCamera {
            camera_id,
            model_id: CameraModelId::Pinhole,
            width: 640,
            height: 480,
            params: vec![500.0, 510.0, 320.0, 240.0],
        }
    }

    #[test]
    fn read_write_cameras_bin() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cameras.bin");

        let cameras = vec![
            pinhole(1),
            ColmapCamera {
                camera_id: 2,
                model_id: CameraModelId::SimpleRadial,
                width: 100,
                height: 50,
                params: vec![90.0, 50.0, 25.0, 0.01],
            },
        ];
        write_cameras_bin(&path, &cameras)?;

        let cameras_back = read_cameras_bin(&path)?;
        assert_eq!(cameras_back, cameras);

        Ok(())
    }

    #[test]
    fn read_write_images_bin() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("images.bin");

        let images = vec![ImagePose {
            image_id: 7,
            rotation: [0.5, 0.5, 0.5, 0.5],
            translation: [1.0, -2.0, 3.5],
            camera_id: 1,
            name: "frame_0007.png".to_string(),
            points2d: vec![(10.5, 20.25, 42), (1.0, 2.0, -1)],
        }];
        write_images_bin(&path, &images)?;

        let images_back = read_images_bin(&path)?;
        assert_eq!(images_back, images);

        Ok(())
    }

    #[test]
    fn missing_file() {
        let result = read_cameras_bin("/nonexistent/cameras.bin");
        assert!(matches!(result, Err(ColmapError::MissingFile(_))));
    }

    #[test]
    fn empty_file_has_no_count() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("images.bin");
        std::fs::write(&path, [1u8, 0, 0])?;

        match read_images_bin(&path) {
            Err(ColmapError::Truncated { field, .. }) => assert_eq!(field, "number of images"),
            other => panic!("unexpected result: {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn truncated_camera_params() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cameras.bin");
        write_cameras_bin(&path, &[pinhole(1)])?;

        // drop the last parameter
        let bytes = std::fs::read(&path)?;
        std::fs::write(&path, &bytes[..bytes.len() - 8])?;

        match read_cameras_bin(&path) {
            Err(ColmapError::Truncated { field, .. }) => assert_eq!(field, "camera params"),
            other => panic!("unexpected result: {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn unknown_model_id() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("cameras.bin");

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u64.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&99i32.to_le_bytes());
        std::fs::write(&path, bytes)?;

        assert!(matches!(
            read_cameras_bin(&path),
            Err(ColmapError::UnknownCameraModel(_))
        ));

        Ok(())
    }
}
