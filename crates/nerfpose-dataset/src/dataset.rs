use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::DatasetError;

/// A single training view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertedFrame {
    /// Image file name, relative to the image directory.
    pub file_path: String,
    /// Rotation hint, always written as zero.
    pub rotation: f64,
    /// Row-major camera-to-world matrix in the NeRF axis convention.
    pub transform_matrix: [[f64; 4]; 4],
}

impl ConvertedFrame {
    /// Create a frame with a zero rotation hint.
    pub fn new(file_path: impl Into<String>, transform_matrix: [[f64; 4]; 4]) -> Self {
        Self {
            file_path: file_path.into(),
            rotation: 0.0,
            transform_matrix,
        }
    }
}

/// The pose file consumed by the radiance field trainer.
///
/// ```json
/// {
///   "camera_angle_x": 0.69,
///   "frames": [
///     { "file_path": "0001.png", "rotation": 0.0, "transform_matrix": [[...], ...] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Horizontal field of view in radians, shared by all frames.
    pub camera_angle_x: f64,
    /// Frames in reconstruction order.
    pub frames: Vec<ConvertedFrame>,
}

impl Dataset {
    /// Create a new dataset.
    ///
    /// # Errors
    ///
    /// Fails when `frames` is empty or the field of view is not a positive finite angle.
    pub fn new(camera_angle_x: f64, frames: Vec<ConvertedFrame>) -> Result<Self, DatasetError> {
        let dataset = Self {
            camera_angle_x,
            frames,
        };
        dataset.check()?;
        Ok(dataset)
    }

    fn check(&self) -> Result<(), DatasetError> {
        if !self.camera_angle_x.is_finite() || self.camera_angle_x <= 0.0 {
            return Err(DatasetError::InvalidFieldOfView(self.camera_angle_x));
        }
        if self.frames.is_empty() {
            return Err(DatasetError::EmptyFrames);
        }
        Ok(())
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for a checked dataset.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// File names of the frames, in order.
    pub fn file_paths(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.file_path.as_str()).collect()
    }

    /// Camera-to-world matrices of the frames, in order.
    pub fn poses(&self) -> Vec<[[f64; 4]; 4]> {
        self.frames.iter().map(|f| f.transform_matrix).collect()
    }

    /// Write the dataset as pretty-printed json.
    ///
    /// Parent directories are created when missing.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let path = path.as_ref();
        self.check()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        log::info!("wrote {} frames to {}", self.frames.len(), path.display());

        Ok(())
    }

    /// Read a dataset from a json file.
    pub fn read_json(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let reader = BufReader::new(File::open(path)?);
        let dataset: Dataset = serde_json::from_reader(reader)?;
        dataset.check()?;
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: [[f64; 4]; 4] = [
        [1.0, 0.0, 0.0, 0.0],
        [0.0, 1.0, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ];

    #[test]
    fn test_json_schema() -> Result<(), Box<dyn std::error::Error>> {
        let mut pose = IDENTITY;
        pose[0][3] = 0.5;
        let dataset = Dataset::new(0.7, vec![ConvertedFrame::new("0001.png", pose)])?;

        let value = serde_json::to_value(&dataset)?;
        let root = value.as_object().ok_or("root is not an object")?;
        let mut keys = root.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, ["camera_angle_x", "frames"]);

        let frame = root["frames"][0]
            .as_object()
            .ok_or("frame is not an object")?;
        let mut keys = frame.keys().map(String::as_str).collect::<Vec<_>>();
        keys.sort();
        assert_eq!(keys, ["file_path", "rotation", "transform_matrix"]);

        // row-major nested arrays
        assert_eq!(frame["transform_matrix"][0][3], 0.5);
        assert_eq!(frame["transform_matrix"][3][3], 1.0);
        assert_eq!(frame["rotation"], 0.0);
        Ok(())
    }

    #[test]
    fn test_write_read() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("nerf_data").join("transforms.json");

        let dataset = Dataset::new(
            1.2,
            vec![
                ConvertedFrame::new("a.png", IDENTITY),
                ConvertedFrame::new("b.png", IDENTITY),
            ],
        )?;
        dataset.write_json(&path)?;

        let read = Dataset::read_json(&path)?;
        assert_eq!(read, dataset);
        assert_eq!(read.file_paths(), ["a.png", "b.png"]);
        Ok(())
    }

    #[test]
    fn test_invalid_dataset() {
        assert!(matches!(
            Dataset::new(0.7, vec![]),
            Err(DatasetError::EmptyFrames)
        ));
        assert!(matches!(
            Dataset::new(f64::NAN, vec![ConvertedFrame::new("a.png", IDENTITY)]),
            Err(DatasetError::InvalidFieldOfView(_))
        ));
    }

    #[test]
    fn test_read_empty_frames() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let path = tmp_dir.path().join("transforms.json");
        std::fs::write(&path, r#"{"camera_angle_x": 0.5, "frames": []}"#)?;
        assert!(matches!(
            Dataset::read_json(&path),
            Err(DatasetError::EmptyFrames)
        ));
        Ok(())
    }
}
