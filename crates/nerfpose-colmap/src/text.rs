use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use super::{CameraModelId, ColmapCamera, ColmapError, ImagePose};

/// Read the cameras.txt file and return a vector of ColmapCamera structs.
///
/// # Arguments
///
/// * `path` - The path to the cameras.txt file.
///
/// # Returns
///
/// A vector of ColmapCamera structs.
pub fn read_cameras_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    let lines = read_data_lines(path.as_ref())?;

    let cameras = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| parse_camera_line(line))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(cameras)
}

/// Read the images.txt file and return a vector of ImagePose structs.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
///
/// # Returns
///
/// A vector of ImagePose structs.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<ImagePose>, ColmapError> {
    let lines = read_data_lines(path.as_ref())?;

    // every image takes two lines, the second one may be empty
    let images = lines
        .chunks(2)
        .map(|chunk| match chunk {
            [line1, line2] => parse_image_line(line1, line2),
            _ => Err(ColmapError::ParseError(
                "Invalid number of lines".to_string(),
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(images)
}

/// Read all lines of a model file, dropping the `#` header comments.
fn read_data_lines(path: &Path) -> Result<Vec<String>, ColmapError> {
    if !path.is_file() {
        return Err(ColmapError::MissingFile(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);

    let lines = reader
        .lines()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|line| !line.starts_with('#'))
        .collect();

    Ok(lines)
}

/// Utility functions for parsing COLMAP text files
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::ParseError(format!("{}: {}", s, e)))
}

fn parse_array<const N: usize>(parts: &[&str], what: &str) -> Result<[f64; N], ColmapError> {
    parts
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| ColmapError::ParseError(format!("Invalid number of {what} coordinates")))
}

/// Parse a camera line and return a ColmapCamera struct.
/// NOTE: The number of parameters depends on the camera model.
///       CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[0], PARAMS[1], ...
fn parse_camera_line(line: &str) -> Result<ColmapCamera, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 5 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    let model_id = CameraModelId::from_name(parts[1])
        .ok_or_else(|| ColmapError::UnknownCameraModel(parts[1].to_string()))?;

    let params = parts[4..]
        .iter()
        .map(|s| parse_part(s))
        .collect::<Result<Vec<_>, _>>()?;

    if params.len() != model_id.num_params() {
        return Err(ColmapError::InvalidNumCameraParams(params.len()));
    }

    Ok(ColmapCamera {
        camera_id: parse_part(parts[0])?,
        model_id,
        width: parse_part(parts[2])?,
        height: parse_part(parts[3])?,
        params,
    })
}

/// Parse an image line and return an ImagePose struct.
/// #   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
/// #   POINTS2D[] as (X, Y, POINT3D_ID)
fn parse_image_line(line1: &str, line2: &str) -> Result<ImagePose, ColmapError> {
    let parts1 = line1.split_whitespace().collect::<Vec<_>>();
    let parts2 = line2.split_whitespace().collect::<Vec<_>>();

    if parts1.len() < 10 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts1.len()
        )));
    }

    Ok(ImagePose {
        image_id: parse_part(parts1[0])?,
        rotation: parse_array(&parts1[1..5], "rotation")?,
        translation: parse_array(&parts1[5..8], "translation")?,
        camera_id: parse_part(parts1[8])?,
        // names may contain spaces
        name: parts1[9..].join(" "),
        points2d: parts2
            .chunks_exact(3)
            .map(|chunk| -> Result<(f64, f64, i64), ColmapError> {
                Ok((
                    parse_part(chunk[0])?,
                    parse_part(chunk[1])?,
                    parse_part(chunk[2])?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMERAS_TXT: &str = "# Camera list with one line of data per camera:
#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]
# Number of cameras: 1
1 PINHOLE 800 600 700.0 710.0 400.0 300.0
";

    const IMAGES_TXT: &str = "# Image list with two lines of data per image:
#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
#   POINTS2D[] as (X, Y, POINT3D_ID)
# Number of images: 2, mean observations per image: 1
1 1.0 0.0 0.0 0.0 0.0 0.0 1.0 1 img_001.jpg
12.5 30.0 4
2 0.7071 0.7071 0.0 0.0 1.0 2.0 3.0 1 img_002.jpg

";

    #[test]
    fn read_text_model() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let cameras_path = tmp_dir.path().join("cameras.txt");
        let images_path = tmp_dir.path().join("images.txt");
        std::fs::write(&cameras_path, CAMERAS_TXT)?;
        std::fs::write(&images_path, IMAGES_TXT)?;

        let cameras = read_cameras_txt(&cameras_path)?;
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].model_id, CameraModelId::Pinhole);
        assert_eq!(cameras[0].params, vec![700.0, 710.0, 400.0, 300.0]);

        let images = read_images_txt(&images_path)?;
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].name, "img_001.jpg");
        assert_eq!(images[0].points2d, vec![(12.5, 30.0, 4)]);
        assert_eq!(images[1].translation, [1.0, 2.0, 3.0]);
        assert!(images[1].points2d.is_empty());

        Ok(())
    }

    #[test]
    fn camera_with_wrong_param_count() {
        let result = parse_camera_line("1 PINHOLE 800 600 700.0 710.0 400.0");
        assert!(matches!(result, Err(ColmapError::InvalidNumCameraParams(3))));
    }
}
