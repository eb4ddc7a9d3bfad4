use std::path::Path;

use crate::DatasetError;

/// Image file extensions picked up from an image directory, lower case.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// Check whether a path has a supported image extension, ignoring case.
pub fn is_supported_image(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// List the image file names in a directory, sorted lexicographically.
///
/// Only regular files with a supported extension are returned; subdirectories
/// are not visited.
pub fn list_images(dir: impl AsRef<Path>) -> Result<Vec<String>, DatasetError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(DatasetError::NotADirectory(dir.to_path_buf()));
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if !is_supported_image(&path) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        } else {
            log::warn!("skipping non utf-8 file name {}", path.display());
        }
    }

    names.sort();
    Ok(names)
}

/// Comparison key of an image name: the file stem without directory or extension.
///
/// Recorded names may carry a subdirectory (`frames/0001.png`) and the files
/// on disk may have been re-encoded (`0001.jpg`); both map to `0001`.
pub fn name_key(name: &str) -> String {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => file_name[..pos].to_string(),
        _ => file_name.to_string(),
    }
}
