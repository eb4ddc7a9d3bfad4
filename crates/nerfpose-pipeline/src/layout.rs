use std::path::{Path, PathBuf};

/// Directory layout of a project.
///
/// ```text
/// <root>/
/// ├── images/
/// ├── colmap_output/
/// │   ├── database.db
/// │   └── sparse/0/{cameras,images,points3D}.bin
/// ├── nerf_data/transforms.json
/// └── validation/report.json
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// Create a layout rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Working copy of the input images.
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Output directory of the reconstruction engine.
    pub fn colmap_dir(&self) -> PathBuf {
        self.root.join("colmap_output")
    }

    /// Feature database.
    pub fn database_path(&self) -> PathBuf {
        self.colmap_dir().join("database.db")
    }

    /// Directory the mapper writes its models to.
    pub fn sparse_dir(&self) -> PathBuf {
        self.colmap_dir().join("sparse")
    }

    /// The first sparse model.
    pub fn model_dir(&self) -> PathBuf {
        self.sparse_dir().join("0")
    }

    /// Dataset directory.
    pub fn nerf_dir(&self) -> PathBuf {
        self.root.join("nerf_data")
    }

    /// The pose file.
    pub fn transforms_path(&self) -> PathBuf {
        self.nerf_dir().join("transforms.json")
    }

    /// Validation output directory.
    pub fn validation_dir(&self) -> PathBuf {
        self.root.join("validation")
    }

    /// The validation report.
    pub fn report_path(&self) -> PathBuf {
        self.validation_dir().join("report.json")
    }

    /// Create all directories of the layout.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.images_dir(),
            self.sparse_dir(),
            self.nerf_dir(),
            self.validation_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
