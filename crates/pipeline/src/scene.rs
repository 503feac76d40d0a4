//! Scene identity and discovery

use fieldndvi_core::{Error, Result};
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Identity of a scene: its file stem, without directories or extension.
///
/// The sample date is derived from it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(stem: impl Into<String>) -> Self {
        Self(stem.into())
    }

    /// Identity of the scene stored at `path`, if it has a UTF-8 stem
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First two `_`-separated tokens of the stem, re-joined with `_`.
    ///
    /// `20230115_1030_sceneA` gives `20230115_1030`; a stem without an
    /// underscore is returned whole.
    pub fn sample_date(&self) -> String {
        self.0.splitn(3, '_').take(2).collect::<Vec<_>>().join("_")
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scene file found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    pub id: SceneId,
    pub path: PathBuf,
}

impl Scene {
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        SceneId::from_path(&path).map(|id| Self { id, path })
    }

    /// File name of the scene, reused for its intermediate artifacts
    pub fn artifact_name(&self) -> &OsStr {
        self.path
            .file_name()
            .unwrap_or_else(|| OsStr::new(self.id.as_str()))
    }
}

fn is_geotiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
}

/// List the GeoTIFF scenes directly inside `dir`, sorted by id and then by
/// file name.
///
/// Subdirectories are not descended into and files with other extensions
/// are ignored. Files sharing a stem (`a.tif` and `a.TIFF`) are both kept
/// and give one row each.
///
/// # Errors
/// `Error::Io` if the directory does not exist or cannot be listed.
pub fn discover_scenes<P: AsRef<Path>>(dir: P) -> Result<Vec<Scene>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("scene directory not found: {}", dir.display()),
        )));
    }

    let mut scenes = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() || !is_geotiff(entry.path()) {
            continue;
        }
        match Scene::from_path(entry.path()) {
            Some(scene) => scenes.push(scene),
            None => debug!("skipping {}: file name is not valid UTF-8", entry.path().display()),
        }
    }

    scenes.sort_by(|a, b| {
        a.id.cmp(&b.id)
            .then_with(|| a.artifact_name().cmp(b.artifact_name()))
    });
    for pair in scenes.windows(2) {
        if pair[0].id == pair[1].id {
            warn!(
                "{} and {} share the id {}",
                pair[0].path.display(),
                pair[1].path.display(),
                pair[0].id
            );
        }
    }
    debug!("found {} scenes in {}", scenes.len(), dir.display());
    Ok(scenes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_sample_date() {
        assert_eq!(SceneId::new("20230115_1030_sceneA").sample_date(), "20230115_1030");
        assert_eq!(SceneId::new("20220101_000_plotA_extra").sample_date(), "20220101_000");
        assert_eq!(SceneId::new("20220101_000").sample_date(), "20220101_000");
        assert_eq!(SceneId::new("20220101").sample_date(), "20220101");
    }

    #[test]
    fn test_scene_id_from_path() {
        let id = SceneId::from_path(Path::new("/data/IMAGENS_PLANET/20220101_000_plotA.tif")).unwrap();
        assert_eq!(id.as_str(), "20220101_000_plotA");
        assert_eq!(id.to_string(), "20220101_000_plotA");
    }

    #[test]
    fn test_artifact_keeps_source_file_name() {
        let scene = Scene::from_path("/data/IMAGENS_PLANET/20220101_000_plotA.TIFF").unwrap();
        assert_eq!(scene.id.as_str(), "20220101_000_plotA");
        assert_eq!(scene.artifact_name(), "20220101_000_plotA.TIFF");
    }

    #[test]
    fn test_shared_stems_are_kept_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["x_1_a.tiff", "x_1_a.tif", "x_1_a.TIFF", "w_0_a.tif"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }

        let scenes = discover_scenes(dir.path()).unwrap();
        let names: Vec<_> = scenes.iter().map(|s| s.artifact_name()).collect();
        assert_eq!(names, ["w_0_a.tif", "x_1_a.TIFF", "x_1_a.tif", "x_1_a.tiff"]);
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_2_x.tif", "a_1_x.TIFF", "notes.txt", "c_3_x.tiff"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::create_dir(dir.path().join("nested.tif")).unwrap();
        fs::write(dir.path().join("nested.tif").join("d_4_x.tif"), b"").unwrap();

        let scenes = discover_scenes(dir.path()).unwrap();
        let ids: Vec<_> = scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["a_1_x", "b_2_x", "c_3_x"]);
        assert!(scenes.iter().all(|s| s.path.starts_with(dir.path())));
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let result = discover_scenes("/nonexistent/IMAGENS_PLANET");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
