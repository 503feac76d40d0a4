//! Pipeline configuration
//!
//! The default layout mirrors the field data directory:
//!
//! ```text
//! data/
//!   IMAGENS_PLANET/   input scenes
//!   gleba01.geojson   field boundary
//!   ndvi_images/      NDVI per scene (on-disk stages)
//!   clip_images/      clipped NDVI per scene (on-disk stages)
//!   results.csv       output table
//! ```

use crate::strategy::ProcessingMode;
use fieldndvi_algorithms::imagery::NdviParams;
use fieldndvi_algorithms::vector::ClipParams;
use fieldndvi_core::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SCENE_DIR: &str = "IMAGENS_PLANET";
pub const BOUNDARY_FILE: &str = "gleba01.geojson";
pub const NDVI_DIR: &str = "ndvi_images";
pub const CLIP_DIR: &str = "clip_images";
pub const RESULT_FILE: &str = "results.csv";

/// Where intermediate rasters live between stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageStore {
    /// Rasters are handed from stage to stage in memory
    InMemory,
    /// Each stage output is written as `<dir>/<scene>.tif` and read back
    OnDisk { ndvi_dir: PathBuf, clip_dir: PathBuf },
}

impl StageStore {
    pub fn on_disk(data_dir: &Path) -> Self {
        StageStore::OnDisk {
            ndvi_dir: data_dir.join(NDVI_DIR),
            clip_dir: data_dir.join(CLIP_DIR),
        }
    }

    /// Create the stage directories if they do not exist
    pub fn prepare(&self) -> Result<()> {
        if let StageStore::OnDisk { ndvi_dir, clip_dir } = self {
            fs::create_dir_all(ndvi_dir)?;
            fs::create_dir_all(clip_dir)?;
        }
        Ok(())
    }
}

/// Full configuration of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory listed for scenes
    pub scene_dir: PathBuf,
    /// GeoJSON file with the field boundary
    pub boundary: PathBuf,
    /// Output CSV table
    pub output: PathBuf,
    pub stages: StageStore,
    pub ndvi: NdviParams,
    pub clip: ClipParams,
    pub mode: ProcessingMode,
}

impl PipelineConfig {
    /// Default layout rooted at `data_dir`
    pub fn from_data_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            scene_dir: data_dir.join(SCENE_DIR),
            boundary: data_dir.join(BOUNDARY_FILE),
            output: data_dir.join(RESULT_FILE),
            stages: StageStore::on_disk(data_dir),
            ndvi: NdviParams::default(),
            clip: ClipParams::default(),
            mode: ProcessingMode::default(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_data_dir("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = PipelineConfig::default();
        assert_eq!(config.scene_dir, Path::new("data/IMAGENS_PLANET"));
        assert_eq!(config.boundary, Path::new("data/gleba01.geojson"));
        assert_eq!(config.output, Path::new("data/results.csv"));
        assert_eq!(
            config.stages,
            StageStore::OnDisk {
                ndvi_dir: PathBuf::from("data/ndvi_images"),
                clip_dir: PathBuf::from("data/clip_images"),
            }
        );
        assert_eq!(config.ndvi, NdviParams { red_band: 3, nir_band: 4 });
        assert!(config.clip.crop);
        assert_eq!(config.mode, ProcessingMode::Parallel);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{"output": "out/table.csv", "stages": "InMemory", "mode": {"ParallelWith": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.output, Path::new("out/table.csv"));
        assert_eq!(config.stages, StageStore::InMemory);
        assert_eq!(config.mode, ProcessingMode::ParallelWith(2));
        assert_eq!(config.scene_dir, Path::new("data/IMAGENS_PLANET"));
    }

    #[test]
    fn test_prepare_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = StageStore::on_disk(dir.path());
        store.prepare().unwrap();
        assert!(dir.path().join("ndvi_images").is_dir());
        assert!(dir.path().join("clip_images").is_dir());
        StageStore::InMemory.prepare().unwrap();
    }
}
