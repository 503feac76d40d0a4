//! Per-scene processing and the run driver

use crate::config::{PipelineConfig, StageStore};
use crate::scene::{discover_scenes, Scene, SceneId};
use crate::strategy::{ParallelStrategy, ProcessingMode};
use crate::table::{write_sample_table_to, SampleRecord};
use fieldndvi_algorithms::imagery::{ndvi, NdviParams};
use fieldndvi_algorithms::statistics::scene_mean;
use fieldndvi_algorithms::vector::{clip_raster, ClipParams};
use fieldndvi_core::io::{read_boundary, read_geotiff, write_geotiff};
use fieldndvi_core::{Boundary, Error, Raster, Result};
use std::fmt;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Step of the per-scene chain at which a scene failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Read,
    Index,
    Clip,
    Aggregate,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Read => "read",
            Stage::Index => "index",
            Stage::Clip => "clip",
            Stage::Aggregate => "aggregate",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// A scene that was skipped, with the stage and error that stopped it
#[derive(Debug, thiserror::Error)]
#[error("scene {scene} failed at {stage}: {error}")]
pub struct SceneFailure {
    pub scene: SceneId,
    pub stage: Stage,
    #[source]
    pub error: Error,
}

fn at(scene: &SceneId, stage: Stage) -> impl FnOnce(Error) -> SceneFailure + '_ {
    move |error| SceneFailure {
        scene: scene.clone(),
        stage,
        error,
    }
}

/// Settings shared by every scene of a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub ndvi: NdviParams,
    pub clip: ClipParams,
    pub stages: StageStore,
    pub mode: ProcessingMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            ndvi: NdviParams::default(),
            clip: ClipParams::default(),
            stages: StageStore::InMemory,
            mode: ProcessingMode::default(),
        }
    }
}

impl From<&PipelineConfig> for RunOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            ndvi: config.ndvi,
            clip: config.clip,
            stages: config.stages.clone(),
            mode: config.mode,
        }
    }
}

/// Outcome of a run: one record per successful scene, in scene order
#[derive(Debug, Default)]
pub struct RunReport {
    pub records: Vec<SampleRecord>,
    pub failures: Vec<SceneFailure>,
}

impl RunReport {
    /// Number of scenes processed, successful or not
    pub fn attempted(&self) -> usize {
        self.records.len() + self.failures.len()
    }

    /// Number of scenes left out of the table
    pub fn skipped(&self) -> usize {
        self.failures.len()
    }
}

/// Load the field boundary. A missing or malformed file is fatal for a run.
pub fn load_boundary<P: AsRef<Path>>(path: P) -> Result<Boundary> {
    let path = path.as_ref();
    let boundary = read_boundary(path)?;
    debug!("boundary {} has {} polygon(s)", path.display(), boundary.len());
    Ok(boundary)
}

/// Reduce a clipped NDVI raster to one table row
pub fn aggregate(raster: &Raster<f32>, scene: &SceneId) -> Result<SampleRecord> {
    let mean = scene_mean(raster)?;
    Ok(SampleRecord::new(scene.sample_date(), mean))
}

/// Write a stage output under the scene's file name in `dir` and continue
/// from the file
fn persist(raster: Raster<f32>, dir: &Path, scene: &Scene) -> Result<Raster<f32>> {
    let path = dir.join(scene.artifact_name());
    write_geotiff(&raster, &path)?;
    debug!("{}: wrote {}", scene.id, path.display());
    read_geotiff(&path)
}

/// Run one scene through NDVI, clipping and aggregation.
///
/// Has no side effects other than the stage files of an on-disk store.
pub fn process_scene(
    scene: &Scene,
    boundary: &Boundary,
    options: &RunOptions,
) -> std::result::Result<SampleRecord, SceneFailure> {
    let id = &scene.id;

    let raster: Raster<f64> = read_geotiff(&scene.path).map_err(at(id, Stage::Read))?;
    debug!(
        "{}: read {} band(s), {}x{}",
        id,
        raster.band_count(),
        raster.cols(),
        raster.rows()
    );

    let mut index = ndvi(&raster, &options.ndvi).map_err(at(id, Stage::Index))?;
    drop(raster);
    if let StageStore::OnDisk { ndvi_dir, .. } = &options.stages {
        index = persist(index, ndvi_dir, scene).map_err(at(id, Stage::Persist))?;
    }

    let mut clipped = clip_raster(&index, boundary, &options.clip).map_err(at(id, Stage::Clip))?;
    drop(index);
    debug!("{}: clipped to {}x{}", id, clipped.cols(), clipped.rows());
    if let StageStore::OnDisk { clip_dir, .. } = &options.stages {
        clipped = persist(clipped, clip_dir, scene).map_err(at(id, Stage::Persist))?;
    }

    let record = aggregate(&clipped, id).map_err(at(id, Stage::Aggregate))?;
    debug!("{}: mean NDVI {}", id, record.avg_ndvi);
    Ok(record)
}

/// Process every scene and collect the results in scene order.
///
/// Failing scenes are logged and reported, never fatal. The run itself
/// fails only if the thread pool cannot be built.
pub fn run(scenes: &[Scene], boundary: &Boundary, options: &RunOptions) -> Result<RunReport> {
    let results = options
        .mode
        .par_map(scenes, |scene| process_scene(scene, boundary, options))?;

    let mut report = RunReport::default();
    for result in results {
        match result {
            Ok(record) => report.records.push(record),
            Err(failure) => {
                warn!(
                    "skipping scene {} ({} stage): {}",
                    failure.scene, failure.stage, failure.error
                );
                report.failures.push(failure);
            }
        }
    }

    Ok(report)
}

/// A run whose global preconditions have all been checked.
///
/// Construction loads the boundary, lists the scenes, creates the stage
/// directories and creates the output file. Nothing is processed until
/// [`Pipeline::execute`].
pub struct Pipeline {
    boundary: Boundary,
    scenes: Vec<Scene>,
    options: RunOptions,
    output_path: PathBuf,
    output: BufWriter<File>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let boundary = load_boundary(&config.boundary)?;
        let scenes = discover_scenes(&config.scene_dir)?;
        config.stages.prepare()?;

        if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let output = BufWriter::new(File::create(&config.output)?);

        info!(
            "{} scenes in {}, boundary with {} polygon(s)",
            scenes.len(),
            config.scene_dir.display(),
            boundary.len()
        );

        Ok(Self {
            boundary,
            scenes,
            options: RunOptions::from(&config),
            output_path: config.output,
            output,
        })
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Process all scenes and write the table
    pub fn execute(self) -> Result<RunReport> {
        let start = Instant::now();
        let report = run(&self.scenes, &self.boundary, &self.options)?;
        write_sample_table_to(self.output, &report.records)?;

        info!(
            "processed {} scenes in {:.2?}: {} written to {}, {} skipped",
            report.attempted(),
            start.elapsed(),
            report.records.len(),
            self.output_path.display(),
            report.skipped()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fieldndvi_core::GeoTransform;
    use geo_types::polygon;
    use ndarray::Array3;

    fn write_scene(dir: &Path, name: &str, bands: usize, red: f32, nir: f32) -> Scene {
        let data = Array3::from_shape_fn((bands, 4, 4), |(b, _, _)| match b {
            2 => red,
            3 => nir,
            _ => 50.0,
        });
        let mut raster = Raster::from_array3(data);
        raster.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        let path = dir.join(name);
        write_geotiff(&raster, &path).unwrap();
        Scene::from_path(path).unwrap()
    }

    fn full_extent() -> Boundary {
        Boundary::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ]])
        .unwrap()
    }

    #[test]
    fn test_process_scene_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let scene = write_scene(dir.path(), "20220101_000_plotA.tif", 4, 2.0, 6.0);

        let record = process_scene(&scene, &full_extent(), &RunOptions::default()).unwrap();
        assert_eq!(record.sample_date, "20220101_000");
        assert_relative_eq!(record.avg_ndvi, 0.5, epsilon = 1e-7);
    }

    #[test]
    fn test_process_scene_on_disk_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let scene = write_scene(dir.path(), "20220101_000_plotA.tif", 4, 2.0, 6.0);
        let stages = StageStore::on_disk(dir.path());
        stages.prepare().unwrap();
        let options = RunOptions { stages, ..RunOptions::default() };

        let record = process_scene(&scene, &full_extent(), &options).unwrap();
        assert_relative_eq!(record.avg_ndvi, 0.5, epsilon = 1e-7);
        assert!(dir.path().join("ndvi_images/20220101_000_plotA.tif").is_file());
        assert!(dir.path().join("clip_images/20220101_000_plotA.tif").is_file());
    }

    #[test]
    fn test_shared_stems_write_separate_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let scenes_dir = dir.path().join("scenes");
        fs::create_dir(&scenes_dir).unwrap();
        write_scene(&scenes_dir, "x_1_a.tif", 4, 2.0, 6.0);
        write_scene(&scenes_dir, "x_1_a.TIFF", 4, 1.0, 2.0);
        let stages = StageStore::on_disk(dir.path());
        stages.prepare().unwrap();
        let options = RunOptions {
            stages,
            mode: ProcessingMode::ParallelWith(2),
            ..RunOptions::default()
        };

        let scenes = discover_scenes(&scenes_dir).unwrap();
        let report = run(&scenes, &full_extent(), &options).unwrap();
        assert_eq!(report.records.len(), 2);
        assert!(dir.path().join("ndvi_images/x_1_a.tif").is_file());
        assert!(dir.path().join("ndvi_images/x_1_a.TIFF").is_file());
        assert!(dir.path().join("clip_images/x_1_a.TIFF").is_file());
        // "x_1_a.TIFF" sorts before "x_1_a.tif"
        assert_relative_eq!(report.records[0].avg_ndvi, 1.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(report.records[1].avg_ndvi, 0.5, epsilon = 1e-7);
    }

    #[test]
    fn test_failures_are_tagged_with_stage() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions::default();

        let three_band = write_scene(dir.path(), "a_1_x.tif", 3, 2.0, 6.0);
        let failure = process_scene(&three_band, &full_extent(), &options).unwrap_err();
        assert_eq!(failure.stage, Stage::Index);
        assert_eq!(failure.scene.as_str(), "a_1_x");
        assert!(matches!(failure.error, Error::Format(_)));

        let garbage = dir.path().join("b_2_x.tif");
        fs::write(&garbage, b"not a tiff").unwrap();
        let failure = process_scene(&Scene::from_path(garbage).unwrap(), &full_extent(), &options)
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Read);

        let far = Boundary::new(vec![polygon![
            (x: 100.0, y: 100.0),
            (x: 101.0, y: 100.0),
            (x: 101.0, y: 101.0),
            (x: 100.0, y: 100.0),
        ]])
        .unwrap();
        let scene = write_scene(dir.path(), "c_3_x.tif", 4, 2.0, 6.0);
        let failure = process_scene(&scene, &far, &options).unwrap_err();
        assert_eq!(failure.stage, Stage::Clip);
        assert!(matches!(failure.error, Error::Geometry(_)));

        let zeros = write_scene(dir.path(), "d_4_x.tif", 4, 0.0, 0.0);
        let failure = process_scene(&zeros, &full_extent(), &options).unwrap_err();
        assert_eq!(failure.stage, Stage::Aggregate);
        assert!(matches!(failure.error, Error::EmptyInput(_)));
        assert!(failure.to_string().contains("d_4_x"));
    }

    #[test]
    fn test_run_keeps_scene_order() {
        let dir = tempfile::tempdir().unwrap();
        let scenes = vec![
            write_scene(dir.path(), "20220101_000_a.tif", 4, 2.0, 6.0),
            write_scene(dir.path(), "20220102_000_a.tif", 3, 2.0, 6.0),
            write_scene(dir.path(), "20220103_000_a.tif", 4, 1.0, 3.0),
            write_scene(dir.path(), "20220104_000_a.tif", 4, 6.0, 2.0),
        ];

        for mode in [ProcessingMode::Sequential, ProcessingMode::ParallelWith(2)] {
            let options = RunOptions { mode, ..RunOptions::default() };
            let report = run(&scenes, &full_extent(), &options).unwrap();

            let dates: Vec<_> = report.records.iter().map(|r| r.sample_date.as_str()).collect();
            assert_eq!(dates, ["20220101_000", "20220103_000", "20220104_000"]);
            assert_relative_eq!(report.records[2].avg_ndvi, -0.5, epsilon = 1e-7);
            assert_eq!(report.attempted(), 4);
            assert_eq!(report.skipped(), 1);
        }
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Read.to_string(), "read");
        assert_eq!(Stage::Persist.to_string(), "persist");
    }
}
