//! # fieldndvi pipeline
//!
//! Turns a directory of multi-band scenes into a dated NDVI table:
//!
//! 1. scenes are discovered and identified by file stem ([`SceneId`]);
//! 2. each scene goes through NDVI, boundary clipping and the scene mean,
//!    sequentially or on a rayon pool ([`ProcessingMode`]);
//! 3. one `sample_date,avg_ndvi` row per successful scene is written.
//!
//! A scene that fails at any stage is reported and skipped. Missing inputs
//! (boundary, scene directory) abort the run before any scene is processed.
//!
//! ```no_run
//! use fieldndvi_pipeline::{Pipeline, PipelineConfig};
//!
//! let report = Pipeline::new(PipelineConfig::from_data_dir("data"))?.execute()?;
//! println!("{} written, {} skipped", report.records.len(), report.skipped());
//! # Ok::<(), fieldndvi_core::Error>(())
//! ```

pub mod config;
pub mod run;
pub mod scene;
pub mod strategy;
pub mod table;

pub use config::{PipelineConfig, StageStore};
pub use run::{
    aggregate, load_boundary, process_scene, run, Pipeline, RunOptions, RunReport, SceneFailure,
    Stage,
};
pub use scene::{discover_scenes, Scene, SceneId};
pub use strategy::{ParallelStrategy, ProcessingMode};
pub use table::{read_sample_table, write_sample_table_to, SampleRecord};
