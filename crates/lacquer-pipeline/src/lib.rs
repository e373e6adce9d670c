//! Build tasks for the lacquer static-asset pipeline.
//!
//! Compiles SCSS to CSS, minifies scripts, splices partial fragments into
//! page templates, and copies static assets into a deployable tree.

pub mod builder;
pub mod pages;
pub mod scripts;
pub mod styles;

pub use builder::{BuildError, BuildResult, Pipeline, PipelineConfig};
