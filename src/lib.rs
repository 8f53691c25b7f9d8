//! pml-rf: exercise-quality classification library
//!
//! Loads the weight-lifting accelerometer tables, prunes uninformative
//! predictors, tunes a classifier with stratified cross-validation and
//! predicts the exercise class of unlabelled rows.

pub mod cli;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;
