//! Pipeline module - load, split, prune, train, evaluate and predict

pub mod error;
pub mod evaluate;
pub mod loader;
pub mod missing;
pub mod predict;
pub mod preprocess;
pub mod pruner;
pub mod split;
pub mod trainer;
pub mod variance;

pub use error::{PipelineError, Result};
pub use evaluate::*;
pub use loader::*;
pub use missing::*;
pub use predict::*;
pub use preprocess::*;
pub use pruner::*;
pub use split::*;
pub use trainer::*;
pub use variance::*;
