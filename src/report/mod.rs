//! Report module - displaying and exporting pipeline results

pub mod environment;
pub mod export;
pub mod summary;

pub use environment::*;
pub use export::*;
pub use summary::*;
