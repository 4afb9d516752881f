pub mod archive;
pub mod optimization;

pub use optimization::{OptimizationService, OptimizationServiceImpl};
