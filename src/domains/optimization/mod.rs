// Declare submodules for the optimization domain
pub mod service;
pub mod transcoder;
pub mod types;

// Re-export key types
pub use types::{
    BatchItem, ItemOutcome, ItemResult, OptimizeParams, OptimizedImage, OutputFormat,
    DEFAULT_DIMENSION, DEFAULT_QUALITY, DEFAULT_SCALE, QUALITY_MAX, QUALITY_MIN, SCALE_MAX,
    SCALE_MIN,
};

pub use service::{OptimizationService, OptimizationServiceImpl};
pub use transcoder::ImageTranscoder;
