// Declare submodules for the client side
pub mod handles;
pub mod orchestrator;

// Re-export key types
pub use handles::{Handle, HandleRegistry};
pub use orchestrator::{
    OptimizedResult, RemoteBatchUploader, SequentialUploader, SharedParams, UploadCycleReport,
    UploadItem, UploadOrchestrator, UploadStrategy,
};
