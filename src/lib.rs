//! optipress: batch image upload-and-optimize service.
//!
//! Two components, one HTTP call between them: the [`api`] module is the
//! stateless server surface (batch and single-file compression endpoints),
//! and the [`client`] module is the upload orchestrator that feeds it and
//! manages the resulting download handles. The transform itself lives in
//! [`domains::optimization`]; zip bundling of results in [`domains::archive`].

// Public modules
pub mod api;
pub mod client;
pub mod config;
pub mod domains;
pub mod errors;
