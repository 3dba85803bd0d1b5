pub mod classifier;
pub mod config;
pub mod error;
pub mod gradcam;
pub mod labels;
pub mod overlay;
pub mod pipeline;
pub mod preprocess;
