/// Startup-time failure. Not recoverable at request time; the only recovery
/// is the primary-to-legacy artifact fallback handled inside `Classifier::load`.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to load model artifact {path}: {source}")]
    Artifact { path: String, source: tch::TchError },
    #[error("legacy fallback artifact {path} also failed to load: {source}")]
    LegacyArtifact { path: String, source: tch::TchError },
    #[error("model artifact does not expose the `{method}` method: {source}")]
    MissingMethod { method: String, source: tch::TchError },
}

/// Per-request failures. All of these are surfaced to the client as an
/// error response with a 400 status; none are retried.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("failed to decode uploaded image: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("grad-cam computation failed: {0}")]
    GradCam(String),
    #[error("failed to encode overlay image: {0}")]
    Encode(String),
}
