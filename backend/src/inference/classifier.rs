use std::sync::{Arc, Mutex};

use tch::{CModule, Device, Kind, Tensor};

use crate::inference::error::{ModelLoadError, PredictError};

/// Substring of the load error raised by artifacts saved in the newer
/// archive layout that this runtime cannot read. Only this signature
/// triggers the legacy fallback; any other load failure is fatal.
pub const SCHEMA_SKEW_MARKER: &str = "constants.pkl";

pub const NUM_CLASSES: usize = 4;

const EXPECTED_INPUT: [i64; 4] = [1, 3, 224, 224];

/// Process-wide frozen classifier. Loaded once at startup and shared
/// read-only across requests; the mutex serializes access to the
/// underlying TorchScript module, which is not guaranteed safe under
/// concurrent method calls.
///
/// The artifact contract is a scripted module exposing three methods:
/// `forward` (image -> class logits), `features` (image -> last spatial
/// conv activation, `[1, C, 7, 7]`) and `head` (activation -> class
/// logits, the pool/dense/dense re-composition used for Grad-CAM).
#[derive(Clone)]
pub struct Classifier {
    module: Arc<Mutex<CModule>>,
    artifact: String,
}

impl Classifier {
    /// Loads the primary artifact, falling back to the legacy artifact
    /// when the primary fails with the known schema-skew signature.
    pub fn load(primary: &str, legacy: &str) -> Result<Self, ModelLoadError> {
        let (module, artifact) = match CModule::load_on_device(primary, Device::Cpu) {
            Ok(module) => (module, primary.to_string()),
            Err(e) if e.to_string().contains(SCHEMA_SKEW_MARKER) => {
                log::warn!(
                    "primary artifact {primary} rejected ({e}); falling back to {legacy}"
                );
                let module = CModule::load_on_device(legacy, Device::Cpu).map_err(|source| {
                    ModelLoadError::LegacyArtifact {
                        path: legacy.to_string(),
                        source,
                    }
                })?;
                (module, legacy.to_string())
            }
            Err(source) => {
                return Err(ModelLoadError::Artifact {
                    path: primary.to_string(),
                    source,
                });
            }
        };

        let classifier = Self {
            module: Arc::new(Mutex::new(module)),
            artifact,
        };
        classifier.validate()?;
        Ok(classifier)
    }

    /// Probes the auxiliary methods once with a zero tensor so that
    /// artifact/code version skew surfaces at boot instead of on the
    /// first explained request.
    fn validate(&self) -> Result<(), ModelLoadError> {
        let probe = Tensor::zeros(EXPECTED_INPUT, (Kind::Float, Device::Cpu));
        let module = self.module.lock().unwrap();
        let features = module.method_ts("features", &[probe]).map_err(|source| {
            ModelLoadError::MissingMethod {
                method: "features".to_string(),
                source,
            }
        })?;
        module.method_ts("head", &[features]).map_err(|source| {
            ModelLoadError::MissingMethod {
                method: "head".to_string(),
                source,
            }
        })?;
        Ok(())
    }

    /// Path of the artifact that was actually loaded.
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// Pure forward pass producing the softmax distribution over the
    /// four classes. No gradients are recorded.
    pub fn predict(&self, input: &Tensor) -> Result<[f32; NUM_CLASSES], PredictError> {
        if input.size() != EXPECTED_INPUT {
            return Err(PredictError::Inference(format!(
                "expected input shape {:?}, got {:?}",
                EXPECTED_INPUT,
                input.size()
            )));
        }
        let module = self.module.lock().unwrap();
        let logits = tch::no_grad(|| module.forward_ts(&[input]))
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        let probs = logits.softmax(-1, Kind::Float).view([-1]);
        if probs.size() != [NUM_CLASSES as i64] {
            return Err(PredictError::Inference(format!(
                "expected {NUM_CLASSES} class scores, got {:?}",
                probs.size()
            )));
        }
        let mut out = [0f32; NUM_CLASSES];
        probs.to_kind(Kind::Float).copy_data(&mut out, NUM_CLASSES);
        Ok(out)
    }

    /// Target-layer activation for Grad-CAM.
    pub(crate) fn features(&self, input: &Tensor) -> Result<Tensor, PredictError> {
        self.module
            .lock()
            .unwrap()
            .method_ts("features", &[input])
            .map_err(|e| PredictError::GradCam(format!("target layer output unavailable: {e}")))
    }

    /// Classifier head re-applied on top of a feature map.
    pub(crate) fn head(&self, features: &Tensor) -> Result<Tensor, PredictError> {
        self.module
            .lock()
            .unwrap()
            .method_ts("head", &[features])
            .map_err(|e| PredictError::GradCam(format!("classifier head unavailable: {e}")))
    }
}
