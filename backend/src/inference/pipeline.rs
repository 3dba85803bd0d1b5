use ndarray::Array2;

use crate::inference::classifier::Classifier;
use crate::inference::config::InferenceConfig;
use crate::inference::error::PredictError;
use crate::inference::gradcam;
use crate::inference::labels::{self, HEALTHY, LABELS};
use crate::inference::overlay;
use crate::inference::preprocess;

/// Which explanation representation a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplainVariant {
    /// Base64 PNG of the heatmap blended over the uploaded image (default).
    Image,
    /// Raw 7x7 relevance grid scaled to 0-255.
    Heatmap,
}

#[derive(Debug)]
pub struct Prediction {
    /// Softmax distribution over the four classes, rounded to 4 decimals.
    pub probabilities: [f32; 4],
    pub predicted_class: &'static str,
    pub relevance: Array2<f32>,
    pub gradcam_image: Option<String>,
    pub gradcam_heatmap: Option<Vec<Vec<u8>>>,
}

/// Runs the full pipeline on an uploaded payload: decode, preprocess,
/// classify, and for abnormal findings compute the Grad-CAM explanation in
/// the requested representation. Any stage error aborts the run; no
/// partial results are produced. Healthy predictions skip the explanation
/// stages entirely and carry an all-zero relevance map.
pub fn run(
    classifier: &Classifier,
    config: &InferenceConfig,
    bytes: &[u8],
    variant: ExplainVariant,
) -> Result<Prediction, PredictError> {
    let image = preprocess::decode_image(bytes)?;
    let tensor = preprocess::preprocess(&image, config.image.size);

    let raw = classifier.predict(&tensor)?;
    let class_idx = labels::argmax(&raw);
    let predicted_class = LABELS[class_idx];
    let probabilities = raw.map(round4);

    if class_idx == HEALTHY {
        return Ok(Prediction {
            probabilities,
            predicted_class,
            relevance: gradcam::zero_relevance(config.relevance.spatial),
            gradcam_image: None,
            gradcam_heatmap: None,
        });
    }

    let relevance = gradcam::compute(classifier, &tensor, class_idx, config.relevance.epsilon)?;
    let (gradcam_image, gradcam_heatmap) = match variant {
        ExplainVariant::Image => {
            let rendered = overlay::render(&relevance, &image, config.overlay.alpha);
            (Some(overlay::encode_png_base64(&rendered)?), None)
        }
        ExplainVariant::Heatmap => (None, Some(overlay::heatmap_grid(&relevance))),
    };

    Ok(Prediction {
        probabilities,
        predicted_class,
        relevance,
        gradcam_image,
        gradcam_heatmap,
    })
}

pub fn round4(v: f32) -> f32 {
    (v * 10_000.0).round() / 10_000.0
}
