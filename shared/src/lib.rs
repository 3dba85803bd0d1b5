use serde::{Deserialize, Serialize};

/// Per-class probabilities of the 4-way classifier, rounded to 4 decimals.
/// Field order mirrors the model's output index order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProbabilityDistribution {
    pub healthy: f32,
    pub pituitary_tumor: f32,
    pub glioma_tumor: f32,
    pub meningioma_tumor: f32,
}

/// Successful prediction payload. Exactly one of the two gradcam fields is
/// populated for abnormal findings, depending on the requested explanation
/// variant; both are absent when the predicted class is `healthy`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PredictionResponse {
    pub status: String,
    pub probability_distribution: ProbabilityDistribution,
    pub predicted_class: String,
    /// Base64-encoded PNG of the heatmap blended over the uploaded image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradcam_image: Option<String>,
    /// Raw 7x7 relevance grid scaled to 0-255.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradcam_heatmap: Option<Vec<Vec<u8>>>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distribution() -> ProbabilityDistribution {
        ProbabilityDistribution {
            healthy: 0.91,
            pituitary_tumor: 0.03,
            glioma_tumor: 0.04,
            meningioma_tumor: 0.02,
        }
    }

    #[test]
    fn healthy_response_omits_gradcam_fields() {
        let response = PredictionResponse {
            status: "success".to_string(),
            probability_distribution: distribution(),
            predicted_class: "healthy".to_string(),
            gradcam_image: None,
            gradcam_heatmap: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("gradcam_image").is_none());
        assert!(json.get("gradcam_heatmap").is_none());
        assert_eq!(json["predicted_class"], "healthy");
    }

    #[test]
    fn abnormal_response_carries_requested_variant() {
        let response = PredictionResponse {
            status: "success".to_string(),
            probability_distribution: distribution(),
            predicted_class: "glioma_tumor".to_string(),
            gradcam_image: Some("aGVhdG1hcA==".to_string()),
            gradcam_heatmap: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("gradcam_image").is_some());
        assert!(json.get("gradcam_heatmap").is_none());
    }

    #[test]
    fn error_response_has_error_status() {
        let response = ErrorResponse::new("failed to decode uploaded image");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "failed to decode uploaded image");
    }
}
